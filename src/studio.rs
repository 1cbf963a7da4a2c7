use crate::{
    error::{Result, StudioError},
    gemini::ImageBackend,
    models::{ImageSize, Shot, ShotGenerationRequest, ShotUpdate},
    store::Board,
};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Upper bound (exclusive) for seeds drawn when a shot has none yet.
pub const SEED_RANGE: u32 = 1_000_000;

pub const QUOTA_SHOT_MESSAGE: &str = "Quota Exceeded. Please update API Key.";

/// Told whenever a generation is rejected for quota or rate limiting, so the
/// front end can ask for a different key.
pub trait QuotaObserver: Send + Sync {
    fn on_quota_exceeded(&self, shot_id: Uuid, message: &str);
}

impl<F> QuotaObserver for F
where
    F: Fn(Uuid, &str) + Send + Sync,
{
    fn on_quota_exceeded(&self, shot_id: Uuid, message: &str) {
        self(shot_id, message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated { image_size: ImageSize, seed: u32 },
    Failed { message: String, quota: bool },
    /// The shot was removed, or regenerated, while this request was in flight.
    Discarded,
    /// Upscale asked for the size the shot already has.
    Skipped,
}

#[derive(Clone)]
pub struct Studio {
    board: Arc<RwLock<Board>>,
    backend: Arc<dyn ImageBackend>,
    quota_observer: Option<Arc<dyn QuotaObserver>>,
    tickets: Arc<Mutex<HashMap<Uuid, u64>>>,
    tasks: Arc<Mutex<HashMap<Uuid, Vec<JoinHandle<()>>>>>,
}

impl Studio {
    pub fn new(board: Board, backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            board: Arc::new(RwLock::new(board)),
            backend,
            quota_observer: None,
            tickets: Arc::new(Mutex::new(HashMap::new())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_quota_observer(mut self, observer: Arc<dyn QuotaObserver>) -> Self {
        self.quota_observer = Some(observer);
        self
    }

    pub fn board(&self) -> &Arc<RwLock<Board>> {
        &self.board
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<Shot> {
        self.board.read().await.shots().get(id).cloned()
    }

    /// Renders `id` at `target_size`. Failures land on the shot, not in the
    /// returned `Result`, which only reports an unknown shot.
    pub async fn generate_shot(&self, id: Uuid, target_size: ImageSize) -> Result<GenerationOutcome> {
        let ticket = self.next_ticket(id);
        self.run(id, ticket, target_size).await
    }

    async fn run(&self, id: Uuid, ticket: u64, target_size: ImageSize) -> Result<GenerationOutcome> {
        let Some(request) = self.begin(id, ticket, target_size).await? else {
            log::debug!("Skipping superseded generation for shot {}", id);
            return Ok(GenerationOutcome::Discarded);
        };
        let seed = request.seed.unwrap_or_default();

        let result = self.backend.generate(request).await;
        Ok(self.complete(id, ticket, target_size, seed, result).await)
    }

    /// Re-renders a finished shot at another size with the same seed.
    pub async fn upscale_shot(&self, id: Uuid, size: ImageSize) -> Result<GenerationOutcome> {
        {
            let board = self.board.read().await;
            let shot = board.shots().get(id).ok_or(StudioError::ShotNotFound(id))?;
            if !shot.has_image() {
                return Err(StudioError::NothingToUpscale(id));
            }
            if shot.image_size == size {
                return Ok(GenerationOutcome::Skipped);
            }
        }
        self.generate_shot(id, size).await
    }

    /// Runs a generation in the background. The ticket is taken before the
    /// task starts, so the latest call for a shot is the one whose result is
    /// kept. Older tasks stay registered until they finish or are cancelled.
    pub fn spawn_generation(&self, id: Uuid, target_size: ImageSize) {
        let ticket = self.next_ticket(id);
        let studio = self.clone();
        let handle = tokio::spawn(async move {
            match studio.run(id, ticket, target_size).await {
                Ok(outcome) => log::debug!("Shot {} finished: {:?}", id, outcome),
                Err(e) => log::warn!("Shot {} not generated: {}", id, e),
            }
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let handles = tasks.entry(id).or_default();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Aborts an in-flight generation and clears the shot's busy flag.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let handles = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .unwrap_or_default();
        self.next_ticket(id);

        let mut board = self.board.write().await;
        if let Some(shot) = board.shots().get(id) {
            if shot.is_generating {
                let update = ShotUpdate {
                    is_generating: Some(false),
                    ..Default::default()
                };
                if let Err(e) = board.dispatch(crate::store::BoardAction::UpdateShot { id, update }) {
                    log::debug!("Could not clear busy flag on shot {}: {}", id, e);
                }
            }
        }

        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            log::info!("Cancelled {} generation(s) for shot {}", aborted, id);
        }
        aborted > 0
    }

    /// Waits for every spawned generation.
    pub async fn join_all(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .flat_map(|(_, handles)| handles)
            .collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    log::error!("Generation task failed: {}", e);
                }
            }
        }
    }

    /// Marks the shot busy and builds its request. `None` when a newer
    /// generation or a cancel has already taken over the shot.
    async fn begin(
        &self,
        id: Uuid,
        ticket: u64,
        target_size: ImageSize,
    ) -> Result<Option<ShotGenerationRequest>> {
        let mut board = self.board.write().await;
        let shot = board
            .shots()
            .get(id)
            .cloned()
            .ok_or(StudioError::ShotNotFound(id))?;
        if !self.is_current(id, ticket) {
            return Ok(None);
        }

        let seed = shot
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..SEED_RANGE));
        let (model, garments, pose) = board.resolve_references(&shot);

        board.dispatch(crate::store::BoardAction::UpdateShot {
            id,
            update: ShotUpdate::generating().with_seed(Some(seed)),
        })?;

        log::info!(
            "Generating shot {} at {} (seed {}, {} garment(s))",
            id,
            target_size,
            seed,
            garments.len()
        );

        let request = ShotGenerationRequest {
            prompt: shot.prompt,
            model,
            garments,
            pose,
            aspect_ratio: shot.aspect_ratio,
            image_size: target_size,
            seed: Some(seed),
        };
        Ok(Some(request))
    }

    async fn complete(
        &self,
        id: Uuid,
        ticket: u64,
        target_size: ImageSize,
        seed: u32,
        result: Result<crate::models::GeneratedImage>,
    ) -> GenerationOutcome {
        if let Err(e) = &result {
            if e.is_quota() {
                log::warn!("Quota exceeded while generating shot {}: {}", id, e);
                if let Some(observer) = &self.quota_observer {
                    observer.on_quota_exceeded(id, &e.to_string());
                }
            }
        }

        let mut board = self.board.write().await;
        if !self.is_current(id, ticket) || board.shots().get(id).is_none() {
            log::debug!("Discarding stale result for shot {}", id);
            return GenerationOutcome::Discarded;
        }

        let (update, outcome) = match result {
            Ok(image) => (
                ShotUpdate::succeeded(image.data_uri, target_size, seed),
                GenerationOutcome::Generated {
                    image_size: target_size,
                    seed,
                },
            ),
            Err(e) if e.is_quota() => (
                ShotUpdate::failed(QUOTA_SHOT_MESSAGE),
                GenerationOutcome::Failed {
                    message: QUOTA_SHOT_MESSAGE.to_string(),
                    quota: true,
                },
            ),
            Err(e) => {
                log::error!("Generation failed for shot {}: {}", id, e);
                let message = e.to_string();
                (
                    ShotUpdate::failed(message.clone()),
                    GenerationOutcome::Failed {
                        message,
                        quota: false,
                    },
                )
            }
        };

        if let Err(e) = board.dispatch(crate::store::BoardAction::UpdateShot { id, update }) {
            log::debug!("Shot {} vanished before its result was stored: {}", id, e);
            return GenerationOutcome::Discarded;
        }
        outcome
    }

    fn next_ticket(&self, id: Uuid) -> u64 {
        let mut tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
        let ticket = tickets.entry(id).or_insert(0);
        *ticket += 1;
        *ticket
    }

    fn is_current(&self, id: Uuid, ticket: u64) -> bool {
        let tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
        tickets.get(&id).copied() == Some(ticket)
    }
}
