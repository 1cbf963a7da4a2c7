use super::{AssetStore, ShotStore};
use crate::{
    config::BoardLimits,
    error::{Result, StudioError},
    models::{Asset, AssetRole, Shot, ShotUpdate},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

const BOARD_FORMAT_VERSION: u32 = 1;

/// Every mutation the board accepts.
#[derive(Debug, Clone)]
pub enum BoardAction {
    AddAsset(Asset),
    RemoveAsset { role: AssetRole, id: Uuid },
    CreateShot,
    UpdateShot { id: Uuid, update: ShotUpdate },
    RemoveShot(Uuid),
    ReorderShots { from: usize, to: usize },
    ToggleGarment { shot: Uuid, garment: Uuid },
    SelectModel { shot: Uuid, model: Option<Uuid> },
    SelectPose { shot: Uuid, pose: Option<Uuid> },
    InsertMention { shot: Uuid, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    AssetAdded(Uuid),
    AssetRemoved { asset: Asset, shots_updated: usize },
    ShotCreated(Uuid),
    ShotUpdated(Uuid),
    ShotRemoved(Uuid),
    ShotsReordered,
    Unchanged,
}

/// Root session state: both stores plus the limits they are checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    assets: AssetStore,
    #[serde(default)]
    shots: ShotStore,
    #[serde(skip)]
    limits: BoardLimits,
}

fn default_version() -> u32 {
    BOARD_FORMAT_VERSION
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardLimits::default())
    }
}

impl Board {
    pub fn new(limits: BoardLimits) -> Self {
        Self {
            version: BOARD_FORMAT_VERSION,
            assets: AssetStore::new(),
            shots: ShotStore::new(),
            limits,
        }
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn shots(&self) -> &ShotStore {
        &self.shots
    }

    pub fn limits(&self) -> &BoardLimits {
        &self.limits
    }

    pub fn dispatch(&mut self, action: BoardAction) -> Result<BoardEvent> {
        match action {
            BoardAction::AddAsset(asset) => {
                let id = self.assets.add(asset.role, asset, &self.limits)?;
                Ok(BoardEvent::AssetAdded(id))
            }
            BoardAction::RemoveAsset { role, id } => {
                let asset = self
                    .assets
                    .remove(role, id)
                    .ok_or(StudioError::AssetNotFound(id))?;
                let shots_updated = self.shots.purge_asset(role, id);
                log::info!(
                    "Removed {} @{}; {} shot(s) updated",
                    role.as_str(),
                    asset.name,
                    shots_updated
                );
                Ok(BoardEvent::AssetRemoved {
                    asset,
                    shots_updated,
                })
            }
            BoardAction::CreateShot => Ok(BoardEvent::ShotCreated(self.shots.create())),
            BoardAction::UpdateShot { id, mut update } => {
                if let Some(ids) = update.selected_garment_ids.as_mut() {
                    let mut seen = HashSet::new();
                    ids.retain(|garment| seen.insert(*garment));
                }
                for garment in update.selected_garment_ids.iter().flatten() {
                    self.require_asset(AssetRole::Garment, *garment)?;
                }
                if let Some(Some(model)) = update.selected_model_id {
                    self.require_asset(AssetRole::Model, model)?;
                }
                if let Some(Some(pose)) = update.selected_pose_id {
                    self.require_asset(AssetRole::Pose, pose)?;
                }
                self.shots.update(id, update)?;
                Ok(BoardEvent::ShotUpdated(id))
            }
            BoardAction::RemoveShot(id) => {
                self.shots.remove(id).ok_or(StudioError::ShotNotFound(id))?;
                Ok(BoardEvent::ShotRemoved(id))
            }
            BoardAction::ReorderShots { from, to } => {
                self.shots.reorder(from, to)?;
                if from == to {
                    Ok(BoardEvent::Unchanged)
                } else {
                    Ok(BoardEvent::ShotsReordered)
                }
            }
            BoardAction::ToggleGarment { shot, garment } => {
                self.require_asset(AssetRole::Garment, garment)?;
                self.shots.toggle_garment(shot, garment)?;
                Ok(BoardEvent::ShotUpdated(shot))
            }
            BoardAction::SelectModel { shot, model } => {
                if let Some(model) = model {
                    self.require_asset(AssetRole::Model, model)?;
                }
                self.shots.select_model(shot, model)?;
                Ok(BoardEvent::ShotUpdated(shot))
            }
            BoardAction::SelectPose { shot, pose } => {
                if let Some(pose) = pose {
                    self.require_asset(AssetRole::Pose, pose)?;
                }
                self.shots.select_pose(shot, pose)?;
                Ok(BoardEvent::ShotUpdated(shot))
            }
            BoardAction::InsertMention { shot, name } => {
                self.shots.insert_mention(shot, &name)?;
                Ok(BoardEvent::ShotUpdated(shot))
            }
        }
    }

    fn require_asset(&self, role: AssetRole, id: Uuid) -> Result<()> {
        self.assets
            .get(role, id)
            .map(|_| ())
            .ok_or(StudioError::AssetNotFound(id))
    }

    /// Upload boundary: reads `path` and adds it as a `role` asset.
    pub fn upload(&mut self, role: AssetRole, path: &Path) -> Result<Uuid> {
        self.assets.upload_file(role, path, &self.limits)
    }

    /// Clones out the assets a shot references, garments in selection order.
    pub fn resolve_references(&self, shot: &Shot) -> (Option<Asset>, Vec<Asset>, Option<Asset>) {
        let model = shot
            .selected_model_id
            .and_then(|id| self.assets.get(AssetRole::Model, id))
            .cloned();
        let pose = shot
            .selected_pose_id
            .and_then(|id| self.assets.get(AssetRole::Pose, id))
            .cloned();
        let garments = shot
            .selected_garment_ids
            .iter()
            .filter_map(|id| self.assets.get(AssetRole::Garment, *id))
            .cloned()
            .collect();
        (model, garments, pose)
    }

    pub fn load(path: &Path, limits: BoardLimits) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut board: Board = serde_json::from_str(&content)?;
        if board.version > BOARD_FORMAT_VERSION {
            return Err(StudioError::ConfigError(format!(
                "board file version {} is newer than supported version {}",
                board.version, BOARD_FORMAT_VERSION
            )));
        }
        board.limits = limits;
        // A process that died mid-request leaves no task to clear the flag.
        for id in board.shots.ids() {
            if let Some(shot) = board.shots.get_mut(id) {
                shot.is_generating = false;
            }
        }
        log::debug!("Loaded board from {}", path.display());
        Ok(board)
    }

    /// Loads `path` if it exists, otherwise starts an empty board.
    pub fn open(path: &Path, limits: BoardLimits) -> Result<Self> {
        if path.exists() {
            Self::load(path, limits)
        } else {
            Ok(Self::new(limits))
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::debug!("Saved board to {}", path.display());
        Ok(())
    }
}

/// Slideshow position over the shots that have an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoryCursor {
    pub index: usize,
}

impl StoryCursor {
    pub fn next(&mut self, frames: usize) {
        if frames == 0 {
            return;
        }
        self.index = if self.index + 1 < frames { self.index + 1 } else { 0 };
    }

    pub fn prev(&mut self, frames: usize) {
        if frames == 0 {
            return;
        }
        self.index = if self.index > 0 { self.index - 1 } else { frames - 1 };
    }

    pub fn current<'a>(&self, board: &'a Board) -> Option<&'a Shot> {
        board.shots().generated().get(self.index).copied()
    }
}
