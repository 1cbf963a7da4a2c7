use crate::{
    error::{Result, StudioError},
    models::{AssetRole, Shot, ShotUpdate},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered storyboard frames.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShotStore {
    shots: Vec<Shot>,
}

impl ShotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> Uuid {
        let shot = Shot::new();
        let id = shot.id;
        self.shots.push(shot);
        id
    }

    pub fn update(&mut self, id: Uuid, update: ShotUpdate) -> Result<()> {
        let shot = self.get_mut(id).ok_or(StudioError::ShotNotFound(id))?;
        update.merge_into(shot);
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Shot> {
        let index = self.index_of(id)?;
        Some(self.shots.remove(index))
    }

    /// Moves the shot at `from` to `to`; every other shot keeps its relative order.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.shots.len();
        for index in [from, to] {
            if index >= len {
                return Err(StudioError::InvalidIndex { index, len });
            }
        }
        if from != to {
            let shot = self.shots.remove(from);
            self.shots.insert(to, shot);
        }
        Ok(())
    }

    pub fn toggle_garment(&mut self, id: Uuid, garment_id: Uuid) -> Result<bool> {
        let shot = self.get_mut(id).ok_or(StudioError::ShotNotFound(id))?;
        let selected = match shot.selected_garment_ids.iter().position(|g| *g == garment_id) {
            Some(index) => {
                shot.selected_garment_ids.remove(index);
                false
            }
            None => {
                shot.selected_garment_ids.push(garment_id);
                true
            }
        };
        Ok(selected)
    }

    /// Selecting the already-selected model clears it.
    pub fn select_model(&mut self, id: Uuid, model_id: Option<Uuid>) -> Result<Option<Uuid>> {
        let shot = self.get_mut(id).ok_or(StudioError::ShotNotFound(id))?;
        shot.selected_model_id = toggled(shot.selected_model_id, model_id);
        Ok(shot.selected_model_id)
    }

    pub fn select_pose(&mut self, id: Uuid, pose_id: Option<Uuid>) -> Result<Option<Uuid>> {
        let shot = self.get_mut(id).ok_or(StudioError::ShotNotFound(id))?;
        shot.selected_pose_id = toggled(shot.selected_pose_id, pose_id);
        Ok(shot.selected_pose_id)
    }

    pub fn insert_mention(&mut self, id: Uuid, name: &str) -> Result<()> {
        let shot = self.get_mut(id).ok_or(StudioError::ShotNotFound(id))?;
        shot.prompt.push_str(" @");
        shot.prompt.push_str(name);
        shot.prompt.push(' ');
        Ok(())
    }

    /// Drops every reference to a deleted asset. Returns how many shots changed.
    pub fn purge_asset(&mut self, role: AssetRole, asset_id: Uuid) -> usize {
        let mut touched = 0;
        for shot in &mut self.shots {
            let changed = match role {
                AssetRole::Garment => {
                    let before = shot.selected_garment_ids.len();
                    shot.selected_garment_ids.retain(|g| *g != asset_id);
                    before != shot.selected_garment_ids.len()
                }
                AssetRole::Model if shot.selected_model_id == Some(asset_id) => {
                    shot.selected_model_id = None;
                    true
                }
                AssetRole::Pose if shot.selected_pose_id == Some(asset_id) => {
                    shot.selected_pose_id = None;
                    true
                }
                _ => false,
            };
            if changed {
                touched += 1;
            }
        }
        touched
    }

    pub fn get(&self, id: Uuid) -> Option<&Shot> {
        self.shots.iter().find(|shot| shot.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Shot> {
        self.shots.iter_mut().find(|shot| shot.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Shot> {
        self.shots.get(index)
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.shots.iter().position(|shot| shot.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shot> {
        self.shots.iter()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.shots.iter().map(|shot| shot.id).collect()
    }

    /// Shots that have a rendered image, in board order.
    pub fn generated(&self) -> Vec<&Shot> {
        self.shots.iter().filter(|shot| shot.has_image()).collect()
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }
}

fn toggled(current: Option<Uuid>, requested: Option<Uuid>) -> Option<Uuid> {
    match requested {
        Some(id) if current == Some(id) => None,
        other => other,
    }
}
