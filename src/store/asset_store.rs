use crate::{
    config::BoardLimits,
    error::{Result, StudioError},
    models::{Asset, AssetRole},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Reference images partitioned by role, each partition kept in upload order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetStore {
    #[serde(default)]
    garments: Vec<Asset>,
    #[serde(default)]
    models: Vec<Asset>,
    #[serde(default)]
    poses: Vec<Asset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, role: AssetRole) -> &Vec<Asset> {
        match role {
            AssetRole::Garment => &self.garments,
            AssetRole::Model => &self.models,
            AssetRole::Pose => &self.poses,
        }
    }

    fn partition_mut(&mut self, role: AssetRole) -> &mut Vec<Asset> {
        match role {
            AssetRole::Garment => &mut self.garments,
            AssetRole::Model => &mut self.models,
            AssetRole::Pose => &mut self.poses,
        }
    }

    /// Appends `asset` to the `role` partition. A full partition rejects the
    /// upload and is left untouched.
    pub fn add(&mut self, role: AssetRole, asset: Asset, limits: &BoardLimits) -> Result<Uuid> {
        if asset.role != role {
            return Err(StudioError::ConfigError(format!(
                "asset '{}' is a {} and cannot be added to {}",
                asset.name,
                asset.role.as_str(),
                role.title()
            )));
        }

        let max = limits.max_for(role);
        let partition = self.partition_mut(role);
        if partition.len() >= max {
            log::warn!("Rejected upload of '{}': {} limit is {}", asset.name, role.title(), max);
            return Err(StudioError::UploadLimitExceeded { role, max });
        }

        let id = asset.id;
        log::debug!("Added {} asset @{} ({})", role.as_str(), asset.name, id);
        partition.push(asset);
        Ok(id)
    }

    /// Reads an image file from disk and adds it under `role`.
    pub fn upload_file(
        &mut self,
        role: AssetRole,
        path: &Path,
        limits: &BoardLimits,
    ) -> Result<Uuid> {
        if self.is_full(role, limits) {
            return Err(StudioError::UploadLimitExceeded {
                role,
                max: limits.max_for(role),
            });
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StudioError::UnsupportedMedia(path.display().to_string()))?;
        let mime_type = mime_for_path(path)
            .ok_or_else(|| StudioError::UnsupportedMedia(format!("{} is not an image", file_name)))?;

        let bytes = std::fs::read(path)?;
        let asset = Asset::from_bytes(role, file_name, mime_type, &bytes);
        self.add(role, asset, limits)
    }

    pub fn remove(&mut self, role: AssetRole, id: Uuid) -> Option<Asset> {
        let partition = self.partition_mut(role);
        let index = partition.iter().position(|asset| asset.id == id)?;
        Some(partition.remove(index))
    }

    pub fn get(&self, role: AssetRole, id: Uuid) -> Option<&Asset> {
        self.partition(role).iter().find(|asset| asset.id == id)
    }

    /// Looks an asset up in any partition.
    pub fn find(&self, id: Uuid) -> Option<&Asset> {
        AssetRole::ALL
            .iter()
            .find_map(|role| self.get(*role, id))
    }

    pub fn find_by_name(&self, role: AssetRole, name: &str) -> Option<&Asset> {
        let name = name.trim_start_matches('@');
        self.partition(role).iter().find(|asset| asset.name == name)
    }

    pub fn list(&self, role: AssetRole) -> &[Asset] {
        self.partition(role)
    }

    pub fn len(&self, role: AssetRole) -> usize {
        self.partition(role).len()
    }

    pub fn is_empty(&self) -> bool {
        self.garments.is_empty() && self.models.is_empty() && self.poses.is_empty()
    }

    pub fn is_full(&self, role: AssetRole, limits: &BoardLimits) -> bool {
        self.len(role) >= limits.max_for(role)
    }
}

/// MIME type for the image extensions the uploader accepts.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn garment(name: &str) -> Asset {
        Asset::from_bytes(AssetRole::Garment, name, "image/png", b"png")
    }

    #[test]
    fn test_add_respects_role_limit() {
        let limits = BoardLimits::default().with_max(AssetRole::Garment, 2);
        let mut store = AssetStore::new();

        store.add(AssetRole::Garment, garment("a.png"), &limits).unwrap();
        store.add(AssetRole::Garment, garment("b.png"), &limits).unwrap();
        let before: Vec<Uuid> = store.list(AssetRole::Garment).iter().map(|a| a.id).collect();

        let err = store
            .add(AssetRole::Garment, garment("c.png"), &limits)
            .unwrap_err();
        assert!(matches!(
            err,
            StudioError::UploadLimitExceeded { role: AssetRole::Garment, max: 2 }
        ));
        assert_eq!(err.to_string(), "Maximum 2 Garments allowed.");

        let after: Vec<Uuid> = store.list(AssetRole::Garment).iter().map(|a| a.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_add_rejects_wrong_partition() {
        let mut store = AssetStore::new();
        let result = store.add(AssetRole::Pose, garment("a.png"), &BoardLimits::default());
        assert!(result.is_err());
        assert_eq!(store.len(AssetRole::Pose), 0);
    }

    #[test]
    fn test_remove_and_lookup() {
        let limits = BoardLimits::default();
        let mut store = AssetStore::new();
        let id = store.add(AssetRole::Garment, garment("red dress.png"), &limits).unwrap();

        assert_eq!(store.find_by_name(AssetRole::Garment, "@red_dress").unwrap().id, id);
        assert_eq!(store.find(id).unwrap().role, AssetRole::Garment);
        assert!(store.remove(AssetRole::Model, id).is_none());
        assert!(store.remove(AssetRole::Garment, id).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_upload_file_reads_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Blue Coat.JPG");
        std::fs::write(&path, b"jpeg-bytes").unwrap();

        let mut store = AssetStore::new();
        let id = store
            .upload_file(AssetRole::Garment, &path, &BoardLimits::default())
            .unwrap();
        let asset = store.get(AssetRole::Garment, id).unwrap();
        assert_eq!(asset.name, "Blue_Coat");
        assert_eq!(asset.mime_type, "image/jpeg");
        assert!(asset.image_data.starts_with("data:image/jpeg;base64,"));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(matches!(
            store.upload_file(AssetRole::Garment, &text, &BoardLimits::default()),
            Err(StudioError::UnsupportedMedia(_))
        ));
    }
}
