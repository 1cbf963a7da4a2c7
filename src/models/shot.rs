use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "3:4")]
    Classic,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Classic,
        AspectRatio::Square,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Classic => "3:4",
            AspectRatio::Square => "1:1",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s)
            .ok_or_else(|| format!("unsupported aspect ratio: {} (expected 9:16, 16:9, 3:4 or 1:1)", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::OneK, ImageSize::TwoK, ImageSize::FourK];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported image size: {} (expected 1K, 2K or 4K)", s))
    }
}

/// One storyboard frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub id: Uuid,
    pub prompt: String,
    pub selected_garment_ids: Vec<Uuid>,
    pub selected_model_id: Option<Uuid>,
    pub selected_pose_id: Option<Uuid>,
    pub generated_image: Option<String>,
    pub is_generating: bool,
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for Shot {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: String::new(),
            selected_garment_ids: Vec::new(),
            selected_model_id: None,
            selected_pose_id: None,
            generated_image: None,
            is_generating: false,
            aspect_ratio: AspectRatio::Portrait,
            image_size: ImageSize::OneK,
            seed: None,
            error: None,
        }
    }
}

impl Shot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_image(&self) -> bool {
        self.generated_image.is_some()
    }

    /// `Frame 01` style label for a zero-based board position.
    pub fn frame_label(index: usize) -> String {
        format!("Frame {:02}", index + 1)
    }

    /// File name offered when downloading this shot's image.
    pub fn download_name(&self, index: usize) -> String {
        format!("fashion-frame-{}-{}.png", index + 1, self.image_size)
    }
}

/// Partial field patch for [`Shot`]. Unset fields are left untouched; the
/// nested options let a patch clear a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotUpdate {
    pub prompt: Option<String>,
    pub selected_garment_ids: Option<Vec<Uuid>>,
    pub selected_model_id: Option<Option<Uuid>>,
    pub selected_pose_id: Option<Option<Uuid>>,
    pub generated_image: Option<Option<String>>,
    pub is_generating: Option<bool>,
    pub aspect_ratio: Option<AspectRatio>,
    pub image_size: Option<ImageSize>,
    pub seed: Option<Option<u32>>,
    pub error: Option<Option<String>>,
}

impl ShotUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_garments(mut self, ids: Vec<Uuid>) -> Self {
        self.selected_garment_ids = Some(ids);
        self
    }

    pub fn with_model(mut self, id: Option<Uuid>) -> Self {
        self.selected_model_id = Some(id);
        self
    }

    pub fn with_pose(mut self, id: Option<Uuid>) -> Self {
        self.selected_pose_id = Some(id);
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = Some(size);
        self
    }

    pub fn with_seed(mut self, seed: Option<u32>) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generation started: flag set, previous error cleared, image kept.
    pub fn generating() -> Self {
        Self {
            is_generating: Some(true),
            error: Some(None),
            ..Default::default()
        }
    }

    pub fn succeeded(image: String, size: ImageSize, seed: u32) -> Self {
        Self {
            generated_image: Some(Some(image)),
            is_generating: Some(false),
            image_size: Some(size),
            seed: Some(Some(seed)),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_generating: Some(false),
            error: Some(Some(message.into())),
            ..Default::default()
        }
    }

    pub fn merge_into(self, shot: &mut Shot) {
        if let Some(prompt) = self.prompt {
            shot.prompt = prompt;
        }
        if let Some(ids) = self.selected_garment_ids {
            shot.selected_garment_ids = ids;
        }
        if let Some(model) = self.selected_model_id {
            shot.selected_model_id = model;
        }
        if let Some(pose) = self.selected_pose_id {
            shot.selected_pose_id = pose;
        }
        if let Some(image) = self.generated_image {
            shot.generated_image = image;
        }
        if let Some(flag) = self.is_generating {
            shot.is_generating = flag;
        }
        if let Some(ratio) = self.aspect_ratio {
            shot.aspect_ratio = ratio;
        }
        if let Some(size) = self.image_size {
            shot.image_size = size;
        }
        if let Some(seed) = self.seed {
            shot.seed = seed;
        }
        if let Some(error) = self.error {
            shot.error = error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_shot_defaults() {
        let shot = Shot::new();
        assert_eq!(shot.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(shot.image_size, ImageSize::OneK);
        assert!(shot.selected_garment_ids.is_empty());
        assert!(shot.seed.is_none());
        assert!(!shot.is_generating);
    }

    #[test]
    fn test_generating_keeps_prior_image() {
        let mut shot = Shot::new();
        shot.generated_image = Some("data:image/png;base64,AAAA".into());
        shot.error = Some("boom".into());

        ShotUpdate::generating().merge_into(&mut shot);

        assert!(shot.is_generating);
        assert!(shot.error.is_none());
        assert_eq!(shot.generated_image.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_labels_and_wire_strings() {
        let mut shot = Shot::new();
        shot.image_size = ImageSize::FourK;
        assert_eq!(Shot::frame_label(0), "Frame 01");
        assert_eq!(shot.download_name(2), "fashion-frame-3-4K.png");
        assert_eq!(serde_json::to_string(&AspectRatio::Classic).unwrap(), "\"3:4\"");
        assert_eq!("2k".parse::<ImageSize>().unwrap(), ImageSize::TwoK);
        assert!("5:4".parse::<AspectRatio>().is_err());
    }
}
