use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    Garment,
    Model,
    Pose,
}

impl AssetRole {
    pub const ALL: [AssetRole; 3] = [AssetRole::Garment, AssetRole::Pose, AssetRole::Model];

    /// Section title used by uploaders and limit notices.
    pub fn title(&self) -> &'static str {
        match self {
            AssetRole::Garment => "Garments",
            AssetRole::Model => "Models",
            AssetRole::Pose => "Poses",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRole::Garment => "garment",
            AssetRole::Model => "model",
            AssetRole::Pose => "pose",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl std::str::FromStr for AssetRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "garment" | "garments" | "clothes" => Ok(AssetRole::Garment),
            "model" | "models" => Ok(AssetRole::Model),
            "pose" | "poses" => Ok(AssetRole::Pose),
            other => Err(format!("unknown asset role: {}", other)),
        }
    }
}

/// An uploaded reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub role: AssetRole,
    /// Full `data:` URI of the encoded bitmap.
    pub image_data: String,
    pub mime_type: String,
}

impl Asset {
    pub fn new(
        role: AssetRole,
        file_name: &str,
        mime_type: impl Into<String>,
        image_data: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: mention_name(file_name),
            role,
            image_data: image_data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Builds an asset straight from file bytes.
    pub fn from_bytes(role: AssetRole, file_name: &str, mime_type: &str, bytes: &[u8]) -> Self {
        let uri = DataUri::encode(mime_type, bytes);
        Self::new(role, file_name, mime_type, uri.to_string())
    }

    /// The raw base64 payload, if the stored data URI carries one.
    pub fn base64_payload(&self) -> Option<&str> {
        DataUri::payload_of(&self.image_data)
    }

    pub fn mention(&self) -> String {
        format!("@{}", self.name)
    }
}

/// Derives the `@mention` token from a file name: everything before the first
/// `.`, with each non-alphanumeric character replaced by `_`.
pub fn mention_name(file_name: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or_default();
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime_type = header.split(';').next().unwrap_or_default();
        Some(Self::new(mime_type, data))
    }

    /// Text after the first `,`; `None` when the value has no separator.
    pub fn payload_of(uri: &str) -> Option<&str> {
        uri.split_once(',').map(|(_, data)| data)
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.data.as_bytes())
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_name_sanitizes_file_stem() {
        assert_eq!(mention_name("red dress.png"), "red_dress");
        assert_eq!(mention_name("look-01.final.jpg"), "look_01");
        assert_eq!(mention_name("Model_A"), "Model_A");
        assert_eq!(mention_name("été.webp"), "_t_");
    }

    #[test]
    fn test_data_uri_parse_and_display() {
        let uri = DataUri::encode("image/png", b"abc");
        let text = uri.to_string();
        assert_eq!(text, "data:image/png;base64,YWJj");

        let parsed = DataUri::parse(&text).unwrap();
        assert_eq!(parsed.mime_type, "image/png");
        assert_eq!(parsed.decode().unwrap(), b"abc");

        assert!(DataUri::parse("not a uri").is_none());
        assert_eq!(DataUri::payload_of("no-separator"), None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("clothes".parse::<AssetRole>().unwrap(), AssetRole::Garment);
        assert_eq!("Pose".parse::<AssetRole>().unwrap(), AssetRole::Pose);
        assert!("shoe".parse::<AssetRole>().is_err());
        assert_eq!(AssetRole::Model.to_string(), "Models");
    }
}
