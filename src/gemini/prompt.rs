use crate::models::{Asset, Part, ShotGenerationRequest};

pub const MODEL_REFERENCE_TAG: &str = "[Reference: Target Model Identification]";
pub const POSE_REFERENCE_TAG: &str =
    "[Reference: Pose and Body Stance Guide Only. Ignore the face of this person.]";

/// Instruction block sent ahead of the reference tags.
pub fn instruction_block(scene: &str) -> String {
    format!(
        "Task: Generate a high-quality fashion photograph.\n\
         \n\
         Instructions:\n\
         1. Use the \"Model Reference\" image provided below as the primary subject. Preserve their facial identity, hair, and body type exactly.\n\
         2. Use the \"Clothes Reference\" images provided below. The subject MUST wear these specific items. Preserve all colors, patterns, and fabric textures.\n\
         3. If a \"Pose Reference\" image is provided: ONLY use it as a guide for the posture, stance, and body positioning. DO NOT use the identity of the person in the Pose Reference. The final person must be the Target Model.\n\
         4. Scene/Context: {}\n",
        scene
    )
}

pub fn garment_reference_tag(name: &str) -> String {
    format!("[Reference: Required Garment - {}]", name)
}

/// Content parts in wire order: model, pose, garments, then the text.
/// References whose data carries no payload are skipped along with their tag.
pub fn compose_parts(request: &ShotGenerationRequest) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut text = instruction_block(&request.prompt);

    let mut attach = |asset: &Asset, tag: String, parts: &mut Vec<Part>| {
        if let Some(payload) = asset.base64_payload() {
            parts.push(Part::image(asset.mime_type.clone(), payload));
            text.push('\n');
            text.push_str(&tag);
        } else {
            log::warn!("Skipping reference @{}: no image payload", asset.name);
        }
    };

    if let Some(model) = &request.model {
        attach(model, MODEL_REFERENCE_TAG.to_string(), &mut parts);
    }
    if let Some(pose) = &request.pose {
        attach(pose, POSE_REFERENCE_TAG.to_string(), &mut parts);
    }
    for garment in &request.garments {
        attach(garment, garment_reference_tag(&garment.name), &mut parts);
    }

    parts.push(Part::text(text));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetRole;

    fn asset(role: AssetRole, name: &str, mime: &str) -> Asset {
        Asset::from_bytes(role, name, mime, name.as_bytes())
    }

    #[test]
    fn test_parts_follow_model_pose_garment_order() {
        let mut request = ShotGenerationRequest::new("studio, soft light");
        request.garments = vec![
            asset(AssetRole::Garment, "skirt.png", "image/png"),
            asset(AssetRole::Garment, "blazer.png", "image/png"),
        ];
        request.pose = Some(asset(AssetRole::Pose, "stance.webp", "image/webp"));
        request.model = Some(asset(AssetRole::Model, "ana.jpg", "image/jpeg"));

        let parts = compose_parts(&request);
        assert_eq!(parts.len(), 5);

        let mimes: Vec<_> = parts[..4]
            .iter()
            .map(|p| p.inline_data.as_ref().unwrap().mime_type.clone().unwrap())
            .collect();
        assert_eq!(mimes, ["image/jpeg", "image/webp", "image/png", "image/png"]);

        let text = parts[4].text.as_deref().unwrap();
        assert!(text.contains("Scene/Context: studio, soft light"));
        let model_at = text.find(MODEL_REFERENCE_TAG).unwrap();
        let pose_at = text.find(POSE_REFERENCE_TAG).unwrap();
        let skirt_at = text.find("Required Garment - skirt").unwrap();
        let blazer_at = text.find("Required Garment - blazer").unwrap();
        assert!(model_at < pose_at && pose_at < skirt_at && skirt_at < blazer_at);
    }

    #[test]
    fn test_text_only_request() {
        let parts = compose_parts(&ShotGenerationRequest::new("beach"));
        assert_eq!(parts.len(), 1);
        assert!(parts[0].inline_data.is_none());
        assert!(!parts[0].text.as_deref().unwrap().contains("[Reference:"));
    }

    #[test]
    fn test_reference_without_payload_is_skipped() {
        let mut request = ShotGenerationRequest::new("street");
        let mut broken = asset(AssetRole::Model, "ana.png", "image/png");
        broken.image_data = "corrupted".into();
        request.model = Some(broken);

        let parts = compose_parts(&request);
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].text.as_deref().unwrap().contains(MODEL_REFERENCE_TAG));
    }
}
