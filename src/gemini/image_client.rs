use super::{prompt, ImageBackend};
use crate::{
    config::GeminiConfig,
    credentials::CredentialResolver,
    error::{Result, StudioError},
    logger,
    models::{
        ApiErrorEnvelope, Content, GenerateContentRequest, GenerateContentResponse,
        GeneratedImage, GenerationConfig, ImageConfig, ShotGenerationRequest,
    },
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    config: GeminiConfig,
    credentials: CredentialResolver,
}

impl ImageClient {
    pub fn new(config: GeminiConfig, credentials: CredentialResolver) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| StudioError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn model(&self) -> &str {
        self.config.model()
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base(),
            self.config.model()
        )
    }

    pub async fn generate(&self, request: ShotGenerationRequest) -> Result<GeneratedImage> {
        let api_key = self.credentials.resolve().await?.into_key()?;

        let payload = build_request(&request);
        let model = self.config.model().to_string();

        log::info!(
            "Generating {} {} image with model: {}",
            request.image_size,
            request.aspect_ratio,
            model
        );
        log::debug!(
            "Request carries {} part(s), seed {:?}",
            payload.contents.first().map_or(0, |c| c.parts.len()),
            request.seed
        );

        let timer = logger::timer("image generation");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                log::error!("Image generation transport error: {:?}", e);
                classify_failure(e.status(), &e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StudioError::ResponseError(e.to_string()))?;
        timer.finish();

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .ok()
                .map(|envelope| {
                    let error = envelope.error;
                    format!(
                        "{} {}: {}",
                        error.code.unwrap_or(status.as_u16()),
                        error.status.unwrap_or_default(),
                        error.message.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| format!("{} {}", status.as_u16(), body));
            log::error!("Image generation rejected: {}", message);
            return Err(classify_failure(Some(status), &message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| StudioError::ResponseError(e.to_string()))?;
        decode_response(parsed, &model)
    }
}

#[async_trait]
impl ImageBackend for ImageClient {
    async fn generate(&self, request: ShotGenerationRequest) -> Result<GeneratedImage> {
        ImageClient::generate(self, request).await
    }
}

pub fn build_request(request: &ShotGenerationRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: prompt::compose_parts(request),
        }],
        generation_config: GenerationConfig {
            image_config: ImageConfig {
                image_size: request.image_size,
                aspect_ratio: request.aspect_ratio,
            },
            seed: request.seed,
        },
    }
}

/// Picks the first inline image of the first candidate.
pub fn decode_response(response: GenerateContentResponse, model: &str) -> Result<GeneratedImage> {
    let candidate = response.candidates.into_iter().next();

    if let Some(candidate) = &candidate {
        let parts = candidate
            .content
            .as_ref()
            .map(|content| content.parts.as_slice())
            .unwrap_or_default();
        for part in parts {
            if let Some(inline) = &part.inline_data {
                if let Some(data) = inline.data.as_deref().filter(|d| !d.is_empty()) {
                    let mime = inline.mime_type.as_deref().unwrap_or("image/png");
                    return Ok(GeneratedImage {
                        data_uri: format!("data:{};base64,{}", mime, data),
                        model: model.to_string(),
                    });
                }
            }
        }
    }

    match candidate.and_then(|c| c.finish_reason) {
        Some(reason) => Err(StudioError::GenerationFailed(format!(
            "Generation stopped. Reason: {}",
            reason
        ))),
        None => Err(StudioError::NoImageReturned),
    }
}

/// Maps a rejected call onto the failure taxonomy.
pub fn classify_failure(status: Option<StatusCode>, message: &str) -> StudioError {
    if status == Some(StatusCode::TOO_MANY_REQUESTS) || is_quota_message(message) {
        return StudioError::QuotaExceeded(message.to_string());
    }
    let message = if message.trim().is_empty() {
        "Failed to generate image.".to_string()
    } else {
        message.to_string()
    };
    StudioError::GenerationFailed(message)
}

pub fn is_quota_message(message: &str) -> bool {
    let normalized = message.to_lowercase().replace('_', " ");
    normalized.contains("429")
        || normalized.contains("quota")
        || normalized.contains("resource exhausted")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::gemini::GeminiClient;
    use crate::models::{AspectRatio, ImageSize};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn client_for(base: &str, store: MemoryCredentialStore) -> ImageClient {
        let config = GeminiConfig::new()
            .with_api_base(base)
            .with_model("test-model")
            .with_timeout(5);
        let credentials = CredentialResolver::new(Arc::new(store)).with_env_lookup(|_| None);
        ImageClient::new(config, credentials).unwrap()
    }

    /// Answers a single HTTP request with `status` and a JSON `body`, and
    /// hands back the raw request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            let head = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                raw.extend_from_slice(&chunk[..n]);
                if let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&raw[..end]).to_string();
                    let length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    while raw.len() < end + 4 + length {
                        let n = socket.read(&mut chunk).await.unwrap();
                        if n == 0 {
                            break;
                        }
                        raw.extend_from_slice(&chunk[..n]);
                    }
                    break head;
                }
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            head
        });
        (base, handle)
    }

    #[tokio::test]
    async fn test_generate_requires_key_before_any_call() {
        // TEST-NET-1 address; nothing answers there.
        let client = client_for("http://192.0.2.1:9", MemoryCredentialStore::new());
        let result = client.generate(ShotGenerationRequest::new("city")).await;
        assert!(matches!(result, Err(StudioError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_generate_maps_rate_limit_to_quota() {
        let (base, server) = serve_once(
            "429 Too Many Requests",
            r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED","message":"Resource has been exhausted"}}"#,
        )
        .await;
        let client = client_for(&base, MemoryCredentialStore::with_key("test-key"));

        let result = client.generate(ShotGenerationRequest::new("city")).await;
        assert!(matches!(result, Err(StudioError::QuotaExceeded(_))));

        let head = server.await.unwrap();
        assert!(head.starts_with("POST /models/test-model:generateContent "));
        assert!(head.to_lowercase().contains("x-goog-api-key: test-key"));
    }

    #[tokio::test]
    async fn test_generate_reports_rejection_message() {
        let (base, server) = serve_once(
            "400 Bad Request",
            r#"{"error":{"code":400,"status":"INVALID_ARGUMENT","message":"API key not valid"}}"#,
        )
        .await;
        let client = client_for(&base, MemoryCredentialStore::with_key("test-key"));

        match client.generate(ShotGenerationRequest::new("city")).await {
            Err(StudioError::GenerationFailed(msg)) => {
                assert_eq!(msg, "400 INVALID_ARGUMENT: API key not valid")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_success_without_image() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"I cannot draw that"}]}}]}"#,
        )
        .await;
        let client = client_for(&base, MemoryCredentialStore::with_key("test-key"));

        let result = client.generate(ShotGenerationRequest::new("city")).await;
        assert!(matches!(result, Err(StudioError::NoImageReturned)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_returns_inline_image() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"UE5H"}}]}}]}"#,
        )
        .await;
        let client = GeminiClient::new(
            GeminiConfig::new().with_api_base(base).with_model("test-model"),
            CredentialResolver::new(Arc::new(MemoryCredentialStore::with_key("test-key")))
                .with_env_lookup(|_| None),
        )
        .unwrap();
        assert_eq!(client.image().model(), "test-model");

        let image = ImageBackend::generate(&client, ShotGenerationRequest::new("city"))
            .await
            .unwrap();
        assert_eq!(image.data_uri, "data:image/png;base64,UE5H");
        assert_eq!(image.model, "test-model");
        server.await.unwrap();
    }

    fn response(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_wire_shape() {
        let mut request = ShotGenerationRequest::new("city");
        request.aspect_ratio = AspectRatio::Portrait;
        request.image_size = ImageSize::TwoK;
        request.seed = Some(42);

        let value = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(value["generationConfig"]["imageConfig"]["imageSize"], "2K");
        assert_eq!(value["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
        assert_eq!(value["generationConfig"]["seed"], 42);
        assert!(value["contents"][0]["parts"][0]["text"].is_string());

        request.seed = None;
        let value = serde_json::to_value(build_request(&request)).unwrap();
        assert!(value["generationConfig"].get("seed").is_none());
    }

    #[test]
    fn test_decode_first_inline_image() {
        let parsed = response(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"here you go"},
                {"inlineData":{"mimeType":"image/jpeg","data":"QUJD"}},
                {"inlineData":{"mimeType":"image/png","data":"REVG"}}
            ]}}]}"#,
        );
        let image = decode_response(parsed, "m").unwrap();
        assert_eq!(image.data_uri, "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn test_decode_defaults_mime_to_png() {
        let parsed = response(r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"QUJD"}}]}}]}"#);
        assert_eq!(
            decode_response(parsed, "m").unwrap().data_uri,
            "data:image/png;base64,QUJD"
        );
    }

    #[test]
    fn test_decode_without_image() {
        let empty = response(r#"{"candidates":[{"content":{"parts":[{"text":"no"}]}}]}"#);
        assert!(matches!(decode_response(empty, "m"), Err(StudioError::NoImageReturned)));

        let nothing = response("{}");
        assert!(matches!(decode_response(nothing, "m"), Err(StudioError::NoImageReturned)));

        let blocked = response(r#"{"candidates":[{"finishReason":"IMAGE_SAFETY"}]}"#);
        match decode_response(blocked, "m") {
            Err(StudioError::GenerationFailed(msg)) => {
                assert_eq!(msg, "Generation stopped. Reason: IMAGE_SAFETY")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_classify_failure() {
        assert!(classify_failure(Some(StatusCode::TOO_MANY_REQUESTS), "slow down").is_quota());
        assert!(classify_failure(None, "got status 429 from upstream").is_quota());
        assert!(classify_failure(None, "You exceeded your current Quota").is_quota());
        assert!(classify_failure(Some(StatusCode::BAD_REQUEST), "400 RESOURCE_EXHAUSTED: x").is_quota());

        let other = classify_failure(Some(StatusCode::BAD_REQUEST), "API key not valid");
        assert!(matches!(other, StudioError::GenerationFailed(ref m) if m == "API key not valid"));
        assert_eq!(
            classify_failure(None, " ").to_string(),
            "Failed to generate image."
        );
    }
}
