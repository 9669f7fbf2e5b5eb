//! Ingredient detection from photos
//!
//! A detector asks a vision model which catalog ingredients appear in an
//! uploaded image. Whatever the model answers is cut back to catalog entries
//! before it reaches the pantry, so the rest of the service only ever sees
//! known ingredient ids.
use std::collections::{HashMap, HashSet};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{DetectedIngredient, Ingredient},
};

const DETECTION_CACHE_TTL: u64 = 86400; // 1 day
const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// An uploaded image ready to send to a detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageUpload {
    /// Wraps raw bytes, falling back to JPEG when the type is missing or not an image
    pub fn new(bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        let mime_type = content_type
            .map(str::trim)
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or(FALLBACK_MIME_TYPE)
            .to_string();

        Self { bytes, mime_type }
    }

    /// Hex SHA-256 of the image bytes
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

/// Recognises catalog ingredients in images
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait IngredientDetector: Send + Sync {
    /// Returns the catalog ingredients visible in the image
    async fn detect(
        &self,
        image: &ImageUpload,
        catalog: &[Ingredient],
    ) -> AppResult<Vec<DetectedIngredient>>;
}

/// Runs a detector over an upload, reusing earlier answers for identical images
pub async fn scan_ingredients(
    detector: &dyn IngredientDetector,
    cache: &Option<Cache>,
    catalog: &[Ingredient],
    image: ImageUpload,
) -> AppResult<Vec<DetectedIngredient>> {
    if image.bytes.is_empty() {
        return Err(AppError::InvalidInput(
            "Empty or invalid image file".to_string(),
        ));
    }

    let digest = image.digest();
    tracing::info!(
        bytes = image.bytes.len(),
        mime_type = %image.mime_type,
        digest = %digest,
        "Scanning image for ingredients"
    );

    let detected: Vec<DetectedIngredient> = cached!(
        cache,
        CacheKey::Detection(digest),
        DETECTION_CACHE_TTL,
        async { detector.detect(&image, catalog).await }
    )?;

    // Cached answers may predate catalog changes
    let detected = restrict_to_catalog(detected, catalog);

    tracing::info!(detected = detected.len(), "Ingredient scan completed");

    Ok(detected)
}

/// Keeps only entries whose id is in the catalog, once each, named as in the catalog
pub fn restrict_to_catalog(
    detected: Vec<DetectedIngredient>,
    catalog: &[Ingredient],
) -> Vec<DetectedIngredient> {
    let names: HashMap<i32, &str> = catalog.iter().map(|i| (i.id, i.name.as_str())).collect();
    let mut seen = HashSet::new();

    detected
        .into_iter()
        .filter_map(|candidate| {
            let name = names.get(&candidate.id)?;
            if !seen.insert(candidate.id) {
                return None;
            }
            Some(DetectedIngredient {
                id: candidate.id,
                name: (*name).to_string(),
            })
        })
        .collect()
}

/// Removes a surrounding Markdown code fence, if any
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // Drop the info string ("json"), which may share a line with the payload
    let body = match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with(['[', '{']) => body,
        _ => {
            let inline = rest.trim_start();
            inline.strip_prefix("json").unwrap_or(inline)
        }
    };
    body.trim()
}

/// Parses a model reply into detected ingredients restricted to the catalog
pub fn parse_detection_reply(
    reply: &str,
    catalog: &[Ingredient],
) -> AppResult<Vec<DetectedIngredient>> {
    let json = strip_code_fences(reply);
    let detected: Vec<DetectedIngredient> = serde_json::from_str(json).map_err(|e| {
        tracing::warn!(error = %e, reply = %reply, "Vision model reply was not valid JSON");
        AppError::Processing(
            "Failed to parse AI response. The model did not return valid JSON.".to_string(),
        )
    })?;

    Ok(restrict_to_catalog(detected, catalog))
}

/// Builds the instruction text listing the catalog as `id: name` pairs
pub fn build_prompt(catalog: &[Ingredient]) -> String {
    let entries = catalog
        .iter()
        .map(|i| format!("{}: {}", i.id, i.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a cooking assistant API.\n\
         I will provide a list of valid ingredients from my database (ID: NAME).\n\n\
         Your task:\n\
         1. Analyze the provided image.\n\
         2. Identify food ingredients visible in the image.\n\
         3. Match them STRICTLY to the provided database list.\n\
         4. Ignore any items in the image that do not match a name in the list.\n\
         5. Return ONLY a valid JSON list of objects.\n\n\
         Database List:\n[{entries}]\n\n\
         Output Format required:\n\
         [{{\"id\": 123, \"name\": \"tomato\"}}, {{\"id\": 456, \"name\": \"onion\"}}]\n\n\
         Return ONLY the JSON. No markdown, no explanations."
    )
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum RequestPart {
    Text(String),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: String,
        data: String,
    },
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Detector backed by the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiDetector {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiDetector {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }

    fn build_request(image: &ImageUpload, catalog: &[Ingredient]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text(build_prompt(catalog)),
                    RequestPart::InlineData {
                        mime_type: image.mime_type.clone(),
                        data: BASE64.encode(&image.bytes),
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        }
    }
}

#[async_trait::async_trait]
impl IngredientDetector for GeminiDetector {
    async fn detect(
        &self,
        image: &ImageUpload,
        catalog: &[Ingredient],
    ) -> AppResult<Vec<DetectedIngredient>> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(image, catalog))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                model = %self.model,
                "Vision model request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Vision model returned status {}: {}",
                status, body
            )));
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply.text().ok_or_else(|| {
            AppError::Processing("Vision model returned an empty response".to_string())
        })?;

        parse_detection_reply(&text, catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Ingredient> {
        vec![
            Ingredient::new(12, "Tomato"),
            Ingredient::new(40, "Onion"),
            Ingredient::new(41, "Garlic"),
        ]
    }

    fn detected(id: i32, name: &str) -> DetectedIngredient {
        DetectedIngredient {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_strip_code_fences_with_language() {
        let reply = "```json\n[{\"id\": 12, \"name\": \"tomato\"}]\n```";
        assert_eq!(strip_code_fences(reply), "[{\"id\": 12, \"name\": \"tomato\"}]");
    }

    #[test]
    fn test_strip_code_fences_on_one_line() {
        let reply = "```json[{\"id\": 12, \"name\": \"tomato\"}]```";
        assert_eq!(strip_code_fences(reply), "[{\"id\": 12, \"name\": \"tomato\"}]");
        assert_eq!(strip_code_fences("```[]```"), "[]");

        let parsed = parse_detection_reply(reply, &catalog()).unwrap();
        assert_eq!(
            parsed,
            vec![DetectedIngredient {
                id: 12,
                name: "Tomato".to_string()
            }]
        );
    }

    #[test]
    fn test_strip_code_fences_keeps_multiline_payload_without_tag() {
        assert_eq!(strip_code_fences("```[1,\n2]\n```"), "[1,\n2]");
    }

    #[test]
    fn test_strip_code_fences_plain() {
        let reply = "  ```\n[]\n```  ";
        assert_eq!(strip_code_fences(reply), "[]");
    }

    #[test]
    fn test_strip_code_fences_leaves_bare_json() {
        assert_eq!(strip_code_fences(" [1, 2] \n"), "[1, 2]");
    }

    #[test]
    fn test_parse_reply_restricts_to_catalog() {
        let reply = r#"```json
[{"id": 12, "name": "tomato"}, {"id": 999, "name": "unicorn"}, {"id": 40, "name": "onion"}]
```"#;

        let parsed = parse_detection_reply(reply, &catalog()).unwrap();
        assert_eq!(parsed, vec![detected(12, "Tomato"), detected(40, "Onion")]);
    }

    #[test]
    fn test_parse_reply_drops_duplicates() {
        let reply = r#"[{"id": 41, "name": "garlic"}, {"id": 41, "name": "garlic clove"}]"#;

        let parsed = parse_detection_reply(reply, &catalog()).unwrap();
        assert_eq!(parsed, vec![detected(41, "Garlic")]);
    }

    #[test]
    fn test_parse_reply_rejects_prose() {
        let result = parse_detection_reply("I can see a tomato and an onion.", &catalog());
        assert!(matches!(result, Err(AppError::Processing(_))));
    }

    #[test]
    fn test_prompt_lists_catalog_pairs() {
        let prompt = build_prompt(&catalog());
        assert!(prompt.contains("[12: Tomato, 40: Onion, 41: Garlic]"));
        assert!(prompt.contains(r#"{"id": 123, "name": "tomato"}"#));
    }

    #[test]
    fn test_image_upload_mime_fallback() {
        assert_eq!(ImageUpload::new(vec![1], Some("image/png")).mime_type, "image/png");
        assert_eq!(ImageUpload::new(vec![1], None).mime_type, "image/jpeg");
        assert_eq!(
            ImageUpload::new(vec![1], Some("application/octet-stream")).mime_type,
            "image/jpeg"
        );
    }

    #[test]
    fn test_image_digest_is_stable_hex() {
        let upload = ImageUpload::new(b"abc".to_vec(), None);
        assert_eq!(
            upload.digest(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_request_serializes_inline_image() {
        let upload = ImageUpload::new(b"abc".to_vec(), Some("image/png"));
        let request = GeminiDetector::build_request(&upload, &catalog());
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("12: Tomato"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "YWJj");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "[{\"id\": 12,"}, {"text": " \"name\": \"tomato\"}]"}]}}]}"#,
        )
        .unwrap();

        assert_eq!(
            reply.text().as_deref(),
            Some(r#"[{"id": 12, "name": "tomato"}]"#)
        );
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let reply: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(reply.text(), None);
    }

    #[tokio::test]
    async fn test_scan_rejects_empty_image() {
        let mut detector = MockIngredientDetector::new();
        detector.expect_detect().never();

        let result =
            scan_ingredients(&detector, &None, &catalog(), ImageUpload::new(Vec::new(), None))
                .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_scan_filters_detector_output() {
        let mut detector = MockIngredientDetector::new();
        detector
            .expect_detect()
            .times(1)
            .returning(|_, _| Ok(vec![detected(40, "onion"), detected(7, "ghost")]));

        let upload = ImageUpload::new(b"fake-png".to_vec(), Some("image/png"));
        let result = scan_ingredients(&detector, &None, &catalog(), upload).await;

        let found = tokio_test::assert_ok!(result);
        assert_eq!(found, vec![detected(40, "Onion")]);
    }

    #[tokio::test]
    async fn test_scan_propagates_processing_errors() {
        let mut detector = MockIngredientDetector::new();
        detector
            .expect_detect()
            .returning(|_, _| Err(AppError::Processing("not json".to_string())));

        let upload = ImageUpload::new(b"fake-png".to_vec(), None);
        let result = scan_ingredients(&detector, &None, &catalog(), upload).await;

        assert!(matches!(result, Err(AppError::Processing(_))));
    }
}
