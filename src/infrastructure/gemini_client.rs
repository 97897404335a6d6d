// Gemini client - generateContent over reqwest
use crate::application::text_generator::{GenerationError, TextGenerator};
use crate::infrastructure::config::GeminiSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build generation HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(&self.api_key)
        )
    }
}

/// First candidate, first part.
fn first_text(response: GenerateResponse) -> Result<String, GenerationError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| GenerationError::Malformed("no candidate text in response".to_string()))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig::default(),
        };

        let response = self
            .client
            .post(self.build_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let data = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        first_text(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn settings(base_url: String, api_key: &str) -> GeminiSettings {
        GeminiSettings {
            base_url,
            api_key: api_key.to_string(),
            ..GeminiSettings::default()
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_build_url_encodes_key() {
        let client = GeminiClient::new(&settings("https://example.test/v1beta/".to_string(), "a+b/c")).unwrap();
        assert_eq!(
            client.build_url(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent?key=a%2Bb%2Fc"
        );
    }

    #[test]
    fn test_missing_candidates_is_malformed() {
        let response: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(matches!(first_text(response), Err(GenerationError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_generate_against_local_endpoint() {
        let router = Router::new().route(
            "/models/:call",
            post(
                |Path(call): Path<String>,
                 Query(query): Query<HashMap<String, String>>,
                 Json(body): Json<Value>| async move {
                    assert_eq!(call, "gemini-1.5-flash:generateContent");
                    assert_eq!(query["key"], "secret");
                    assert_eq!(body["generationConfig"]["topK"], 40);
                    assert_eq!(body["contents"][0]["parts"][0]["text"], "describe the match");
                    Json(json!({
                        "candidates": [{ "content": { "parts": [{ "text": "{\"commentary\":\"ok\"}" }] } }]
                    }))
                },
            ),
        );
        let base = serve(router).await;

        let client = GeminiClient::new(&settings(base, "secret")).unwrap();
        let text = client.generate("describe the match").await.unwrap();
        assert_eq!(text, r#"{"commentary":"ok"}"#);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/models/:call",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let base = serve(router).await;

        let client = GeminiClient::new(&settings(base, "secret")).unwrap();
        match client.generate("anything").await {
            Err(GenerationError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
