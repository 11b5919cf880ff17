//! OpenAI-compatible completion provider.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, llama.cpp server, and any
//! endpoint exposing the legacy `/v1/completions` API. The prompt is sent
//! as a single string because the delimiter tokens inside it are part of the
//! model's input format.

use async_trait::async_trait;
use sera_core::error::ProviderError;
use sera_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible text-completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Map sampling parameters onto the completions API body.
    fn to_api_request(&self, request: &GenerationRequest) -> ApiCompletionRequest {
        let params = &request.params;
        ApiCompletionRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            max_tokens: params.max_length,
            top_p: params.top_p,
            n: params.num_return_sequences,
            // Greedy decoding is temperature 0 on this API.
            temperature: if params.do_sample {
                params.temperature
            } else {
                0.0
            },
            stream: false,
        }
    }
}

#[async_trait]
impl sera_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError> {
        let url = format!("{}/completions", self.base_url);
        let body = self.to_api_request(&request);

        debug!(
            provider = %self.name,
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiCompletionResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        api_response.into_generation()
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let mut builder = self.client.get(&url);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- API wire types ---

#[derive(Debug, Serialize)]
struct ApiCompletionRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    top_p: f32,
    n: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl ApiCompletionResponse {
    /// Keep the first candidate; extra sequences are discarded.
    fn into_generation(self) -> Result<GenerationResponse, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .min_by_key(|c| c.index)
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let text = choice.text.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "Backend returned an empty completion".into(),
            });
        }

        Ok(GenerationResponse {
            text,
            model: self.model,
            usage: self.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sera_core::Provider;

    fn request(prompt: &str, params: GenerationParams) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.into(),
            params,
        }
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider =
            OpenAiCompatProvider::new("vllm", "http://localhost:8000/v1/", "", "m").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn sampling_params_map_to_api_fields() {
        let provider = OpenAiCompatProvider::new("openai", "https://api.openai.com/v1", "sk-test", "gpt-3.5-turbo-instruct")
                .unwrap();
        let body = provider.to_api_request(&request("hi", GenerationParams::default()));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo-instruct");
        assert_eq!(json["prompt"], "hi");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["n"], 1);
        assert_eq!(json["stream"], false);
        assert!((json["top_p"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn greedy_decoding_zeroes_temperature() {
        let provider = OpenAiCompatProvider::new("openai", "https://api.openai.com/v1", "sk-test", "m").unwrap();
        let params = GenerationParams {
            do_sample: false,
            ..GenerationParams::default()
        };
        let body = provider.to_api_request(&request("hi", params));
        assert_eq!(body.temperature, 0.0);
    }

    #[test]
    fn first_choice_is_used() {
        let data = r#"{"model":"m","choices":[{"index":1,"text":"second"},{"index":0,"text":" first "}],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#;
        let parsed: ApiCompletionResponse = serde_json::from_str(data).unwrap();
        let generation = parsed.into_generation().unwrap();
        assert_eq!(generation.text, "first");
        assert_eq!(generation.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn empty_choices_is_error() {
        let parsed: ApiCompletionResponse =
            serde_json::from_str(r#"{"model":"m","choices":[]}"#).unwrap();
        assert!(parsed.into_generation().is_err());
    }

    #[test]
    fn blank_completion_is_error() {
        let parsed: ApiCompletionResponse =
            serde_json::from_str(r#"{"model":"m","choices":[{"index":0,"text":"  \n"}]}"#)
                .unwrap();
        assert!(parsed.into_generation().is_err());
    }

    /// Serve a canned completions endpoint on an ephemeral port.
    async fn spawn_backend(status: u16, body: serde_json::Value) -> String {
        use axum::{
            Json, Router,
            http::StatusCode,
            routing::{get, post},
        };

        let app = Router::new()
            .route(
                "/v1/completions",
                post(move |Json(req): Json<serde_json::Value>| {
                    let body = body.clone();
                    async move {
                        assert!(req["prompt"].is_string());
                        (StatusCode::from_u16(status).unwrap(), Json(body))
                    }
                }),
            )
            .route(
                "/v1/models",
                get(move || async move {
                    (
                        StatusCode::from_u16(status).unwrap(),
                        Json(serde_json::json!({"data": []})),
                    )
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn generate_against_local_backend() {
        let url = spawn_backend(
            200,
            serde_json::json!({
                "model": "cosmo",
                "choices": [{"index": 0, "text": "That sounds exhausting."}]
            }),
        )
        .await;

        let provider = OpenAiCompatProvider::new("vllm", url, "", "cosmo").unwrap();
        let response = provider
            .generate(request("persona <sep>  <turn> hi", GenerationParams::default()))
            .await
            .unwrap();
        assert_eq!(response.text, "That sounds exhausting.");
        assert_eq!(response.model, "cosmo");
    }

    #[tokio::test]
    async fn backend_error_status_is_api_error() {
        let url = spawn_backend(500, serde_json::json!({"error": "boom"})).await;
        let provider = OpenAiCompatProvider::new("vllm", url, "", "cosmo").unwrap();

        let err = provider
            .generate(request("hi", GenerationParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let url = spawn_backend(401, serde_json::json!({})).await;
        let provider = OpenAiCompatProvider::new("openai", url, "sk-bad", "m").unwrap();

        let err = provider
            .generate(request("hi", GenerationParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn health_check_queries_models_endpoint() {
        let up = spawn_backend(200, serde_json::json!({})).await;
        let provider = OpenAiCompatProvider::new("vllm", up, "", "cosmo").unwrap();
        assert!(provider.health_check().await.unwrap());

        let failing = spawn_backend(503, serde_json::json!({})).await;
        let provider = OpenAiCompatProvider::new("vllm", failing, "", "cosmo").unwrap();
        assert!(!provider.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn health_check_unreachable_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider =
            OpenAiCompatProvider::new("vllm", format!("http://{addr}/v1"), "", "cosmo").unwrap();
        assert!(matches!(
            provider.health_check().await,
            Err(ProviderError::Network(_))
        ));
    }
}
