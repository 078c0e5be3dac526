use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{GenerationParams, ModelLoader, SummaryModel};
use crate::config::Config;
use crate::error::{AppError, Result};

const SUMMARIZATION_TASK: &str = "summarization";

#[derive(Serialize)]
struct Parameters {
    max_length: usize,
    min_length: usize,
    do_sample: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncation: Option<&'static str>,
}

#[derive(Serialize)]
struct Options {
    wait_for_model: bool,
}

#[derive(Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
    options: Options,
}

/// Pretrained seq2seq summarizer served by the Hugging Face Inference API.
pub struct InferenceModel {
    client: Client,
    model: String,
    endpoint: String,
    api_token: String,
}

impl InferenceModel {
    pub fn new(client: Client, inference_url: &str, model: &str, api_token: &str) -> Self {
        InferenceModel {
            client,
            model: model.to_string(),
            endpoint: format!("{}/models/{}", inference_url.trim_end_matches('/'), model),
            api_token: api_token.to_string(),
        }
    }
}

#[async_trait]
impl SummaryModel for InferenceModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String> {
        let body = SummarizationRequest {
            inputs: text,
            parameters: Parameters {
                max_length: params.max_length,
                min_length: params.min_length,
                do_sample: params.do_sample,
                truncation: params.truncation.then_some("only_first"),
            },
            options: Options { wait_for_model: true },
        };

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::InferenceFailed(format!("request failed: {e}")))?;

        let status = res.status();
        let raw = res
            .text()
            .await
            .map_err(|e| AppError::InferenceFailed(format!("failed to read response: {e}")))?;
        let json: serde_json::Value = serde_json::from_str(&raw).map_err(|_| {
            AppError::InferenceFailed(format!("HTTP {status}: non-JSON response"))
        })?;

        if let Some(message) = json["error"].as_str() {
            return Err(AppError::InferenceFailed(format!("HTTP {status}: {message}")));
        }
        if !status.is_success() {
            return Err(AppError::InferenceFailed(format!("HTTP {status}")));
        }

        let summary = json[0]["summary_text"]
            .as_str()
            .ok_or_else(|| AppError::InferenceFailed("Invalid response format from model".to_string()))?
            .trim()
            .to_string();

        Ok(summary)
    }
}

/// Brings up an [`InferenceModel`] after checking that the configured model
/// exists on the Hub and is a summarization model.
pub struct InferenceLoader {
    model: String,
    inference_url: String,
    hub_url: String,
    api_token: Option<String>,
}

impl InferenceLoader {
    pub fn new(config: &Config) -> Self {
        InferenceLoader {
            model: config.hf_model.clone(),
            inference_url: config.hf_inference_url.clone(),
            hub_url: config.hf_hub_url.clone(),
            api_token: config.hf_api_token.clone(),
        }
    }
}

#[async_trait]
impl ModelLoader for InferenceLoader {
    async fn load(&self) -> Result<Arc<dyn SummaryModel>> {
        let api_token = self
            .api_token
            .as_deref()
            .ok_or_else(|| AppError::ModelUnavailable("HF_API_TOKEN is not set".to_string()))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ModelUnavailable(format!("Failed to build HTTP client: {e}")))?;

        let card_url = format!("{}/api/models/{}", self.hub_url.trim_end_matches('/'), self.model);
        let res = client
            .get(&card_url)
            .bearer_auth(api_token)
            .send()
            .await
            .map_err(|e| AppError::ModelUnavailable(format!("Model hub unreachable: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(AppError::ModelUnavailable(format!(
                "Model '{}' lookup returned HTTP {status}",
                self.model
            )));
        }

        let card: serde_json::Value = res
            .json()
            .await
            .map_err(|e| AppError::ModelUnavailable(format!("Invalid model card: {e}")))?;
        match card["pipeline_tag"].as_str() {
            Some(SUMMARIZATION_TASK) => {}
            other => {
                return Err(AppError::ModelUnavailable(format!(
                    "Model '{}' is not a summarization model (pipeline_tag: {})",
                    self.model,
                    other.unwrap_or("none")
                )));
            }
        }

        Ok(Arc::new(InferenceModel::new(
            client,
            &self.inference_url,
            &self.model,
            api_token,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn loader_for(server: &MockServer, token: Option<&str>) -> InferenceLoader {
        let config = Config {
            hf_api_token: token.map(str::to_string),
            hf_inference_url: server.uri(),
            hf_hub_url: server.uri(),
            ..Config::default()
        };
        InferenceLoader::new(&config)
    }

    async fn mount_model_card(server: &MockServer, pipeline_tag: &str) {
        Mock::given(method("GET"))
            .and(path("/api/models/facebook/bart-large-cnn"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "facebook/bart-large-cnn",
                "pipeline_tag": pipeline_tag,
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn load_requires_token() {
        let server = MockServer::start().await;
        let err = loader_for(&server, None).load().await.err().unwrap();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn load_rejects_non_summarization_model() {
        let server = MockServer::start().await;
        mount_model_card(&server, "text-generation").await;

        let err = loader_for(&server, Some("hf_test")).load().await.err().unwrap();
        assert!(matches!(err, AppError::ModelUnavailable(msg) if msg.contains("text-generation")));
    }

    #[tokio::test]
    async fn generate_sends_decoding_bounds() {
        let server = MockServer::start().await;
        mount_model_card(&server, "summarization").await;
        Mock::given(method("POST"))
            .and(path("/models/facebook/bart-large-cnn"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {
                    "max_length": 150,
                    "min_length": 50,
                    "do_sample": false,
                    "truncation": "only_first",
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "summary_text": "  A concise summary.  " }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let model = loader_for(&server, Some("hf_test")).load().await.unwrap();
        let summary = model
            .generate("Some long article text.", &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(summary, "A concise summary.");
    }

    #[tokio::test]
    async fn generate_surfaces_api_errors() {
        let server = MockServer::start().await;
        mount_model_card(&server, "summarization").await;
        Mock::given(method("POST"))
            .and(path("/models/facebook/bart-large-cnn"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "Model is currently loading",
                "estimated_time": 20.0,
            })))
            .mount(&server)
            .await;

        let model = loader_for(&server, Some("hf_test")).load().await.unwrap();
        let err = model
            .generate("text", &GenerationParams::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::InferenceFailed(msg) if msg.contains("currently loading")));
    }
}
