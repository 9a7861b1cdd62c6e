use crate::ai_provider::{extract_insights, extract_recommendations, AIError, SummaryContext, SummaryProvider};
use crate::report::AiSummary;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SYSTEM_PROMPT: &str = "You are a cybersecurity and system administration expert. \
Analyze the provided log data and provide a concise, professional summary with actionable insights and recommendations.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Result<Self, AIError> {
        Self::with_timeout(api_key, Duration::from_secs(30))
    }

    pub fn with_timeout(api_key: String, timeout: Duration) -> Result<Self, AIError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            model: "gpt-3.5-turbo".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 500,
            temperature: 0.3,
        })
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    fn build_request(&self, context: &SummaryContext) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Please analyze this log data and provide a summary:\n\n{}",
                        context.to_prompt()
                    ),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait::async_trait]
impl SummaryProvider for OpenAIProvider {
    async fn summarize(&self, context: &SummaryContext) -> Result<Option<AiSummary>, AIError> {
        let request = self.build_request(context);
        debug!("Requesting summary from {} with model {}", self.base_url, self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status() == 401 {
            return Err(AIError::AuthenticationError);
        }

        if response.status() == 429 {
            return Err(AIError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AIError::InvalidResponse(format!("HTTP {}: {}", status, error_text)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AIError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let summary = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AIError::InvalidResponse("No content in response".to_string()))?;

        Ok(Some(AiSummary {
            insights: extract_insights(&summary),
            recommendations: extract_recommendations(&summary),
            summary,
        }))
    }

    fn get_provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::statistics::Statistics;

    fn empty_context() -> SummaryContext {
        SummaryContext {
            total_entries: 0,
            statistics: Statistics::default(),
            level_counts: Default::default(),
            anomaly_count: 0,
            anomaly_counts: Default::default(),
            severity_counts: Default::default(),
            top_anomalies: vec![],
            sample_messages: vec![],
        }
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test_key".to_string()).unwrap();
        assert_eq!(provider.api_key, "test_key");
        assert_eq!(provider.model, "gpt-3.5-turbo");
        assert_eq!(provider.get_provider_name(), "openai");
    }

    #[test]
    fn test_builder_options() {
        let provider = OpenAIProvider::new("k".to_string())
            .unwrap()
            .with_model("gpt-4o-mini".to_string())
            .with_base_url("http://localhost:9999/v1/".to_string())
            .with_sampling(200, 0.0);
        assert_eq!(provider.model, "gpt-4o-mini");
        assert_eq!(provider.base_url, "http://localhost:9999/v1");
        assert_eq!(provider.max_tokens, 200);
    }

    #[test]
    fn test_request_body() {
        let provider = OpenAIProvider::new("k".to_string()).unwrap();
        let body = serde_json::to_value(provider.build_request(&empty_context())).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("Total log entries: 0"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let provider = OpenAIProvider::with_timeout("k".to_string(), Duration::from_millis(500))
            .unwrap()
            .with_base_url("http://127.0.0.1:9".to_string());
        let result = provider.summarize(&empty_context()).await;
        assert!(matches!(result, Err(AIError::RequestError(_))));
    }
}
