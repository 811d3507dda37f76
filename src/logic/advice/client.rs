//! Knowledge-Base Client
//!
//! HTTP client for the retrieval-augmented remediation service
//! (`POST {base_url}/api/rag/ask`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Advice;

/// Knowledge-base service configuration
#[derive(Debug, Clone)]
pub struct AdviceConfig {
    /// `None` disables the service; the playbook answers instead.
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    advice: String,
    #[serde(default)]
    sources: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdviceError {
    NotConfigured,
    NetworkError(String),
    ServerError(u16),
    ParseError(String),
    LowQuality,
}

impl std::fmt::Display for AdviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "Knowledge base not configured"),
            Self::NetworkError(e) => write!(f, "Network error: {}", e),
            Self::ServerError(code) => write!(f, "Server error: {}", code),
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
            Self::LowQuality => write!(f, "Knowledge base returned low quality or error response"),
        }
    }
}

impl std::error::Error for AdviceError {}

pub struct AdviceClient {
    config: AdviceConfig,
    http_client: reqwest::Client,
}

impl AdviceClient {
    pub fn new(config: AdviceConfig) -> Result<Self, AdviceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AdviceError::NetworkError(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.base_url.is_some()
    }

    /// Ask the knowledge base; unusable answers are errors.
    pub async fn ask(&self, query: &str, top_k: usize) -> Result<Advice, AdviceError> {
        let base = self.config.base_url.as_ref().ok_or(AdviceError::NotConfigured)?;
        let url = format!("{}/api/rag/ask", base.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .json(&AskRequest { query, top_k })
            .send()
            .await
            .map_err(|e| AdviceError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AdviceError::ServerError(response.status().as_u16()));
        }

        let body: AskResponse = response
            .json()
            .await
            .map_err(|e| AdviceError::ParseError(e.to_string()))?;

        if !is_useful(&body.advice) {
            return Err(AdviceError::LowQuality);
        }

        Ok(Advice {
            advice: body.advice,
            sources: body.sources,
        })
    }
}

/// Rejects empty answers and the service's own failure texts.
pub fn is_useful(advice: &str) -> bool {
    !advice.trim().is_empty()
        && !advice.contains("Error")
        && !advice.to_lowercase().contains("relevant information")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(answer: Value) -> String {
        let app = Router::new().route(
            "/api/rag/ask",
            post(move |Json(body): Json<Value>| {
                let answer = answer.clone();
                async move {
                    assert_eq!(body["top_k"], 3);
                    Json(answer)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: Option<String>) -> AdviceClient {
        AdviceClient::new(AdviceConfig { base_url, timeout_seconds: 5 }).unwrap()
    }

    #[test]
    fn test_quality_filter() {
        assert!(is_useful("1. Rotate keys."));
        assert!(!is_useful("   "));
        assert!(!is_useful("Error generating advice"));
        assert!(!is_useful("I could not find Relevant Information in the context."));
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let err = client(None).ask("anything", 3).await.unwrap_err();
        assert_eq!(err, AdviceError::NotConfigured);
    }

    #[tokio::test]
    async fn test_successful_answer() {
        let url = serve(json!({"query": "q", "advice": "1. Rotate keys.", "sources": [{"source": "CIS"}]})).await;

        let advice = client(Some(url)).ask("q", 3).await.unwrap();

        assert_eq!(advice.advice, "1. Rotate keys.");
        assert_eq!(advice.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_low_quality_answer_rejected() {
        let url = serve(json!({"query": "q", "advice": "No relevant information found.", "sources": []})).await;

        let err = client(Some(url)).ask("q", 3).await.unwrap_err();
        assert_eq!(err, AdviceError::LowQuality);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let err = client(Some("http://127.0.0.1:1".to_string())).ask("q", 3).await.unwrap_err();
        assert!(matches!(err, AdviceError::NetworkError(_)));
    }
}
