use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::answer::AnswerKey;
use crate::models::exam_module::ExamModule;

/// Read-only source of canonical answers, addressed by module and set number.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestBank: Send + Sync {
    /// Fails with [`Error::GradingSourceUnavailable`] when the key cannot be produced.
    async fn answer_key(&self, module: ExamModule, set_number: u32) -> Result<AnswerKey>;
}

#[derive(Debug, Deserialize)]
struct AnswerKeyResponse {
    answers: AnswerKey,
}

/// Test Bank reached over HTTP at `GET {base}/answer-keys/{module}/{set}`.
#[derive(Clone)]
pub struct HttpTestBank {
    base_url: String,
    http_client: Client,
}

impl HttpTestBank {
    pub fn new(base_url: impl Into<String>, http_client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl TestBank for HttpTestBank {
    async fn answer_key(&self, module: ExamModule, set_number: u32) -> Result<AnswerKey> {
        let url = format!("{}/answer-keys/{}/{}", self.base_url, module, set_number);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::GradingSourceUnavailable(format!("Test bank request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::GradingSourceUnavailable(format!(
                "Test bank returned {} for {} set {}",
                response.status(),
                module,
                set_number
            )));
        }

        let body: AnswerKeyResponse = response
            .json()
            .await
            .map_err(|e| Error::GradingSourceUnavailable(format!("Malformed answer key: {}", e)))?;
        Ok(body.answers)
    }
}

/// Fixed answer keys held in memory.
#[derive(Clone, Debug, Default)]
pub struct StaticTestBank {
    keys: HashMap<(ExamModule, u32), AnswerKey>,
}

impl StaticTestBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, module: ExamModule, set_number: u32, key: AnswerKey) -> Self {
        self.keys.insert((module, set_number), key);
        self
    }
}

#[async_trait]
impl TestBank for StaticTestBank {
    async fn answer_key(&self, module: ExamModule, set_number: u32) -> Result<AnswerKey> {
        self.keys.get(&(module, set_number)).cloned().ok_or_else(|| {
            Error::GradingSourceUnavailable(format!("No answer key for {} set {}", module, set_number))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::CanonicalAnswer;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_answer_key_for_module_and_set() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "answers": { "1": "river", "2": ["7", "seven"] }
        });
        Mock::given(method("GET"))
            .and(path("/answer-keys/listening/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let bank = HttpTestBank::new(format!("{}/", server.uri()), Client::new());
        let key = bank.answer_key(ExamModule::Listening, 3).await.unwrap();

        assert_eq!(key.len(), 2);
        assert_eq!(key[&1], CanonicalAnswer::Single("river".into()));
        assert_eq!(
            key[&2],
            CanonicalAnswer::Alternates(vec!["7".into(), "seven".into()])
        );
    }

    #[tokio::test]
    async fn missing_set_is_a_grading_source_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let bank = HttpTestBank::new(server.uri(), Client::new());
        let err = bank.answer_key(ExamModule::Reading, 9).await.unwrap_err();
        assert!(matches!(err, Error::GradingSourceUnavailable(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_grading_source_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let bank = HttpTestBank::new(server.uri(), Client::new());
        let err = bank.answer_key(ExamModule::Reading, 1).await.unwrap_err();
        assert!(matches!(err, Error::GradingSourceUnavailable(_)));
    }

    #[tokio::test]
    async fn static_bank_reports_unknown_sets() {
        let bank = StaticTestBank::new().with_key(ExamModule::Reading, 1, AnswerKey::new());
        assert!(bank.answer_key(ExamModule::Reading, 1).await.unwrap().is_empty());
        assert!(matches!(
            bank.answer_key(ExamModule::Reading, 2).await,
            Err(Error::GradingSourceUnavailable(_))
        ));
    }
}
