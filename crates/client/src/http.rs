//! HTTP implementations of the drain seams, targeting the salescore API.

use async_trait::async_trait;
use serde::Deserialize;

use salescore_core::pipeline::EvaluationRequest;
use salescore_core::types::DbId;

use crate::drain::{RefreshError, SubmitError, SubmitOk, Submitter, TokenExchanger, TokenPair};

/// Error body shape produced by the API (`{ "error": ..., "code": ... }`).
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
    code: String,
}

/// Success body of `POST /api/v1/evaluations`.
#[derive(Debug, Deserialize)]
struct CreateEvaluationBody {
    evaluation_id: DbId,
    duplicate: bool,
}

/// Success body of `POST /api/v1/auth/refresh`.
#[derive(Debug, Deserialize)]
struct RefreshBody {
    access_token: String,
    refresh_token: String,
}

/// Submits evaluations over HTTP.
pub struct HttpSubmitter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubmitter {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

async fn read_api_error(response: reqwest::Response) -> (String, String) {
    let status = response.status();
    match response.json::<ApiError>().await {
        Ok(body) => (body.code, body.error),
        Err(_) => (status.to_string(), "unparseable error body".to_string()),
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        access_token: &str,
        request: &EvaluationRequest,
    ) -> Result<SubmitOk, SubmitError> {
        let url = format!("{}/api/v1/evaluations", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: CreateEvaluationBody = response
                .json()
                .await
                .map_err(|e| SubmitError::Unavailable(e.to_string()))?;
            return Ok(SubmitOk {
                evaluation_id: body.evaluation_id,
                duplicate: body.duplicate,
            });
        }

        let (code, message) = read_api_error(response).await;
        Err(match status.as_u16() {
            401 => SubmitError::Unauthorized(message),
            409 => SubmitError::Duplicate {
                evaluation_id: None,
            },
            400 | 403 | 404 | 422 => SubmitError::Rejected { code, message },
            _ => SubmitError::Unavailable(message),
        })
    }
}

/// Refreshes credentials over HTTP.
pub struct HttpTokenExchanger {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTokenExchanger {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let url = format!("{}/api/v1/auth/refresh", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| RefreshError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: RefreshBody = response
                .json()
                .await
                .map_err(|e| RefreshError::Unavailable(e.to_string()))?;
            return Ok(TokenPair {
                access_token: body.access_token,
                refresh_token: body.refresh_token,
            });
        }

        let (_, message) = read_api_error(response).await;
        Err(match status.as_u16() {
            401 | 403 => RefreshError::Unauthorized(message),
            _ => RefreshError::Unavailable(message),
        })
    }
}
