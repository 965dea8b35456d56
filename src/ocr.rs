use crate::config::Config;
use crate::error::AnalysisError;
use crate::types::AnalyzeResult;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "Operation-Location";
/// A `Retry-After` never stretches the poll delay past this many poll intervals.
const MAX_POLL_DELAY_FACTOR: u32 = 10;

/// Anything that can turn an uploaded document into an analysis result.
#[async_trait]
pub trait ReceiptRecognizer: Send + Sync {
    async fn analyze_receipt(&self, document: Bytes) -> Result<AnalyzeResult, AnalysisError>;
}

/// Azure AI Document Intelligence client for a prebuilt model, using the
/// submit-then-poll REST protocol.
pub struct AzureReceiptClient {
    client: Client,
    analyze_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
    max_retries: u32,
    retry_backoff: Duration,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: OperationStatus,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Deserialize)]
struct OperationError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Body of a rejected request, for the error message.
async fn error_body(response: Response) -> String {
    response.text().await.unwrap_or_else(|e| {
        debug!("Could not read error body: {}", e);
        String::new()
    })
}

fn transport_error(e: reqwest::Error) -> AnalysisError {
    if e.is_connect() || e.is_timeout() {
        AnalysisError::Connection(e)
    } else {
        AnalysisError::Network(e)
    }
}

/// `Retry-After` in whole seconds, as sent by Azure on poll responses.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl AzureReceiptClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let analyze_url = format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            config.endpoint, config.model_id, config.api_version
        );
        Ok(Self {
            client,
            analyze_url,
            api_key: config.api_key.clone(),
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    /// Start an analysis and return the operation URL to poll.
    async fn submit(&self, document: Bytes) -> Result<String, AnalysisError> {
        let response = self
            .client
            .post(&self.analyze_url)
            .header(KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(document)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AnalysisError::Rejected {
                status,
                body: if body.is_empty() {
                    "Invalid key or endpoint?".to_string()
                } else {
                    body
                },
            });
        }

        response
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(AnalysisError::MissingOperationLocation)
    }

    /// Submit, retrying transient failures with exponential backoff.
    async fn submit_with_retry(&self, document: Bytes) -> Result<String, AnalysisError> {
        let mut attempt = 0;
        loop {
            match self.submit(document.clone()).await {
                Ok(operation_url) => return Ok(operation_url),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "Submit attempt {} failed: {}; retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Poll the operation until it reaches a terminal state or the poll budget runs out.
    async fn poll(&self, operation_url: &str) -> Result<AnalyzeResult, AnalysisError> {
        let mut delay = self.poll_interval;
        for poll in 1..=self.max_polls {
            tokio::time::sleep(delay).await;
            let response = self
                .client
                .get(operation_url)
                .header(KEY_HEADER, &self.api_key)
                .send()
                .await
                .map_err(transport_error)?;
            delay = retry_after(&response)
                .map(|d| d.min(self.poll_interval.saturating_mul(MAX_POLL_DELAY_FACTOR)))
                .unwrap_or(self.poll_interval);

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!("Poll {} got {}; polling again", poll, status);
                continue;
            }
            if !status.is_success() {
                let body = error_body(response).await;
                return Err(AnalysisError::Rejected { status, body });
            }

            let body = response.text().await?;
            let operation: AnalyzeOperation = serde_json::from_str(&body)?;
            match operation.status {
                OperationStatus::Succeeded => {
                    return operation
                        .analyze_result
                        .ok_or_else(|| AnalysisError::Failed("No analyzeResult in response".to_string()));
                }
                OperationStatus::Failed => {
                    let message = operation
                        .error
                        .and_then(|e| e.message.or(e.code))
                        .unwrap_or_else(|| "Unknown error".to_string());
                    return Err(AnalysisError::Failed(message));
                }
                OperationStatus::Canceled => {
                    return Err(AnalysisError::Failed("operation was canceled".to_string()));
                }
                pending => debug!("Poll {}: operation {:?}", poll, pending),
            }
        }
        Err(AnalysisError::TimedOut)
    }
}

#[async_trait]
impl ReceiptRecognizer for AzureReceiptClient {
    #[instrument(skip(self, document), fields(bytes = document.len()))]
    async fn analyze_receipt(&self, document: Bytes) -> Result<AnalyzeResult, AnalysisError> {
        let operation_url = self.submit_with_retry(document).await?;
        debug!("Analysis submitted, polling {}", operation_url);
        let result = self.poll(&operation_url).await?;
        info!(
            "Analysis finished with model {} ({} document(s))",
            result.model_id,
            result.documents.as_ref().map_or(0, Vec::len)
        );
        Ok(result)
    }
}
