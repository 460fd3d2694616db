//! Receipts API client
//!
//! Sends committed purchase receipts to the back-office API, which assigns
//! the invoice number and stores the document.

use async_trait::async_trait;
use reqwest::Client;
use shared::{CommitRequest, PurchaseReceiptRecord};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::services::{ReceiptStore, StoreError};

/// Receipts API client
#[derive(Clone)]
pub struct ReceiptApiClient {
    client: Client,
    base_url: String,
}

impl ReceiptApiClient {
    /// Create a new ReceiptApiClient with a request timeout
    pub fn new(base_url: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn receipts_url(&self) -> String {
        format!("{}/purchase-receipts", self.base_url)
    }
}

#[async_trait]
impl ReceiptStore for ReceiptApiClient {
    async fn create_receipt(
        &self,
        request: &CommitRequest,
    ) -> Result<PurchaseReceiptRecord, StoreError> {
        let response = self
            .client
            .post(self.receipts_url())
            .json(request)
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("Receipts API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Response(format!(
                "Receipts API error: {} - {}",
                status, body
            )));
        }

        response
            .json::<PurchaseReceiptRecord>()
            .await
            .map_err(|e| {
                StoreError::Response(format!("Failed to parse receipts API response: {}", e))
            })
    }
}
