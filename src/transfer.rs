//! Outgoing value transfers
//!
//! The ledger never moves value itself; it asks a [`TransferGateway`] to do it
//! and treats any error as a rejected payout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::Address;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("recipient rejected transfer: {0}")]
    Rejected(String),

    #[error("transfer endpoint unreachable: {0}")]
    Unreachable(String),
}

/// Request sent to the settlement endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: Address,
    #[serde(with = "crate::bounty::amount_string")]
    pub amount: u128,
    /// Payout receipt id, usable by the settlement side for idempotency
    pub reference: String,
}

#[async_trait]
pub trait TransferGateway: Send + Sync {
    async fn transfer(&self, request: &TransferRequest) -> Result<(), TransferError>;
}

/// Logs transfers without moving anything
pub struct DryRunTransferGateway;

#[async_trait]
impl TransferGateway for DryRunTransferGateway {
    async fn transfer(&self, request: &TransferRequest) -> Result<(), TransferError> {
        info!(
            "[dry-run] transfer {} to {} (ref {})",
            request.amount, request.to, request.reference
        );
        Ok(())
    }
}

/// Settles transfers by POSTing them to an external payment service
pub struct HttpTransferGateway {
    client: Client,
    endpoint: String,
}

impl HttpTransferGateway {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Self {
        // Fall back to a default client if the builder fails
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TransferGateway for HttpTransferGateway {
    async fn transfer(&self, request: &TransferRequest) -> Result<(), TransferError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransferError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
        warn!(
            "Transfer of {} to {} rejected ({}): {}",
            request.amount, request.to, status, error_text
        );
        Err(TransferError::Rejected(format!("{}: {}", status, error_text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_strips_trailing_slash() {
        let gateway = HttpTransferGateway::new("https://pay.example.com/transfers/", None);
        assert_eq!(gateway.endpoint(), "https://pay.example.com/transfers");
    }

    #[test]
    fn test_request_wire_format() {
        let request = TransferRequest {
            to: Address::parse("0x00000000000000000000000000000000000000b2").unwrap(),
            amount: 10_000,
            reference: "r-1".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["to"], "0x00000000000000000000000000000000000000b2");
        assert_eq!(json["amount"], "10000");
        assert_eq!(json["reference"], "r-1");
    }

    #[tokio::test]
    async fn test_dry_run_always_succeeds() {
        let request = TransferRequest {
            to: Address::zero(),
            amount: 0,
            reference: "r".to_string(),
        };
        assert!(DryRunTransferGateway.transfer(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let gateway =
            HttpTransferGateway::new("http://127.0.0.1:9/transfer", Some(Duration::from_secs(2)));
        let request = TransferRequest {
            to: Address::parse("0x00000000000000000000000000000000000000b2").unwrap(),
            amount: 1,
            reference: "r".to_string(),
        };
        assert!(matches!(
            gateway.transfer(&request).await,
            Err(TransferError::Unreachable(_))
        ));
    }
}
