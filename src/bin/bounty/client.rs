//! Bounty Ledger API Client
//!
//! Thin wrapper over the ledger server's HTTP routes.
//! Mutating requests carry the caller in the x-caller-address header.

use anyhow::{anyhow, Result};
use bounty_ledger::auth::CALLER_HEADER;
use bounty_ledger::server::{AdminStatus, FundRequest, PayoutRequest};
use bounty_ledger::{Address, Bounty, PayoutReceipt};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body returned by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

pub struct LedgerClient {
    client: Client,
    base_url: String,
    caller: Option<Address>,
}

impl LedgerClient {
    pub fn new(server_url: &str, caller: Option<Address>) -> Self {
        // Build HTTP client with timeout, falling back to default client if builder fails
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            caller,
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    fn bounty_url(&self, id: &str, suffix: &str) -> String {
        self.url(&format!("bounties/{}{}", urlencoding::encode(id), suffix))
    }

    fn signed(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let caller = self
            .caller
            .as_ref()
            .ok_or_else(|| anyhow!("this command needs --caller (or LEDGER_CALLER)"))?;
        Ok(request.header(CALLER_HEADER, caller.as_str()))
    }

    pub async fn get_bounty(&self, id: &str) -> Result<Bounty> {
        let resp = self.client.get(self.bounty_url(id, "")).send().await?;
        decode(resp).await
    }

    pub async fn fund(&self, id: &str, deadline: &str, value: u128) -> Result<Bounty> {
        let body = FundRequest {
            deadline: deadline.to_string(),
            value,
        };
        let request = self.signed(self.client.post(self.bounty_url(id, "/fund")))?;
        decode(request.json(&body).send().await?).await
    }

    pub async fn start_work(&self, id: &str) -> Result<Bounty> {
        let request = self.signed(self.client.post(self.bounty_url(id, "/work")))?;
        decode(request.send().await?).await
    }

    pub async fn payout(&self, id: &str, worker: Address, percentage: u32) -> Result<PayoutReceipt> {
        let body = PayoutRequest { worker, percentage };
        let request = self.signed(self.client.post(self.bounty_url(id, "/payout")))?;
        decode(request.json(&body).send().await?).await
    }

    pub async fn list_payouts(&self, id: &str) -> Result<Vec<PayoutReceipt>> {
        let resp = self.client.get(self.bounty_url(id, "/payouts")).send().await?;
        decode(resp).await
    }

    pub async fn list_admins(&self) -> Result<Vec<Address>> {
        let resp = self.client.get(self.url("admins")).send().await?;
        decode(resp).await
    }

    pub async fn check_admin(&self, address: &Address) -> Result<AdminStatus> {
        let resp = self
            .client
            .get(self.url(&format!("admins/{}", address)))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn add_admin(&self, address: &Address) -> Result<AdminStatus> {
        let request = self.signed(self.client.put(self.url(&format!("admins/{}", address))))?;
        decode(request.send().await?).await
    }

    pub async fn remove_admin(&self, address: &Address) -> Result<AdminStatus> {
        let request = self.signed(self.client.delete(self.url(&format!("admins/{}", address))))?;
        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let error_text = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
    match serde_json::from_str::<ErrorBody>(&error_text) {
        Ok(body) => Err(anyhow!("{} ({}): {}", body.error, status, body.message)),
        Err(_) => Err(anyhow!("Request failed ({}): {}", status, error_text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = LedgerClient::new("http://localhost:8080/", None);
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_bounty_url_encodes_id() {
        let client = LedgerClient::new("http://localhost:8080", None);
        assert_eq!(
            client.bounty_url("org/repo#12", "/fund"),
            "http://localhost:8080/bounties/org%2Frepo%2312/fund"
        );
    }

    #[test]
    fn test_signed_requires_caller() {
        let client = LedgerClient::new("http://localhost:8080", None);
        assert!(client.signed(client.client.post(client.url("x"))).is_err());

        let caller = Address::parse("0x0000000000000000000000000000000000000001").unwrap();
        let client = LedgerClient::new("http://localhost:8080", Some(caller));
        assert!(client.signed(client.client.post(client.url("x"))).is_ok());
    }
}
