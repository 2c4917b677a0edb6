use std::path::Path;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::{FernError, Result};
use crate::models::{RawAccount, RawTransaction};
use crate::retry::{run_with_retry, Clock, RetryPolicy, SystemClock};

const API_BASE: &str = "https://api.teller.io";

/// Tagged failure modes of the bank API, so callers branch on a
/// discriminant instead of inspecting message text.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("bank API rate limit exhausted")]
    RateLimited,

    #[error("bank API rejected credentials ({0})")]
    Auth(String),

    #[error("bank API transport failure: {0}")]
    Transport(String),

    #[error("bank API returned an invalid payload: {0}")]
    Invalid(String),
}

impl From<FetchError> for FernError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Auth(msg) => FernError::Auth(msg),
            other => FernError::Fetch(other.to_string()),
        }
    }
}

/// Fetch seam consumed by the orchestrator.
pub trait BankFetch {
    fn fetch_accounts(&self, token: &str) -> std::result::Result<Vec<RawAccount>, FetchError>;

    fn fetch_transactions(
        &self,
        token: &str,
        account_ref: &str,
        from_date: NaiveDate,
    ) -> std::result::Result<Vec<RawTransaction>, FetchError>;
}

/// Blocking HTTP client for the bank API. Authenticates with the access
/// token over basic auth and a client certificate, and retries rate-limited
/// requests with exponential backoff before giving up.
pub struct BankClient {
    http: Client,
    base_url: String,
    policy: RetryPolicy,
    clock: Box<dyn Clock>,
}

fn default_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        base_delay: std::time::Duration::from_secs(2),
        max_delay: std::time::Duration::from_secs(60),
    }
}

impl BankClient {
    /// Client with the mTLS identity the bank API requires, assembled from
    /// the configured certificate and key PEM files.
    pub fn new(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let mut pem = std::fs::read(cert_path).map_err(|e| {
            FernError::Config(format!("cannot read certificate {}: {e}", cert_path.display()))
        })?;
        pem.extend(std::fs::read(key_path).map_err(|e| {
            FernError::Config(format!("cannot read private key {}: {e}", key_path.display()))
        })?);
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| FernError::Config(format!("invalid client certificate: {e}")))?;

        let http = Client::builder().identity(identity).build()?;
        Ok(Self {
            http,
            base_url: API_BASE.to_string(),
            policy: default_policy(),
            clock: Box::new(SystemClock),
        })
    }

    /// Client without a certificate identity, pointed at an arbitrary base
    /// URL. Used against mock servers.
    #[cfg(test)]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            policy: default_policy(),
            clock: Box::new(SystemClock),
        }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        run_with_retry(
            &self.policy,
            self.clock.as_ref(),
            |err| matches!(err, FetchError::RateLimited),
            || {
                let response = self
                    .http
                    .get(&url)
                    .basic_auth(token, Some(""))
                    .query(query)
                    .send()
                    .map_err(|e| FetchError::Transport(e.to_string()))?;

                let status = response.status();
                if status == StatusCode::TOO_MANY_REQUESTS {
                    log::warn!("bank API rate limited on {path}, backing off");
                    return Err(FetchError::RateLimited);
                }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(FetchError::Auth(format!("HTTP {}", status.as_u16())));
                }
                if !status.is_success() {
                    let body = response.text().unwrap_or_default();
                    return Err(FetchError::Transport(format!(
                        "HTTP {}: {body}",
                        status.as_u16()
                    )));
                }
                response.json::<T>().map_err(|e| FetchError::Invalid(e.to_string()))
            },
        )
    }
}

impl BankFetch for BankClient {
    fn fetch_accounts(&self, token: &str) -> std::result::Result<Vec<RawAccount>, FetchError> {
        self.get(token, "/accounts", &[])
    }

    fn fetch_transactions(
        &self,
        token: &str,
        account_ref: &str,
        from_date: NaiveDate,
    ) -> std::result::Result<Vec<RawTransaction>, FetchError> {
        self.get(
            token,
            &format!("/accounts/{account_ref}/transactions"),
            &[("from_date", from_date.to_string())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_fetch_accounts_parses_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/accounts");
            then.status(200).json_body(serde_json::json!([
                {
                    "id": "acc_remote_1",
                    "name": "Everyday Checking",
                    "type": "checking",
                    "institution": { "id": "chase", "name": "Chase" },
                    "last_four": "1234"
                }
            ]));
        });

        let client = BankClient::with_base_url(server.base_url());
        let accounts = client.fetch_accounts("token_a").unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, "acc_remote_1");
        assert_eq!(accounts[0].institution.id, "chase");
        assert_eq!(accounts[0].last_four, "1234");
    }

    #[test]
    fn test_fetch_transactions_sends_from_date() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/accounts/acc_remote_1/transactions")
                .query_param("from_date", "2024-01-01");
            then.status(200).json_body(serde_json::json!([
                {
                    "id": "txn_1",
                    "account_id": "acc_remote_1",
                    "amount": -25.5,
                    "date": "2024-01-15",
                    "description": "Coffee Shop",
                    "status": "posted",
                    "type": "card_payment",
                    "running_balance": 1000.0
                }
            ]));
        });

        let client = BankClient::with_base_url(server.base_url());
        let txns = client
            .fetch_transactions("token_a", "acc_remote_1", "2024-01-01".parse().unwrap())
            .unwrap();
        mock.assert();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].id, "txn_1");
        assert_eq!(txns[0].date.to_string(), "2024-01-15");
    }

    #[test]
    fn test_unauthorized_maps_to_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/accounts");
            then.status(401).body("{}");
        });

        let client = BankClient::with_base_url(server.base_url());
        let err = client.fetch_accounts("token_bad").unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
    }

    #[test]
    fn test_rate_limit_is_retried_until_exhausted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/accounts");
            then.status(429).body("slow down");
        });

        let client = BankClient::with_base_url(server.base_url()).with_policy(fast_policy());
        let err = client.fetch_accounts("token_a").unwrap_err();
        assert!(matches!(err, FetchError::RateLimited));
        assert_eq!(mock.hits(), 3, "all attempts should hit the server");
    }

    #[test]
    fn test_malformed_payload_is_invalid() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/accounts");
            then.status(200).body("not json");
        });

        let client = BankClient::with_base_url(server.base_url());
        let err = client.fetch_accounts("token_a").unwrap_err();
        assert!(matches!(err, FetchError::Invalid(_)));
    }
}
