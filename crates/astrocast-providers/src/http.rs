//! Shared HTTP plumbing for the vendor clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

const USER_AGENT: &str = "astrocast/0.1 (prediction-pipeline)";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const ERROR_BODY_LIMIT: usize = 500;

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

/// `https://host/` + `/v1/x` → `https://host/v1/x`.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Map non-2xx responses to typed errors: 429 → rate limited, 5xx →
/// upstream, any other status → rejected.
pub(crate) async fn check_status(
    provider: &str,
    response: Response,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(ERROR_BODY_LIMIT)
        .collect();

    tracing::debug!(provider, status = status.as_u16(), body = %body, "provider returned error status");

    Err(if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited {
            provider: provider.to_owned(),
        }
    } else if status.is_server_error() {
        ProviderError::Upstream {
            provider: provider.to_owned(),
            status: status.as_u16(),
            body,
        }
    } else {
        ProviderError::Rejected {
            provider: provider.to_owned(),
            status: status.as_u16(),
            body,
        }
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, ProviderError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
