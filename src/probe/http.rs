//! reqwest-backed IP probe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};

use crate::probe::{parse_ip_body, IpLookup, IpResult, ProbeError, ProbeRoute};

const USER_AGENT: &str = concat!("identity-rotator/", env!("CARGO_PKG_VERSION"));

/// Queries a plain-text "echo my IP" endpoint.
#[derive(Debug, Clone)]
pub struct HttpIpProbe {
    url: String,
    direct: Client,
}

impl HttpIpProbe {
    /// Create a probe against `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, ProbeError> {
        let direct = Client::builder()
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            direct,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn client_for(&self, route: &ProbeRoute) -> Result<Client, ProbeError> {
        match route {
            ProbeRoute::Direct => Ok(self.direct.clone()),
            ProbeRoute::Proxy(url) => {
                let proxy = Proxy::all(url.as_str()).map_err(|e| ProbeError::InvalidProxy {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                Client::builder()
                    .user_agent(USER_AGENT)
                    .proxy(proxy)
                    .build()
                    .map_err(|e| ProbeError::InvalidProxy {
                        url: url.clone(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

#[async_trait]
impl IpLookup for HttpIpProbe {
    async fn probe(&self, route: &ProbeRoute, timeout: Duration) -> IpResult {
        let client = self.client_for(route)?;

        let response = client
            .get(&self.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(route = %route, status = %status, "Echo service returned non-success status");
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| classify(e, timeout))?;
        parse_ip_body(&body)
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout(timeout)
    } else if err.is_connect() {
        ProbeError::Connect(error_chain(&err))
    } else {
        ProbeError::Transport(error_chain(&err))
    }
}

/// reqwest's top-level message hides the OS cause; append the source chain.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
