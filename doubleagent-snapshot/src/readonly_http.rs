use std::net::IpAddr;
use std::time::Duration;

use doubleagent_core::config::ComplianceMode;
use ipnet::Ipv6Net;
use thiserror::Error;
use url::Url;

/// Raised when the read-only client is asked to do something that could
/// reach a production endpoint: a write method, a non-allowlisted host, or
/// any outbound call at all while compliance mode is strict.
///
/// Never crosses the public HTTP surface (per `spec.md` §7) — only the
/// snapshot-pull CLI observes this.
#[derive(Debug, Error)]
pub enum ReadOnlyViolation {
    #[error("method {0} is not allowed; only GET and HEAD are permitted")]
    MethodNotAllowed(String),
    #[error("host '{0}' is not in the configured allowed_hosts set")]
    HostNotAllowed(String),
    #[error("requests to private/loopback addresses are blocked: {0}")]
    PrivateAddressBlocked(String),
    #[error("all remote connector HTTP is blocked in strict compliance mode")]
    ComplianceModeBlocked,
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A `reqwest`-backed client that only ever issues GET/HEAD, refuses
/// private/loopback targets unless explicitly allowed, and is blocked
/// outright when the process runs in strict compliance mode.
pub struct ReadOnlyHttpClient {
    client: reqwest::Client,
    allowed_hosts: Option<Vec<String>>,
    allow_private: bool,
    compliance_mode: ComplianceMode,
}

impl ReadOnlyHttpClient {
    pub fn new(
        allowed_hosts: Option<Vec<String>>,
        allow_private: bool,
        compliance_mode: ComplianceMode,
        timeout: Duration,
        max_total_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(max_total_timeout.min(timeout))
            .build()
            .expect("reqwest client builds with static config");
        Self {
            client,
            allowed_hosts,
            allow_private,
            compliance_mode,
        }
    }

    fn check_url(&self, url: &str) -> Result<Url, ReadOnlyViolation> {
        if self.compliance_mode.is_strict() {
            return Err(ReadOnlyViolation::ComplianceModeBlocked);
        }

        let parsed = Url::parse(url).map_err(|e| ReadOnlyViolation::InvalidUrl(e.to_string()))?;
        let hostname = parsed.host_str().unwrap_or_default().to_string();

        if let Some(allowed) = &self.allowed_hosts {
            if !allowed.iter().any(|h| h == &hostname) {
                return Err(ReadOnlyViolation::HostNotAllowed(hostname));
            }
        }

        if !self.allow_private {
            if let Ok(addr) = hostname.parse::<IpAddr>() {
                if is_loopback_or_private(addr) {
                    return Err(ReadOnlyViolation::PrivateAddressBlocked(hostname));
                }
            }
        }

        Ok(parsed)
    }

    pub async fn get(&self, url: &str) -> Result<reqwest::Response, ReadOnlyViolation> {
        let url = self.check_url(url)?;
        Ok(self.client.get(url).send().await?)
    }

    pub async fn head(&self, url: &str) -> Result<reqwest::Response, ReadOnlyViolation> {
        let url = self.check_url(url)?;
        Ok(self.client.head(url).send().await?)
    }

    /// Any other HTTP method is always rejected — the whole point of this
    /// client existing instead of a bare `reqwest::Client`.
    pub fn reject_method(method: &str) -> ReadOnlyViolation {
        ReadOnlyViolation::MethodNotAllowed(method.to_string())
    }
}

fn is_loopback_or_private(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                return true;
            }
            let ula: Ipv6Net = "fc00::/7".parse().expect("valid CIDR literal");
            ula.contains(&v6)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(allow_private: bool, compliance: ComplianceMode) -> ReadOnlyHttpClient {
        ReadOnlyHttpClient::new(None, allow_private, compliance, Duration::from_secs(5), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn blocks_private_address_by_default() {
        let client = client(false, ComplianceMode::Open);
        let err = client.get("http://127.0.0.1:1/x").await.unwrap_err();
        assert!(matches!(err, ReadOnlyViolation::PrivateAddressBlocked(_)));
    }

    #[tokio::test]
    async fn strict_compliance_mode_blocks_everything() {
        let client = client(true, ComplianceMode::Strict);
        let err = client.get("https://api.github.com/repos").await.unwrap_err();
        assert!(matches!(err, ReadOnlyViolation::ComplianceModeBlocked));
    }

    #[test]
    fn reject_method_names_the_method() {
        let err = ReadOnlyHttpClient::reject_method("POST");
        assert!(err.to_string().contains("POST"));
    }

    #[tokio::test]
    async fn host_allowlist_rejects_unlisted_hosts() {
        let client = ReadOnlyHttpClient::new(
            Some(vec!["api.github.com".to_string()]),
            true,
            ComplianceMode::Open,
            Duration::from_secs(5),
            Duration::from_secs(30),
        );
        let err = client.get("https://evil.example.com/x").await.unwrap_err();
        assert!(matches!(err, ReadOnlyViolation::HostNotAllowed(_)));
    }
}
