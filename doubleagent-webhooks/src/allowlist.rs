use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::Ipv6Net;
use url::Url;

fn default_allowed_hosts() -> HashSet<String> {
    ["localhost", "127.0.0.1", "::1", "host.docker.internal"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Hardened-by-default delivery target allowlist: named hosts plus any
/// loopback or private-range IP, so a fake's webhook target normally has
/// to be the test harness itself.
pub struct Allowlist {
    hosts: HashSet<String>,
}

impl Default for Allowlist {
    fn default() -> Self {
        Self {
            hosts: default_allowed_hosts(),
        }
    }
}

impl Allowlist {
    pub fn new(extra_hosts: impl IntoIterator<Item = String>) -> Self {
        let mut hosts = default_allowed_hosts();
        hosts.extend(extra_hosts);
        Self { hosts }
    }

    pub fn is_allowed(&self, target_url: &str) -> bool {
        let Ok(parsed) = Url::parse(target_url) else {
            return false;
        };
        let Some(hostname) = parsed.host_str() else {
            return false;
        };

        if self.hosts.contains(hostname) {
            return true;
        }

        match hostname.parse::<IpAddr>() {
            Ok(addr) => is_loopback_or_private(addr),
            Err(_) => false,
        }
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

    #[test]
    fn allows_default_localhost_forms() {
        let allowlist = Allowlist::default();
        assert!(allowlist.is_allowed("http://localhost:9000/hook"));
        assert!(allowlist.is_allowed("http://127.0.0.1:9000/hook"));
    }

    #[test]
    fn allows_private_ip_ranges() {
        let allowlist = Allowlist::default();
        assert!(allowlist.is_allowed("http://10.0.0.5:8080/hook"));
        assert!(allowlist.is_allowed("http://192.168.1.20/hook"));
    }

    #[test]
    fn rejects_public_hosts() {
        let allowlist = Allowlist::default();
        assert!(!allowlist.is_allowed("https://attacker.example.com/hook"));
        assert!(!allowlist.is_allowed("http://8.8.8.8/hook"));
    }

    #[test]
    fn extra_hosts_are_additive() {
        let allowlist = Allowlist::new(vec!["webhook-sink.internal".to_string()]);
        assert!(allowlist.is_allowed("http://webhook-sink.internal/hook"));
    }
}
