use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use resolv_conf::ScopedIp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::paginate::PageLimits;

pub const DEFAULT_BASE_NAME: &str = "dnstree.example.com";
pub const DEFAULT_FEATURES: [&str; 3] = ["FOLDER", "HREF", "TXT"];
pub const DNS_PORT: u16 = 53;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Zone the server answers for, without a trailing dot.
    pub base_name: String,
    pub features: Vec<String>,
    pub limits: PageLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_BASE_NAME.to_string(),
            features: DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
            limits: PageLimits::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_base_name(base_name: &str) -> Self {
        Self {
            base_name: base_name.trim_end_matches('.').to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Tried in order until one answers.
    pub resolvers: Vec<SocketAddr>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(resolvers: Vec<SocketAddr>) -> Self {
        Self {
            resolvers,
            timeout: Duration::from_secs(2),
        }
    }

    /// Resolvers from the `nameserver` lines of a resolv.conf file.
    pub fn from_resolv_conf(path: impl AsRef<Path>) -> Result<Self> {
        let conf = resolv_conf::Config::parse(std::fs::read(path)?)?;
        Ok(Self::new(nameservers(&conf)))
    }
}

fn nameservers(conf: &resolv_conf::Config) -> Vec<SocketAddr> {
    conf.nameservers
        .iter()
        .map(|ns| match ns {
            ScopedIp::V4(ip) => IpAddr::V4(*ip),
            ScopedIp::V6(ip, _) => IpAddr::V6(*ip),
        })
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults() {
        let c = ServerConfig::default();
        assert_eq!(c.features, ["FOLDER", "HREF", "TXT"]);
        assert_eq!(c.limits.item_max, 200);
        assert_eq!(c.limits.page_max, 240);
        assert_eq!(ServerConfig::with_base_name("svc.example.").base_name, "svc.example");
    }

    #[test]
    fn reads_nameservers() {
        let conf = "# comment\nnameserver 1.1.1.1\nsearch lan\nnameserver 2606:4700:4700::1111\nnameserver fe80::1%eth0\n";
        let conf = resolv_conf::Config::parse(conf).unwrap();
        assert_eq!(
            nameservers(&conf),
            vec![
                "1.1.1.1:53".parse::<SocketAddr>().unwrap(),
                "[2606:4700:4700::1111]:53".parse().unwrap(),
                "[fe80::1]:53".parse().unwrap(),
            ]
        );
    }

    #[test]
    fn resolv_conf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolv.conf");
        std::fs::write(&path, "nameserver 9.9.9.9\noptions timeout:1\n").unwrap();
        let config = ClientConfig::from_resolv_conf(&path).unwrap();
        assert_eq!(config.resolvers, ["9.9.9.9:53".parse::<SocketAddr>().unwrap()]);

        std::fs::write(&path, "nameserver bogus\n").unwrap();
        assert!(matches!(
            ClientConfig::from_resolv_conf(&path),
            Err(Error::ResolvConf(_))
        ));
        assert!(matches!(
            ClientConfig::from_resolv_conf(dir.path().join("missing")),
            Err(Error::Io(_))
        ));
    }
}
