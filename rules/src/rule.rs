//! Ingress rule model
//!
//! [`Rule`] is the normalized four-field form used for comparison.
//! [`IpPermission`] is the shape the firewall API reports and accepts; it
//! keeps any provider fields it does not understand so that a permission read
//! from the API can be handed back verbatim on revoke.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// ICMP "all types" sentinel used for both ports
pub const ICMP_ANY: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
        }
    }

    /// Map a provider protocol string onto a known protocol
    pub fn from_provider(value: &str) -> Option<Self> {
        match value {
            "tcp" | "6" => Some(Protocol::Tcp),
            "udp" | "17" => Some(Protocol::Udp),
            "icmp" | "1" => Some(Protocol::Icmp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ingress permission, reduced to the fields that define it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub protocol: Protocol,
    pub from_port: i32,
    pub to_port: i32,
    pub source_ranges: Vec<String>,
}

impl Rule {
    pub fn new(protocol: Protocol, from_port: i32, to_port: i32, cidr: &str) -> Self {
        Self {
            protocol,
            from_port,
            to_port,
            source_ranges: vec![cidr.to_string()],
        }
    }

    pub fn single_port(protocol: Protocol, port: i32, cidr: &str) -> Self {
        Self::new(protocol, port, port, cidr)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} from {}",
            self.protocol,
            self.from_port,
            self.to_port,
            self.source_ranges.join(",")
        )
    }
}

/// One source range entry of an [`IpPermission`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpRange {
    #[serde(rename = "CidrIp")]
    pub cidr_ip: String,
    /// Provider fields such as `Description`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An ingress permission as reported by the firewall API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpPermission {
    #[serde(rename = "IpProtocol")]
    pub ip_protocol: String,
    #[serde(rename = "FromPort", default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<i32>,
    #[serde(rename = "ToPort", default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<i32>,
    #[serde(rename = "IpRanges", default)]
    pub ip_ranges: Vec<IpRange>,
    /// Everything else the provider sent (IPv6 ranges, prefix lists, group pairs...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IpPermission {
    /// Reduce to the four compared fields.
    ///
    /// Returns `None` for permissions that can never equal a desired rule:
    /// unknown protocols (e.g. `-1` for all traffic) or missing ports.
    pub fn comparison_key(&self) -> Option<Rule> {
        let protocol = Protocol::from_provider(&self.ip_protocol.to_ascii_lowercase())?;
        Some(Rule {
            protocol,
            from_port: self.from_port?,
            to_port: self.to_port?,
            source_ranges: self.ip_ranges.iter().map(|r| r.cidr_ip.clone()).collect(),
        })
    }
}

impl From<&Rule> for IpPermission {
    fn from(rule: &Rule) -> Self {
        Self {
            ip_protocol: rule.protocol.as_str().to_string(),
            from_port: Some(rule.from_port),
            to_port: Some(rule.to_port),
            ip_ranges: rule
                .source_ranges
                .iter()
                .map(|cidr| IpRange {
                    cidr_ip: cidr.clone(),
                    extra: Map::new(),
                })
                .collect(),
            extra: Map::new(),
        }
    }
}

impl From<Rule> for IpPermission {
    fn from(rule: Rule) -> Self {
        IpPermission::from(&rule)
    }
}
