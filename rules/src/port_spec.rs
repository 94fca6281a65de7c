//! Port spec parsing
//!
//! A port spec is a comma-separated list of tokens:
//! `ssh`, `tcp<port>`, `udp<port>` or `icmp` (any letter case).

use thiserror::Error;

use crate::rule::{Protocol, Rule, ICMP_ANY};

const SSH_PORT: i32 = 22;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortSpecError {
    #[error("Bad port/protocol specification: {token}")]
    InvalidPortSpec { token: String },
}

/// Parse a single port token into a rule sourced from `cidr`
pub fn parse_port(token: &str, cidr: &str) -> Result<Rule, PortSpecError> {
    let lowered = token.to_ascii_lowercase();

    let (protocol, port) = match lowered.as_str() {
        "ssh" => (Protocol::Tcp, SSH_PORT),
        "icmp" => (Protocol::Icmp, ICMP_ANY),
        other => {
            let (protocol, suffix) = if let Some(rest) = other.strip_prefix("tcp") {
                (Protocol::Tcp, rest)
            } else if let Some(rest) = other.strip_prefix("udp") {
                (Protocol::Udp, rest)
            } else {
                return Err(invalid(token));
            };
            (protocol, parse_port_number(suffix).ok_or_else(|| invalid(token))?)
        }
    };

    Ok(Rule::single_port(protocol, port, cidr))
}

/// Parse a whole port spec, stopping at the first bad token.
///
/// Tokens are not trimmed; `"ssh, icmp"` fails on `" icmp"`.
pub fn parse_port_list(spec: &str, cidr: &str) -> Result<Vec<Rule>, PortSpecError> {
    spec.split(',').map(|token| parse_port(token, cidr)).collect()
}

// Suffix must be non-empty and alphanumeric, then parse as an integer.
// Leading zeros and values above 65535 pass; the firewall API rejects the latter.
fn parse_port_number(suffix: &str) -> Option<i32> {
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    suffix.parse().ok()
}

fn invalid(token: &str) -> PortSpecError {
    PortSpecError::InvalidPortSpec {
        token: token.to_string(),
    }
}
