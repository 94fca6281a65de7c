//! Ingress rule engine for sg-updater
//!
//! - [`port_spec`] turns a port spec tag into desired rules
//! - [`resolver`] turns a DNS name into a single-host source range
//! - [`diff`] computes which rules to authorize and which to revoke

pub mod diff;
pub mod port_spec;
pub mod resolver;
pub mod rule;

pub use diff::{diff, RuleDiff};
pub use port_spec::{parse_port, parse_port_list, PortSpecError};
pub use resolver::{
    resolve_to_single_host_range, single_host_range, NameResolver, ResolveError, SystemResolver,
};
pub use rule::{IpPermission, IpRange, Protocol, Rule, ICMP_ANY};
