//! Address resolution — host name to single-host CIDR range

use async_trait::async_trait;
use std::net::IpAddr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("DNS resolution failed for {host}: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("DNS name {host} has no IPv4 address")]
    NoAddress { host: String },
}

/// Forward name lookup
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// Resolver backed by the operating system (getaddrinfo via tokio)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl NameResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        // lookup_host requires a port; it is discarded
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|source| ResolveError::Lookup {
                host: host.to_string(),
                source,
            })?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Format an address as a range containing only that address
pub fn single_host_range(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => format!("{v4}/32"),
        IpAddr::V6(v6) => format!("{v6}/128"),
    }
}

/// Resolve `host` and return its first IPv4 address as a `/32` range.
///
/// Every call performs a fresh lookup.
pub async fn resolve_to_single_host_range<R>(
    resolver: &R,
    host: &str,
) -> Result<String, ResolveError>
where
    R: NameResolver + ?Sized,
{
    let addrs = resolver.lookup(host).await?;
    let ip = addrs
        .into_iter()
        .find(IpAddr::is_ipv4)
        .ok_or_else(|| ResolveError::NoAddress {
            host: host.to_string(),
        })?;
    let range = single_host_range(ip);
    debug!("Resolved {host} to {range}");
    Ok(range)
}
