//! HTTP firewall API client
//!
//! Talks JSON to a firewall management endpoint that exposes EC2-shaped
//! security group resources.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sg_updater_rules::IpPermission;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::firewall::{FirewallApi, GroupFilter, SecurityGroup};

pub struct HttpFirewallClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Deserialize)]
struct DescribeResponse {
    #[serde(rename = "SecurityGroups", default)]
    security_groups: Vec<SecurityGroup>,
}

#[derive(Serialize)]
struct IngressRequest<'a> {
    #[serde(rename = "IpPermissions")]
    ip_permissions: &'a [IpPermission],
}

impl HttpFirewallClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid firewall API base URL: {}", config.base_url))?;
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                anyhow!("Firewall API base URL cannot carry a path: {}", self.base_url)
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_ingress(
        &self,
        group_id: &str,
        action: &str,
        permissions: &[IpPermission],
    ) -> Result<()> {
        let url = self.endpoint(&["security-groups", group_id, "ingress", action])?;
        debug!("POST {url} with {} permissions", permissions.len());

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&IngressRequest {
                ip_permissions: permissions,
            })
            .send()
            .await
            .with_context(|| format!("Failed to {action} ingress for {group_id}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Firewall API error {status} on {action} for {group_id}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl FirewallApi for HttpFirewallClient {
    async fn list_matching(&self, filter: &GroupFilter) -> Result<Vec<SecurityGroup>> {
        let url = self.endpoint(&["security-groups"])?;
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&[("tag-key", filter.tag_key.as_str())])
            .send()
            .await
            .context("Failed to list security groups")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Firewall API error {status} listing security groups: {body}");
        }

        let described: DescribeResponse = response
            .json()
            .await
            .context("Invalid security group listing")?;
        Ok(described.security_groups)
    }

    async fn authorize_ingress(&self, group_id: &str, permissions: &[IpPermission]) -> Result<()> {
        self.post_ingress(group_id, "authorize", permissions).await
    }

    async fn revoke_ingress(&self, group_id: &str, permissions: &[IpPermission]) -> Result<()> {
        self.post_ingress(group_id, "revoke", permissions).await
    }
}
