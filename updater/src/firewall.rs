//! Firewall API seam
//!
//! The reconciler only needs three calls: list the security groups carrying
//! the opt-in tag, authorize a batch of ingress permissions, and revoke a
//! batch of ingress permissions.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sg_updater_rules::IpPermission;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// A security group as reported by the firewall API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroup {
    #[serde(rename = "GroupId")]
    pub group_id: String,
    #[serde(rename = "GroupName", default)]
    pub group_name: String,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
    #[serde(rename = "IpPermissions", default)]
    pub ip_permissions: Vec<IpPermission>,
    /// Remaining provider fields, kept for diagnostic output
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SecurityGroup {
    /// Value of the tag with the given key, if present
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}

/// Discovery filter: groups carrying the given tag key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFilter {
    pub tag_key: String,
}

#[async_trait]
pub trait FirewallApi: Send + Sync {
    /// List security groups matching `filter` (single page)
    async fn list_matching(&self, filter: &GroupFilter) -> Result<Vec<SecurityGroup>>;

    /// Add ingress permissions to a group in one call
    async fn authorize_ingress(&self, group_id: &str, permissions: &[IpPermission]) -> Result<()>;

    /// Remove ingress permissions from a group in one call
    async fn revoke_ingress(&self, group_id: &str, permissions: &[IpPermission]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_security_group() {
        let raw = serde_json::json!({
            "GroupId": "sg-0123",
            "GroupName": "home-access",
            "Description": "managed",
            "OwnerId": "111122223333",
            "VpcId": "vpc-1",
            "Tags": [
                { "Key": "SecurityGroupUpdater_Enabled", "Value": "true" },
                { "Key": "SecurityGroupUpdater_IngressPorts", "Value": "ssh" }
            ],
            "IpPermissions": [{
                "IpProtocol": "tcp",
                "FromPort": 22,
                "ToPort": 22,
                "IpRanges": [{ "CidrIp": "1.2.3.4/32" }]
            }]
        });
        let group: SecurityGroup = serde_json::from_value(raw).unwrap();
        assert_eq!(group.group_id, "sg-0123");
        assert_eq!(group.group_name, "home-access");
        assert_eq!(group.tag("SecurityGroupUpdater_IngressPorts"), Some("ssh"));
        assert_eq!(group.tag("missing"), None);
        assert_eq!(group.ip_permissions.len(), 1);
        assert_eq!(group.extra["VpcId"], "vpc-1");
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let raw = serde_json::json!({ "GroupId": "sg-bare" });
        let group: SecurityGroup = serde_json::from_value(raw).unwrap();
        assert!(group.tags.is_empty());
        assert!(group.ip_permissions.is_empty());
    }
}
