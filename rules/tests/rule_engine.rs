//! Integration tests for the ingress rule engine
//!
//! Exercises the path a reconciliation takes through the library:
//! - port spec parsing with a resolved source range
//! - diffing desired rules against permissions read from the API
//! - applying the diff and converging

use async_trait::async_trait;
use sg_updater_rules::{
    diff, parse_port_list, resolve_to_single_host_range, IpPermission, NameResolver, Protocol,
    ResolveError, Rule,
};
use std::net::IpAddr;

// ============================================================================
// Helpers
// ============================================================================

struct StaticResolver(&'static str);

#[async_trait]
impl NameResolver for StaticResolver {
    async fn lookup(&self, _host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        Ok(vec![self.0.parse().unwrap()])
    }
}

fn permissions_from_json(value: serde_json::Value) -> Vec<IpPermission> {
    serde_json::from_value(value).unwrap()
}

/// Apply a diff the way the firewall would, revoking before authorizing
fn apply(actual: &mut Vec<IpPermission>, desired: &[Rule]) {
    let changes = diff(desired, actual);
    for removed in &changes.to_remove {
        if let Some(pos) = actual.iter().position(|p| p == removed) {
            actual.remove(pos);
        }
    }
    actual.extend(changes.to_add.iter().map(IpPermission::from));
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_full_port_spec_parses_in_order() {
    let rules = parse_port_list("ssh,udp123,tcp456,icmp", "1.2.3.4/32").unwrap();

    let shape: Vec<(Protocol, i32, i32)> = rules
        .iter()
        .map(|r| (r.protocol, r.from_port, r.to_port))
        .collect();
    assert_eq!(
        shape,
        vec![
            (Protocol::Tcp, 22, 22),
            (Protocol::Udp, 123, 123),
            (Protocol::Tcp, 456, 456),
            (Protocol::Icmp, -1, -1),
        ]
    );
    assert!(rules
        .iter()
        .all(|r| r.source_ranges == vec!["1.2.3.4/32".to_string()]));
}

#[tokio::test]
async fn test_resolved_range_is_shared_by_every_rule() {
    let range = resolve_to_single_host_range(&StaticResolver("203.0.113.9"), "peer.example.net")
        .await
        .unwrap();
    let rules = parse_port_list("tcp80,tcp443,udp51820", &range).unwrap();
    assert!(rules
        .iter()
        .all(|r| r.source_ranges == vec!["203.0.113.9/32".to_string()]));
}

// ============================================================================
// Diffing against API state
// ============================================================================

#[test]
fn test_matching_state_needs_no_change() {
    let desired = parse_port_list("ssh,icmp", "1.2.3.4/32").unwrap();
    let actual = permissions_from_json(serde_json::json!([
        {
            "IpProtocol": "icmp", "FromPort": -1, "ToPort": -1,
            "IpRanges": [{ "CidrIp": "1.2.3.4/32", "Description": "ping" }],
            "Ipv6Ranges": [], "PrefixListIds": [], "UserIdGroupPairs": []
        },
        {
            "IpProtocol": "tcp", "FromPort": 22, "ToPort": 22,
            "IpRanges": [{ "CidrIp": "1.2.3.4/32" }],
            "Ipv6Ranges": [], "PrefixListIds": [], "UserIdGroupPairs": []
        }
    ]));
    assert!(diff(&desired, &actual).is_empty());
}

#[test]
fn test_manual_edits_are_reverted() {
    let desired = parse_port_list("ssh", "1.2.3.4/32").unwrap();
    let actual = permissions_from_json(serde_json::json!([
        { "IpProtocol": "tcp", "FromPort": 22, "ToPort": 22,
          "IpRanges": [{ "CidrIp": "1.2.3.4/32" }] },
        { "IpProtocol": "tcp", "FromPort": 3389, "ToPort": 3389,
          "IpRanges": [{ "CidrIp": "0.0.0.0/0", "Description": "temporary" }] },
        { "IpProtocol": "-1",
          "IpRanges": [{ "CidrIp": "10.0.0.0/8" }] }
    ]));
    let changes = diff(&desired, &actual);
    assert!(changes.to_add.is_empty());
    assert_eq!(changes.to_remove, actual[1..].to_vec());
}

#[test]
fn test_merged_multi_range_permission_is_replaced() {
    let desired = parse_port_list("ssh", "1.2.3.4/32").unwrap();
    let mut actual = permissions_from_json(serde_json::json!([
        { "IpProtocol": "tcp", "FromPort": 22, "ToPort": 22,
          "IpRanges": [{ "CidrIp": "1.2.3.4/32" }, { "CidrIp": "5.6.7.8/32" }] }
    ]));
    let changes = diff(&desired, &actual);
    assert_eq!(changes.to_add, desired);
    assert_eq!(changes.to_remove, actual);

    apply(&mut actual, &desired);
    assert_eq!(actual, vec![IpPermission::from(&desired[0])]);
    assert!(diff(&desired, &actual).is_empty());
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_dns_change_converges_in_one_step() {
    let mut actual: Vec<IpPermission> = parse_port_list("ssh,udp123", "1.2.3.4/32")
        .unwrap()
        .iter()
        .map(IpPermission::from)
        .collect();

    let desired = parse_port_list("ssh,udp123", "4.5.6.7/32").unwrap();
    apply(&mut actual, &desired);

    assert!(diff(&desired, &actual).is_empty());
    assert_eq!(actual.len(), 2);
    assert!(actual
        .iter()
        .all(|p| p.ip_ranges[0].cidr_ip == "4.5.6.7/32"));
}

#[test]
fn test_duplicate_tokens_converge_to_duplicate_rules() {
    let desired = parse_port_list("ssh,ssh,icmp", "1.2.3.4/32").unwrap();
    let mut actual = Vec::new();
    apply(&mut actual, &desired);
    assert_eq!(actual.len(), 3);
    assert!(diff(&desired, &actual).is_empty());
}
