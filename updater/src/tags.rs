//! Tag contract — which groups are managed and what they ask for

use crate::config::TagConfig;
use crate::firewall::SecurityGroup;
use crate::reconcile::GroupError;

const ENABLED_VALUES: [&str; 5] = ["t", "true", "1", "yes", "y"];

/// Case-insensitive match against the truthy set
pub fn is_truthy(value: &str) -> bool {
    ENABLED_VALUES
        .iter()
        .any(|v| v.eq_ignore_ascii_case(value))
}

/// Whether the group has opted in via the enabled tag
pub fn is_enabled(group: &SecurityGroup, tags: &TagConfig) -> bool {
    group.tag(&tags.enabled).is_some_and(is_truthy)
}

/// Settings a managed group declares through its tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSettings {
    pub dns_name: String,
    pub ports_spec: String,
}

impl GroupSettings {
    pub fn from_group(group: &SecurityGroup, tags: &TagConfig) -> Result<Self, GroupError> {
        let dns_name = required_tag(group, &tags.dns_name)?;
        let ports_spec = required_tag(group, &tags.ports)?;
        Ok(Self {
            dns_name: dns_name.to_string(),
            ports_spec: ports_spec.to_string(),
        })
    }
}

fn required_tag<'a>(group: &'a SecurityGroup, key: &str) -> Result<&'a str, GroupError> {
    group.tag(key).ok_or_else(|| GroupError::MissingTag {
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firewall::Tag;

    fn group_with_tags(tags: &[(&str, &str)]) -> SecurityGroup {
        SecurityGroup {
            group_id: "sg-1".into(),
            group_name: "test".into(),
            tags: tags
                .iter()
                .map(|(k, v)| Tag {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            ip_permissions: vec![],
            extra: Default::default(),
        }
    }

    #[test]
    fn test_truthy_values_any_case() {
        for value in ["t", "T", "true", "TRUE", "True", "1", "yes", "YES", "Yes", "y", "Y", "tRuE"] {
            assert!(is_truthy(value), "{value} should be truthy");
        }
    }

    #[test]
    fn test_falsy_values() {
        for value in ["", "f", "false", "0", "no", "n", "enabled", " true", "yes "] {
            assert!(!is_truthy(value), "{value:?} should not be truthy");
        }
    }

    #[test]
    fn test_is_enabled() {
        let tags = TagConfig::default();
        assert!(is_enabled(
            &group_with_tags(&[("SecurityGroupUpdater_Enabled", "Yes")]),
            &tags
        ));
        assert!(!is_enabled(
            &group_with_tags(&[("SecurityGroupUpdater_Enabled", "off")]),
            &tags
        ));
        assert!(!is_enabled(&group_with_tags(&[]), &tags));
    }

    #[test]
    fn test_settings_from_group() {
        let group = group_with_tags(&[
            ("SecurityGroupUpdater_IngressDNSName", "home.example.net"),
            ("SecurityGroupUpdater_IngressPorts", "ssh,icmp"),
        ]);
        let settings = GroupSettings::from_group(&group, &TagConfig::default()).unwrap();
        assert_eq!(settings.dns_name, "home.example.net");
        assert_eq!(settings.ports_spec, "ssh,icmp");
    }

    #[test]
    fn test_missing_dns_name_tag() {
        let group = group_with_tags(&[("SecurityGroupUpdater_IngressPorts", "ssh")]);
        let err = GroupSettings::from_group(&group, &TagConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing tag: SecurityGroupUpdater_IngressDNSName"
        );
    }

    #[test]
    fn test_missing_ports_tag() {
        let group = group_with_tags(&[("SecurityGroupUpdater_IngressDNSName", "h.example.net")]);
        let err = GroupSettings::from_group(&group, &TagConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Missing tag: SecurityGroupUpdater_IngressPorts");
    }
}
