//! Rule set differ
//!
//! Computes the exact multiset difference between the desired rules and the
//! permissions currently attached to a firewall object.

use std::collections::HashMap;

use crate::rule::{IpPermission, Rule};

/// Changes needed to turn the actual rule set into the desired one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleDiff {
    pub to_add: Vec<Rule>,
    /// Original permissions as read from the API, extra fields included
    pub to_remove: Vec<IpPermission>,
}

impl RuleDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff `desired` against `actual`.
///
/// Every actual permission that matches a still-unclaimed desired rule claims
/// it; the rest are removed. Desired rules nobody claimed are added. Both
/// output lists keep the order of their input.
pub fn diff(desired: &[Rule], actual: &[IpPermission]) -> RuleDiff {
    let mut remaining: HashMap<&Rule, usize> = HashMap::new();
    for rule in desired {
        *remaining.entry(rule).or_default() += 1;
    }

    let mut to_remove = Vec::new();
    for perm in actual {
        let claimed = perm
            .comparison_key()
            .and_then(|key| remaining.get_mut(&key))
            .filter(|count| **count > 0)
            .map(|count| *count -= 1)
            .is_some();
        if !claimed {
            to_remove.push(perm.clone());
        }
    }

    // Unclaimed occurrences of a rule are interchangeable, so emit the
    // first `count` of them in desired order.
    let to_add = desired
        .iter()
        .filter(|rule| match remaining.get_mut(*rule) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        })
        .cloned()
        .collect();

    RuleDiff { to_add, to_remove }
}
