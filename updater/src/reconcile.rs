//! Reconciliation cycle
//!
//! One pass over every opted-in security group: read tags, resolve the
//! trusted host, build the desired rules, diff against the group's current
//! permissions and apply the difference. Groups are processed one after the
//! other and a failing group never stops the rest of the cycle. Nothing is
//! carried over between cycles.

use sg_updater_rules::{
    diff, parse_port_list, resolve_to_single_host_range, IpPermission, NameResolver,
    PortSpecError, ResolveError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::TagConfig;
use crate::firewall::{FirewallApi, GroupFilter, SecurityGroup};
use crate::tags::{self, GroupSettings};

/// Failure of a single group; recorded, never propagated past the group
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("Missing tag: {key}")]
    MissingTag { key: String },
    #[error(transparent)]
    Resolution(#[from] ResolveError),
    #[error(transparent)]
    InvalidPortSpec(#[from] PortSpecError),
    #[error("Firewall API call failed: {0:#}")]
    Api(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Security group discovery failed: {0:#}")]
    Discovery(anyhow::Error),
    #[error("{count} security groups failed to update: {}", .group_ids.join(", "))]
    GroupsFailed { count: usize, group_ids: Vec<String> },
}

/// What a successful group reconciliation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChange {
    pub group_id: String,
    pub source_range: String,
    pub added: usize,
    pub removed: usize,
}

/// Result of one cycle
#[derive(Debug, Default)]
pub struct ReconciliationOutcome {
    pub changes: Vec<GroupChange>,
    /// Failed group ids, in processing order
    pub failed: Vec<String>,
    /// Groups carrying the enabled tag with a non-truthy value
    pub skipped: usize,
}

impl ReconciliationOutcome {
    fn record(&mut self, group_id: &str, result: Result<GroupChange, GroupError>) {
        match result {
            Ok(change) => self.changes.push(change),
            Err(e) => {
                error!("Error updating ingress rules for group {group_id}: {e}");
                self.failed.push(group_id.to_string());
            }
        }
    }

    /// Turn recorded failures into the aggregate cycle error
    pub fn into_result(self) -> Result<Self, CycleError> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(CycleError::GroupsFailed {
                count: self.failed.len(),
                group_ids: self.failed,
            })
        }
    }
}

pub struct Reconciler {
    api: Arc<dyn FirewallApi>,
    resolver: Arc<dyn NameResolver>,
    tags: TagConfig,
}

impl Reconciler {
    pub fn new(
        api: Arc<dyn FirewallApi>,
        resolver: Arc<dyn NameResolver>,
        tags: TagConfig,
    ) -> Self {
        Self {
            api,
            resolver,
            tags,
        }
    }

    /// Run one full cycle over every managed group.
    ///
    /// Changes applied to healthy groups stay applied even when the cycle as
    /// a whole reports failure.
    pub async fn run_cycle(&self) -> Result<ReconciliationOutcome, CycleError> {
        let filter = GroupFilter {
            tag_key: self.tags.enabled.clone(),
        };
        let groups = self
            .api
            .list_matching(&filter)
            .await
            .map_err(CycleError::Discovery)?;

        let mut outcome = ReconciliationOutcome::default();
        for group in &groups {
            if !tags::is_enabled(group, &self.tags) {
                debug!(
                    "Skipping group {} ({}): {} is not set to a true value",
                    group.group_name, group.group_id, self.tags.enabled
                );
                outcome.skipped += 1;
                continue;
            }

            info!(
                "Found group '{}' with id: {}",
                group.group_name, group.group_id
            );
            info!("{group:#?}");

            let result = self.reconcile_group(group).await;
            outcome.record(&group.group_id, result);
        }

        outcome.into_result()
    }

    async fn reconcile_group(&self, group: &SecurityGroup) -> Result<GroupChange, GroupError> {
        let settings = GroupSettings::from_group(group, &self.tags)?;
        let source_range =
            resolve_to_single_host_range(self.resolver.as_ref(), &settings.dns_name).await?;
        let desired = parse_port_list(&settings.ports_spec, &source_range)?;

        let changes = diff(&desired, &group.ip_permissions);
        if changes.is_empty() {
            debug!("Group {} is up to date", group.group_id);
        }

        // Revoke before authorize; a merged permission may already hold a
        // desired range
        if !changes.to_remove.is_empty() {
            info!(
                "Revoking {} ingress rules on {}",
                changes.to_remove.len(),
                group.group_id
            );
            self.api
                .revoke_ingress(&group.group_id, &changes.to_remove)
                .await
                .map_err(GroupError::Api)?;
        }

        if !changes.to_add.is_empty() {
            let permissions: Vec<IpPermission> =
                changes.to_add.iter().map(IpPermission::from).collect();
            info!(
                "Authorizing {} ingress rules on {}",
                permissions.len(),
                group.group_id
            );
            self.api
                .authorize_ingress(&group.group_id, &permissions)
                .await
                .map_err(GroupError::Api)?;
        }

        Ok(GroupChange {
            group_id: group.group_id.clone(),
            source_range,
            added: changes.to_add.len(),
            removed: changes.to_remove.len(),
        })
    }
}
