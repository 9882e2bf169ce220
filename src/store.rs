use crate::error::StoreError;
use crate::grant::Grant;
use crate::types::{GroupId, IdentityId, TenantScope};
use async_trait::async_trait;

/// Read-only store interface for memberships and grants.
///
/// The only storage assumption made here is that both reads are consistent
/// at call time. Both futures are dropped when the surrounding request is
/// cancelled, abandoning the pending read.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Returns ids of the groups an identity belongs to within a tenant.
    async fn membership_group_ids(
        &self,
        tenant: &TenantScope,
        identity: &IdentityId,
    ) -> std::result::Result<Vec<GroupId>, StoreError>;

    /// Returns the active grants attached to the given groups.
    ///
    /// Implementations must exclude grants whose status is not active.
    async fn active_grants(&self, groups: &[GroupId])
    -> std::result::Result<Vec<Grant>, StoreError>;
}
