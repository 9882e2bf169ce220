use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::grant::{Grant, GrantStatus};
use crate::store::GrantStore;
use crate::types::{GrantId, GroupId, IdentityId, TenantScope};

/// In-memory store implementation for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    memberships: RwLock<HashMap<(TenantScope, IdentityId), HashSet<GroupId>>>,
    grants: RwLock<HashMap<GroupId, Vec<Grant>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity to a group within a tenant.
    pub fn add_membership(&self, tenant: TenantScope, identity: IdentityId, group: GroupId) {
        let mut guard = self.inner.memberships.write().expect("poisoned lock");
        guard.entry((tenant, identity)).or_default().insert(group);
    }

    /// Adds a grant, keyed by its group.
    pub fn add_grant(&self, grant: Grant) {
        let mut guard = self.inner.grants.write().expect("poisoned lock");
        guard.entry(grant.group_id.clone()).or_default().push(grant);
    }

    /// Updates the status of every copy of a grant.
    pub fn set_grant_status(&self, grant_id: &GrantId, status: GrantStatus) {
        let mut guard = self.inner.grants.write().expect("poisoned lock");
        for grants in guard.values_mut() {
            for grant in grants.iter_mut() {
                if &grant.id == grant_id {
                    grant.status = status;
                }
            }
        }
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn membership_group_ids(
        &self,
        tenant: &TenantScope,
        identity: &IdentityId,
    ) -> std::result::Result<Vec<GroupId>, crate::StoreError> {
        let guard = self.inner.memberships.read().expect("poisoned lock");
        Ok(guard
            .get(&(tenant.clone(), identity.clone()))
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn active_grants(
        &self,
        groups: &[GroupId],
    ) -> std::result::Result<Vec<Grant>, crate::StoreError> {
        let guard = self.inner.grants.read().expect("poisoned lock");
        let mut out = Vec::new();
        for group in groups {
            if let Some(grants) = guard.get(group) {
                out.extend(
                    grants
                        .iter()
                        .filter(|grant| grant.status.is_active())
                        .cloned(),
                );
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Action;
    use crate::types::{Identity, Resource};
    use futures::executor::block_on;

    fn grant(id: &str, group: &GroupId, resource: &str, action: Action) -> Grant {
        Grant::new(
            GrantId::try_from(id).unwrap(),
            TenantScope::try_from("acme").unwrap(),
            group.clone(),
            Resource::try_from(resource).unwrap(),
            action,
        )
    }

    #[test]
    fn memory_store_should_support_basic_flow() {
        let store = MemoryStore::new();
        let tenant = TenantScope::try_from("acme").unwrap();
        let identity = Identity::new(IdentityId::try_from("user_1").unwrap(), tenant.clone());
        let group = GroupId::try_from("group_1").unwrap();

        store.add_membership(tenant.clone(), identity.id.clone(), group.clone());
        store.add_grant(grant("grant_1", &group, "user", Action::Read));

        let resolver = crate::Resolver::new(store);
        let set = block_on(resolver.initialize(Some(&identity), &tenant)).unwrap();

        assert!(set.can_read(&Resource::try_from("user").unwrap()));
        assert!(!set.can_edit(&Resource::try_from("user").unwrap()));
    }

    #[test]
    fn disabled_grant_is_not_served() {
        let store = MemoryStore::new();
        let tenant = TenantScope::try_from("acme").unwrap();
        let identity = Identity::new(IdentityId::try_from("user_1").unwrap(), tenant.clone());
        let group = GroupId::try_from("group_1").unwrap();
        let grant_id = GrantId::try_from("grant_1").unwrap();

        store.add_membership(tenant.clone(), identity.id.clone(), group.clone());
        store.add_grant(grant("grant_1", &group, "user", Action::Manage));
        store.set_grant_status(&grant_id, GrantStatus::Disabled);

        let resolver = crate::Resolver::new(store);
        let set = block_on(resolver.initialize(Some(&identity), &tenant)).unwrap();

        assert!(set.is_empty());
    }
}
