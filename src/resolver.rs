use crate::error::{Error, Result};
use crate::grant::{Action, Grant, grant_authorizes};
use crate::store::GrantStore;
use crate::types::{Identity, Resource, TenantScope};
use std::collections::HashMap;

/// Materializes a [`PermissionSet`] for an identity within a tenant scope.
///
/// The resolver performs the store reads once per request; every
/// capability check afterwards runs against the returned value without
/// touching the store again.
#[derive(Debug)]
pub struct Resolver<S> {
    store: S,
}

impl<S> Resolver<S> {
    /// Creates a resolver over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> Resolver<S>
where
    S: GrantStore,
{
    /// Loads the identity's memberships and their grants for one request.
    ///
    /// Fails with [`Error::AuthRequired`] when no identity is present and
    /// with [`Error::StoreUnavailable`] when either read fails. An identity
    /// with zero memberships yields an empty set, not an error.
    pub async fn initialize(
        &self,
        identity: Option<&Identity>,
        tenant: &TenantScope,
    ) -> Result<PermissionSet> {
        let identity = identity.ok_or(Error::AuthRequired)?;

        let groups = self
            .store
            .membership_group_ids(tenant, &identity.id)
            .await
            .map_err(Error::StoreUnavailable)?;
        if groups.is_empty() {
            return Ok(PermissionSet::empty(tenant.clone()));
        }

        let grants = self
            .store
            .active_grants(&groups)
            .await
            .map_err(Error::StoreUnavailable)?;
        Ok(PermissionSet::new(tenant.clone(), grants))
    }
}

/// All active grants reachable from an identity's memberships within one
/// tenant scope.
///
/// An explicit, request-scoped value: thread it through the call chain
/// (request extensions, handler arguments) instead of stashing predicates
/// on ambient state. Predicates are synchronous, idempotent in-memory
/// checks. Discard the set at request end; grant changes take effect on
/// the next request's resolve.
#[derive(Clone, Debug)]
pub struct PermissionSet {
    tenant_scope: TenantScope,
    grants: Vec<Grant>,
}

impl PermissionSet {
    /// Builds a set from loaded grants.
    ///
    /// Grants that are inactive or that belong to a different tenant scope
    /// are dropped here even if the store returned them.
    pub fn new(tenant_scope: TenantScope, mut grants: Vec<Grant>) -> Self {
        grants.retain(|grant| grant.status.is_active() && grant.tenant_scope == tenant_scope);
        Self {
            tenant_scope,
            grants,
        }
    }

    /// An empty set; every predicate returns false.
    pub fn empty(tenant_scope: TenantScope) -> Self {
        Self {
            tenant_scope,
            grants: Vec::new(),
        }
    }

    /// Tenant scope this set was resolved for.
    pub fn tenant_scope(&self) -> &TenantScope {
        &self.tenant_scope
    }

    /// Grants in this set.
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    /// Whether the set holds no grants.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Whether any grant authorizes `(resource, action)`.
    ///
    /// A pure existential OR over the grants; there is no precedence and
    /// no deny rule.
    pub fn can(&self, resource: &Resource, action: Action) -> bool {
        self.grants
            .iter()
            .any(|grant| grant_authorizes(grant, resource, action))
    }

    /// Whether the set authorizes reading `resource`.
    pub fn can_read(&self, resource: &Resource) -> bool {
        self.can(resource, Action::Read)
    }

    /// Whether the set authorizes creating under `resource`.
    pub fn can_create(&self, resource: &Resource) -> bool {
        self.can(resource, Action::Create)
    }

    /// Whether the set authorizes editing `resource`.
    pub fn can_edit(&self, resource: &Resource) -> bool {
        self.can(resource, Action::Edit)
    }

    /// Whether the set authorizes managing `resource`.
    pub fn can_manage(&self, resource: &Resource) -> bool {
        self.can(resource, Action::Manage)
    }

    /// Evaluates each `(resource, action)` pair.
    ///
    /// Keys are `resource:action`, for UI-driven conditional rendering.
    pub fn check_many(&self, pairs: &[(Resource, Action)]) -> HashMap<String, bool> {
        pairs
            .iter()
            .map(|(resource, action)| {
                (
                    format!("{resource}:{action}"),
                    self.can(resource, *action),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::grant::GrantStatus;
    use crate::types::{GrantId, GroupId, IdentityId};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestStore {
        memberships: HashMap<(TenantScope, IdentityId), Vec<GroupId>>,
        grants: HashMap<GroupId, Vec<Grant>>,
        fail: bool,
    }

    #[async_trait]
    impl GrantStore for TestStore {
        async fn membership_group_ids(
            &self,
            tenant: &TenantScope,
            identity: &IdentityId,
        ) -> std::result::Result<Vec<GroupId>, StoreError> {
            if self.fail {
                return Err("connection refused".into());
            }
            Ok(self
                .memberships
                .get(&(tenant.clone(), identity.clone()))
                .cloned()
                .unwrap_or_default())
        }

        async fn active_grants(
            &self,
            groups: &[GroupId],
        ) -> std::result::Result<Vec<Grant>, StoreError> {
            if self.fail {
                return Err("connection refused".into());
            }
            let mut out = Vec::new();
            for group in groups {
                if let Some(grants) = self.grants.get(group) {
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

    fn tenant() -> TenantScope {
        TenantScope::try_from("acme").unwrap()
    }

    fn identity() -> Identity {
        Identity::new(IdentityId::try_from("user_1").unwrap(), tenant())
    }

    fn group(value: &str) -> GroupId {
        GroupId::try_from(value).unwrap()
    }

    fn resource(value: &str) -> Resource {
        Resource::try_from(value).unwrap()
    }

    fn grant_in(tenant: TenantScope, group: &GroupId, id: &str, res: &str, action: Action) -> Grant {
        Grant::new(
            GrantId::try_from(id).unwrap(),
            tenant,
            group.clone(),
            resource(res),
            action,
        )
    }

    fn store_with(grants: Vec<Grant>) -> TestStore {
        let mut store = TestStore::default();
        let group = group("group_1");
        store.memberships.insert(
            (tenant(), identity().id),
            vec![group.clone()],
        );
        store.grants.insert(group, grants);
        store
    }

    fn resolve(store: TestStore) -> PermissionSet {
        let resolver = Resolver::new(store);
        block_on(resolver.initialize(Some(&identity()), &tenant())).unwrap()
    }

    #[test]
    fn initialize_without_identity_fails_auth_required() {
        let resolver = Resolver::new(TestStore::default());
        let result = block_on(resolver.initialize(None, &tenant()));
        assert!(matches!(result, Err(Error::AuthRequired)));
    }

    #[test]
    fn initialize_surfaces_store_failure() {
        let resolver = Resolver::new(TestStore {
            fail: true,
            ..TestStore::default()
        });
        let result = block_on(resolver.initialize(Some(&identity()), &tenant()));
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }

    #[test]
    fn zero_memberships_yield_empty_set_without_error() {
        let set = resolve(TestStore::default());
        assert!(set.is_empty());
        for action in Action::ALL {
            assert!(!set.can(&resource("user"), action));
        }
    }

    #[test]
    fn exact_grant_authorizes_its_action_only() {
        let g = group("group_1");
        let set = resolve(store_with(vec![grant_in(
            tenant(),
            &g,
            "grant_1",
            "user",
            Action::Read,
        )]));

        assert!(set.can_read(&resource("user")));
        assert!(!set.can_edit(&resource("user")));
        assert!(!set.can_read(&resource("payroll")));
    }

    #[test]
    fn global_manage_grant_authorizes_everything() {
        let g = group("group_1");
        let set = resolve(store_with(vec![grant_in(
            tenant(),
            &g,
            "grant_1",
            "*.*",
            Action::Manage,
        )]));

        assert!(set.can_read(&resource("anything")));
        assert!(set.can_manage(&resource("anything.else")));
        assert!(set.can_create(&resource("payroll.salary")));
        assert!(set.can_edit(&resource("user")));
    }

    #[test]
    fn manage_grant_satisfies_every_predicate_for_matched_resource() {
        let g = group("group_1");
        let set = resolve(store_with(vec![grant_in(
            tenant(),
            &g,
            "grant_1",
            "payroll",
            Action::Manage,
        )]));

        let payroll = resource("payroll");
        assert!(set.can_read(&payroll));
        assert!(set.can_create(&payroll));
        assert!(set.can_edit(&payroll));
        assert!(set.can_manage(&payroll));
        assert!(!set.can_read(&resource("user")));
    }

    #[test]
    fn module_wildcard_grant_stays_inside_its_module() {
        let g = group("group_1");
        let set = resolve(store_with(vec![grant_in(
            tenant(),
            &g,
            "grant_1",
            "user.*",
            Action::Read,
        )]));

        assert!(set.can_read(&resource("user.profile")));
        assert!(set.can_read(&resource("user.settings")));
        assert!(!set.can_read(&resource("payroll.salary")));
    }

    #[test]
    fn exact_grant_is_not_a_prefix() {
        let g = group("group_1");
        let set = resolve(store_with(vec![grant_in(
            tenant(),
            &g,
            "grant_1",
            "user",
            Action::Read,
        )]));

        assert!(!set.can_read(&resource("user.profile")));
    }

    #[test]
    fn grants_from_other_tenants_are_dropped() {
        let g = group("group_1");
        let foreign = TenantScope::try_from("globex").unwrap();
        let set = resolve(store_with(vec![grant_in(
            foreign,
            &g,
            "grant_1",
            "user",
            Action::Manage,
        )]));

        assert!(set.is_empty());
        assert!(!set.can_read(&resource("user")));
    }

    #[test]
    fn inactive_grants_are_dropped_even_if_store_returns_them() {
        let g = group("group_1");
        let disabled = grant_in(tenant(), &g, "grant_1", "user", Action::Manage)
            .with_status(GrantStatus::Disabled);
        let set = PermissionSet::new(tenant(), vec![disabled]);

        assert!(set.is_empty());
        assert!(!set.can_read(&resource("user")));
    }

    #[test]
    fn predicates_are_idempotent() {
        let g = group("group_1");
        let set = resolve(store_with(vec![grant_in(
            tenant(),
            &g,
            "grant_1",
            "user",
            Action::Read,
        )]));

        let target = resource("user");
        let first = set.can_read(&target);
        let second = set.can_read(&target);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn grants_from_multiple_groups_are_unioned() {
        let mut store = TestStore::default();
        let group_a = group("group_a");
        let group_b = group("group_b");
        store.memberships.insert(
            (tenant(), identity().id),
            vec![group_a.clone(), group_b.clone()],
        );
        store.grants.insert(
            group_a.clone(),
            vec![grant_in(tenant(), &group_a, "grant_1", "user", Action::Read)],
        );
        store.grants.insert(
            group_b.clone(),
            vec![grant_in(
                tenant(),
                &group_b,
                "grant_2",
                "payroll",
                Action::Edit,
            )],
        );

        let set = resolve(store);
        assert!(set.can_read(&resource("user")));
        assert!(set.can_edit(&resource("payroll")));
        assert!(!set.can_edit(&resource("user")));
    }

    #[test]
    fn check_many_maps_each_pair() {
        let g = group("group_1");
        let set = resolve(store_with(vec![grant_in(
            tenant(),
            &g,
            "grant_1",
            "user",
            Action::Read,
        )]));

        let results = set.check_many(&[
            (resource("user"), Action::Read),
            (resource("user"), Action::Create),
            (resource("payroll"), Action::Read),
        ]);

        assert_eq!(results.len(), 3);
        assert!(results["user:read"]);
        assert!(!results["user:create"]);
        assert!(!results["payroll:read"]);
    }
}
