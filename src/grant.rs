use crate::error::{Error, Result};
use crate::types::{GrantId, GroupId, Resource, TenantScope};
use std::fmt;
use std::str::FromStr;

const GLOBAL_WILDCARD: &str = "*.*";
const MODULE_WILDCARD_SUFFIX: &str = ".*";

/// Action requested against a resource.
///
/// Wire-stable strings: `read`, `create`, `edit`, `manage`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Action {
    /// View resource data.
    Read,
    /// Create new resource instances.
    Create,
    /// Modify existing resource data.
    Edit,
    /// Full control; subsumes every other action.
    Manage,
}

impl Action {
    /// Every action, in wire order.
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Edit, Action::Manage];

    /// Returns the wire string for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Manage => "manage",
        }
    }

    /// Actions this action subsumes, itself included.
    ///
    /// The hierarchy is exactly: `manage` covers everything, every other
    /// action covers only itself.
    pub fn subsumes(self) -> &'static [Action] {
        match self {
            Action::Read => &[Action::Read],
            Action::Create => &[Action::Create],
            Action::Edit => &[Action::Edit],
            Action::Manage => &Action::ALL,
        }
    }

    /// Whether a grant carrying this action satisfies `required`.
    pub fn satisfies(self, required: Action) -> bool {
        self.subsumes().contains(&required)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "edit" => Ok(Action::Edit),
            "manage" => Ok(Action::Manage),
            other => Err(Error::InvalidAction(format!(
                "unknown action {other:?}; expected read, create, edit or manage"
            ))),
        }
    }
}

/// Grant lifecycle status.
///
/// Anything other than [`GrantStatus::Active`] is excluded from
/// evaluation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GrantStatus {
    /// Grant participates in evaluation.
    #[default]
    Active,
    /// Grant is retained but ignored.
    Disabled,
}

impl GrantStatus {
    /// Whether the grant participates in evaluation.
    pub fn is_active(self) -> bool {
        matches!(self, GrantStatus::Active)
    }
}

/// A single resource+action authorization attached to a group.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grant {
    /// Grant identifier.
    pub id: GrantId,
    /// Tenant scope the grant belongs to.
    pub tenant_scope: TenantScope,
    /// Group the grant is attached to.
    pub group_id: GroupId,
    /// Resource the grant covers, possibly wildcard-bearing.
    pub resource: Resource,
    /// Action the grant confers.
    pub action: Action,
    /// Lifecycle status.
    pub status: GrantStatus,
}

impl Grant {
    /// Creates an active grant.
    pub fn new(
        id: GrantId,
        tenant_scope: TenantScope,
        group_id: GroupId,
        resource: Resource,
        action: Action,
    ) -> Self {
        Self {
            id,
            tenant_scope,
            group_id,
            resource,
            action,
            status: GrantStatus::Active,
        }
    }

    /// Overrides the lifecycle status.
    pub fn with_status(mut self, status: GrantStatus) -> Self {
        self.status = status;
        self
    }
}

/// Whether a granted resource string covers a requested one.
///
/// Covers on exact equality, on the global wildcard `*.*`, or on a module
/// wildcard `seg.*` whose prefix equals the requested resource's first
/// dot-segment. Exact grants carry no prefix semantics: `user` does not
/// cover `user.profile`. Empty strings never match.
pub(crate) fn resource_covers(granted: &str, requested: &str) -> bool {
    if granted.is_empty() || requested.is_empty() {
        return false;
    }
    if granted == requested || granted == GLOBAL_WILDCARD {
        return true;
    }
    if let Some(prefix) = granted.strip_suffix(MODULE_WILDCARD_SUFFIX) {
        let leading = requested.split('.').next().unwrap_or(requested);
        return !prefix.is_empty() && prefix == leading;
    }
    false
}

/// Whether a single grant authorizes `(resource, action)`.
///
/// Inactive grants never authorize anything, even if a caller hands the
/// matcher an unfiltered set.
pub(crate) fn grant_authorizes(grant: &Grant, resource: &Resource, action: Action) -> bool {
    grant.status.is_active()
        && grant.action.satisfies(action)
        && resource_covers(grant.resource.as_str(), resource.as_str())
}
