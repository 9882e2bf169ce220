//! Multi-tenant grant-based capability checking.
//!
//! This crate maps an authenticated identity, through group memberships,
//! to a set of wildcard-capable resource/action grants, and answers "can
//! this identity do X to resource Y". Grants are loaded once per request
//! into a [`PermissionSet`]; every predicate afterwards is a synchronous
//! in-memory check. The default behavior is deny: an empty set authorizes
//! nothing.
//!
//! Matching rules: exact resource equality, the global wildcard `*.*`,
//! and module wildcards such as `user.*` that cover every resource whose
//! first dot-segment is `user`. The `manage` action subsumes `read`,
//! `create` and `edit` for the same resource match.
//!
//! # Examples
//!
//! Resolving and checking against the in-memory store (enable
//! `memory-store`):
//! ```no_run
//! use grantgate::{Identity, IdentityId, Resolver, TenantScope};
//! # #[cfg(feature = "memory-store")]
//! # {
//! use grantgate::MemoryStore;
//! let store = MemoryStore::new();
//! let resolver = Resolver::new(store);
//! let tenant = TenantScope::try_from("acme").unwrap();
//! let identity = Identity::new(IdentityId::try_from("user_1").unwrap(), tenant.clone());
//! let _ = resolver.initialize(Some(&identity), &tenant);
//! # }
//! ```
//!
//! Guarding a route (enable `axum`):
//! ```no_run
//! # #[cfg(feature = "axum")]
//! # {
//! use grantgate::{Action, Resource};
//! use grantgate::axum::require_capability;
//! let layer = require_capability(Resource::try_from("user").unwrap(), Action::Create);
//! # let _ = layer;
//! # }
//! ```
#![forbid(unsafe_code)]

mod error;
mod grant;
mod guard;
mod resolver;
mod store;
mod types;

#[cfg(feature = "memory-store")]
mod memory_store;

#[cfg(feature = "axum")]
pub mod axum;

pub use crate::error::{Error, Result, StoreError};
pub use crate::grant::{Action, Grant, GrantStatus};
pub use crate::guard::{check_multiple, require};
pub use crate::resolver::{PermissionSet, Resolver};
pub use crate::store::GrantStore;
pub use crate::types::{GrantId, GroupId, Identity, IdentityId, Resource, TenantScope};

#[cfg(feature = "memory-store")]
pub use crate::memory_store::MemoryStore;
