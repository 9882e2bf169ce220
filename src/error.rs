use crate::grant::Action;
use crate::types::Resource;
use thiserror::Error;

/// Store-layer error type.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// None of these are retried here; each one is terminal for the current
/// request and reported upward.
#[derive(Debug, Error)]
pub enum Error {
    /// No authenticated identity was supplied to the resolver.
    #[error("authentication required")]
    AuthRequired,
    /// Membership or grant read failed.
    #[error("permission store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
    /// A guard ran before the resolver. Always a programming defect, never
    /// silently defaulted to permit or deny.
    #[error("Permission middleware not initialized. Make sure to use permissionMiddleware first.")]
    NotInitialized,
    /// Capability check failed. The display string is the wire-stable deny
    /// message.
    #[error("Access denied. Required permission: {action} on {resource}")]
    Forbidden {
        /// Resource the capability was required on.
        resource: Resource,
        /// Action that was required.
        action: Action,
    },
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// Invalid resource input.
    #[error("invalid resource: {0}")]
    InvalidResource(String),
    /// Invalid action input.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}
