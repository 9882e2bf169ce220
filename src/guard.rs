use crate::error::{Error, Result};
use crate::grant::Action;
use crate::resolver::PermissionSet;
use crate::types::Resource;
use std::collections::HashMap;

/// Enforces one capability against a set resolved upstream.
///
/// A pure function of its inputs; no state is retained between
/// invocations. `None` means the resolver never ran, which is a pipeline
/// wiring defect and surfaces as [`Error::NotInitialized`] rather than a
/// default decision in either direction.
pub fn require(set: Option<&PermissionSet>, resource: &Resource, action: Action) -> Result<()> {
    let set = set.ok_or(Error::NotInitialized)?;
    if set.can(resource, action) {
        Ok(())
    } else {
        Err(Error::Forbidden {
            resource: resource.clone(),
            action,
        })
    }
}

/// Evaluates a batch of `(resource, action)` pairs.
///
/// Returns a map keyed `resource:action`. Fails with
/// [`Error::NotInitialized`] under the same condition as [`require`].
pub fn check_multiple(
    set: Option<&PermissionSet>,
    pairs: &[(Resource, Action)],
) -> Result<HashMap<String, bool>> {
    let set = set.ok_or(Error::NotInitialized)?;
    Ok(set.check_many(pairs))
}
