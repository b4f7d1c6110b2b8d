//! Owner references between a connector and its child objects
//!
//! A child carries exactly one controller reference. The garbage collector
//! follows it to delete the child when the connector goes away.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

use geist_common::{Error, Result};

/// Attach a controller owner reference to `child` pointing at `parent`.
///
/// Replaces an existing reference to the same parent. Fails if the parent
/// has no name or uid yet, if the child lives in a different namespace, or
/// if a different object already controls the child.
pub fn set_controller_reference<P>(parent: &P, child: &mut ObjectMeta) -> Result<()>
where
    P: Resource<DynamicType = ()>,
{
    let child_name = child.name.clone().unwrap_or_default();

    let owner_ref = parent
        .controller_owner_ref(&())
        .ok_or_else(|| Error::ownership(&child_name, format!("{} has no name or uid", P::kind(&()))))?;

    if let (Some(parent_ns), Some(child_ns)) =
        (parent.meta().namespace.as_ref(), child.namespace.as_ref())
    {
        if parent_ns != child_ns {
            return Err(Error::ownership(
                &child_name,
                format!("cross-namespace owner reference from {child_ns} to {parent_ns}"),
            ));
        }
    }

    let refs = child.owner_references.get_or_insert_with(Vec::new);

    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(Error::ownership(
            &child_name,
            format!("already controlled by {}/{}", other.kind, other.name),
        ));
    }

    match refs.iter().position(|r| r.uid == owner_ref.uid) {
        Some(idx) => refs[idx] = owner_ref,
        None => refs.push(owner_ref),
    }
    Ok(())
}

/// Returns true if `child` has a controller reference to `parent`
pub fn is_controlled_by<P>(child: &ObjectMeta, parent: &P) -> bool
where
    P: Resource<DynamicType = ()>,
{
    let Some(uid) = parent.meta().uid.as_deref() else {
        return false;
    };
    child
        .owner_references
        .iter()
        .flatten()
        .any(|r| r.controller == Some(true) && r.uid == uid)
}
