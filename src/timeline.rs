//! Temporal junction points
//!
//! The tjp is the first node of a timeline; its address names the timeline.
//! Later nodes reach it either directly through a `tjp` rel8n or by walking
//! `past`.

use std::collections::HashSet;
use tracing::warn;

use crate::error::{GibError, Result};
use crate::ibgib::{IbGib, PAST, TJP};
use crate::persist::get_from_space;
use crate::space::Space;

/// Whether `ibgib` is its own timeline's tjp: `data.isTjp` is set, or `past`
/// is present and empty.
pub fn is_tjp(ibgib: &IbGib) -> Result<bool> {
    if ibgib.is_tjp_flagged() {
        return Ok(true);
    }
    let Some(rel8ns) = ibgib.rel8ns.as_ref() else {
        return Err(GibError::MissingRelations(ibgib.addr()));
    };
    Ok(rel8ns.get(PAST).is_some_and(Vec::is_empty))
}

/// Resolve the tjp of `ibgib`'s timeline.
///
/// A node with no past, no tjp flag and no `tjp` rel8n cannot be resolved; that
/// is logged and the node itself is returned.
pub async fn get_tjp(space: &dyn Space, ibgib: &IbGib) -> Result<IbGib> {
    let mut current = ibgib.clone();
    let mut visited = HashSet::new();

    loop {
        if current.is_primitive() || is_tjp(&current)? {
            return Ok(current);
        }
        if let Some(tjp_addr) = current.rel8d(TJP).first() {
            return get_from_space(space, tjp_addr, None).await;
        }

        let Some(prev) = current.past().last().cloned() else {
            warn!(error = %GibError::NoPast(current.addr()), start = %ibgib.addr(), "Falling back to the node itself as tjp");
            return Ok(ibgib.clone());
        };
        if !visited.insert(prev.clone()) {
            return Err(GibError::AmbiguousTimeline(format!(
                "past of {} loops back to {}",
                ibgib.addr(),
                prev
            )));
        }
        current = get_from_space(space, &prev, None).await?;
    }
}
