//! Dependency graph: everything a node (transitively) relates to
//!
//! Walks rel8ns with an explicit work list. The result map doubles as the
//! memo table, so shared and cyclic references are fetched once.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

use crate::error::{GibError, Result};
use crate::ibgib::{Address, IbGib};
use crate::persist::get_from_space;
use crate::space::Space;

/// Address → node for every node reachable from the source, source included
pub type DependencyGraph = BTreeMap<Address, IbGib>;

/// Starting point of a walk
#[derive(Debug, Clone, Copy)]
pub enum GraphSource<'a> {
    IbGib(&'a IbGib),
    Addr(&'a Address),
}

impl<'a> From<&'a IbGib> for GraphSource<'a> {
    fn from(ibgib: &'a IbGib) -> Self {
        GraphSource::IbGib(ibgib)
    }
}

impl<'a> From<&'a Address> for GraphSource<'a> {
    fn from(addr: &'a Address) -> Self {
        GraphSource::Addr(addr)
    }
}

/// Collect the dependency closure of `source`, ignoring rel8ns named in
/// `skip_rel8n_names`. Primitives terminate branches and are not included.
#[instrument(skip_all)]
pub async fn get_dependency_graph<'a>(
    space: &dyn Space,
    source: impl Into<GraphSource<'a>>,
    skip_rel8n_names: &[&str],
) -> Result<DependencyGraph> {
    let root = match source.into() {
        GraphSource::IbGib(ibgib) => ibgib.clone(),
        GraphSource::Addr(addr) => {
            if addr.is_primitive() {
                return Err(GibError::PrimitiveRoot(addr.clone()));
            }
            get_from_space(space, addr, None).await?
        }
    };
    if root.is_primitive() {
        return Err(GibError::PrimitiveRoot(root.addr()));
    }

    let root_addr = root.addr();
    let mut graph = DependencyGraph::new();
    graph.insert(root_addr.clone(), root);
    let mut to_expand = vec![root_addr];

    while let Some(addr) = to_expand.pop() {
        let pending: BTreeSet<Address> = match graph.get(&addr).and_then(|n| n.rel8ns.as_ref()) {
            Some(rel8ns) => rel8ns
                .iter()
                .filter(|(name, _)| !skip_rel8n_names.contains(&name.as_str()))
                .flat_map(|(_, addrs)| addrs.iter())
                .filter(|a| !a.is_primitive() && !graph.contains_key(*a))
                .cloned()
                .collect(),
            None => continue,
        };
        if pending.is_empty() {
            continue;
        }

        let pending: Vec<Address> = pending.into_iter().collect();
        let fetched = space.get(&pending, None).await?;
        for (dep_addr, dep) in pending.into_iter().zip(fetched) {
            graph.insert(dep_addr.clone(), dep);
            to_expand.push(dep_addr);
        }
    }

    debug!(size = graph.len(), "Dependency graph collected");
    Ok(graph)
}
