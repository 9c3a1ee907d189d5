//! Rel8: extrinsic change to a node's rel8ns
//!
//! Relation edits come in two flavors. A [`SingleRel8n`] replaces whatever the
//! rel8n held (a "linked" rel8n, always exactly one address). A [`MultiRel8n`]
//! appends the addresses that are not already present.

use crate::error::{GibError, Result};
use crate::ibgib::{Address, IbGib, FORBIDDEN_REL8N_NAMES, PAST};
use serde::Serialize;
use std::collections::BTreeMap;

use super::dna::{dna_record, TransformType};
use super::{carry_tjp, finish, link_into, TransformOptions, TransformResult};

/// Replace-on-write relation: afterwards `name` holds exactly `addr`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleRel8n {
    pub name: String,
    pub addr: Address,
}

/// Append-on-write relation: `addrs` not yet present are appended in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiRel8n {
    pub name: String,
    pub addrs: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Rel8nEdit {
    Single(SingleRel8n),
    Multi(MultiRel8n),
}

impl Rel8nEdit {
    pub fn single(name: impl Into<String>, addr: Address) -> Self {
        Rel8nEdit::Single(SingleRel8n {
            name: name.into(),
            addr,
        })
    }

    pub fn multi(name: impl Into<String>, addrs: Vec<Address>) -> Self {
        Rel8nEdit::Multi(MultiRel8n {
            name: name.into(),
            addrs,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Rel8nEdit::Single(s) => &s.name,
            Rel8nEdit::Multi(m) => &m.name,
        }
    }
}

/// Options for [`rel8`]. Removals apply before additions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rel8Options {
    #[serde(skip)]
    pub src: IbGib,
    pub add: Vec<Rel8nEdit>,
    pub remove: BTreeMap<String, Vec<Address>>,
    #[serde(skip)]
    pub common: TransformOptions,
}

impl Rel8Options {
    pub fn new(src: IbGib) -> Self {
        Self {
            src,
            add: Vec::new(),
            remove: BTreeMap::new(),
            common: TransformOptions::default(),
        }
    }
}

fn check_name(name: &str, src: &Address) -> Result<()> {
    if name.is_empty() || FORBIDDEN_REL8N_NAMES.contains(&name) {
        return Err(GibError::Transform(format!(
            "rel8n '{}' cannot be edited directly on {}",
            name, src
        )));
    }
    Ok(())
}

/// Relate (or unrelate) `opts.src` to other ibgibs.
pub fn rel8(opts: &Rel8Options) -> Result<TransformResult> {
    let src = &opts.src;
    let src_addr = src.addr();
    if src.is_primitive() {
        return Err(GibError::PrimitiveRoot(src_addr));
    }
    if opts.add.is_empty() && opts.remove.values().all(Vec::is_empty) {
        return Err(GibError::Transform(format!("rel8 of {} changes nothing", src_addr)));
    }
    for name in opts.add.iter().map(Rel8nEdit::name).chain(opts.remove.keys().map(String::as_str)) {
        check_name(name, &src_addr)?;
    }

    let mut rel8ns = src.rel8ns.clone().unwrap_or_default();

    for (name, to_remove) in &opts.remove {
        if let Some(existing) = rel8ns.get_mut(name) {
            existing.retain(|addr| !to_remove.contains(addr));
            if existing.is_empty() {
                rel8ns.remove(name);
            }
        }
    }

    for edit in &opts.add {
        match edit {
            Rel8nEdit::Single(single) => {
                rel8ns.insert(single.name.clone(), vec![single.addr.clone()]);
            }
            Rel8nEdit::Multi(multi) => {
                let existing = rel8ns.entry(multi.name.clone()).or_default();
                for addr in &multi.addrs {
                    if !existing.contains(addr) {
                        existing.push(addr.clone());
                    }
                }
            }
        }
    }

    rel8ns.insert(
        PAST.to_string(),
        link_into(src.past(), src_addr.clone(), opts.common.lineage.past),
    );
    let mut data = src.data.clone().unwrap_or_default();
    carry_tjp(src, &mut data, &mut rel8ns);

    let dna = if opts.common.dna {
        Some(dna_record(TransformType::Rel8, &src_addr, opts)?)
    } else {
        None
    };

    let new_ibgib = finish(src, src.ib.clone(), data, rel8ns, &opts.common, dna.clone(), false)?;
    Ok(TransformResult::single(new_ibgib, dna))
}
