//! Transform engine
//!
//! Transforms are the only way to derive new ibgibs from existing ones:
//!
//! - [`fork`] starts a new timeline whose `ancestor` is the source
//! - [`mut8`] changes intrinsic `data` (and optionally the `ib`)
//! - [`rel8`] changes extrinsic `rel8ns`
//!
//! Each returns a [`TransformResult`]. `mut8` and `rel8` put the source on the
//! new node's `past`. When asked, a transform also records a dna node
//! describing itself, bumps the `data.n` counter and stamps `data.timestamp`.

mod dna;
mod fork;
mod mut8;
mod rel8;

pub use dna::TransformType;
pub use fork::{fork, ForkOptions};
pub use mut8::{mut8, Mut8Options};
pub use rel8::{rel8, MultiRel8n, Rel8Options, Rel8nEdit, SingleRel8n};

use crate::error::Result;
use crate::ibgib::{Address, Data, IbGib, Rel8ns, DNA, TJP};
use serde::Serialize;
use serde_json::Value;

/// Output of a single transform
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub new_ibgib: IbGib,
    /// Nodes created along the way, e.g. the fork behind a first generation.
    pub intermediate_ibgibs: Vec<IbGib>,
    pub dnas: Vec<IbGib>,
}

impl TransformResult {
    fn single(new_ibgib: IbGib, dna: Option<IbGib>) -> Self {
        Self {
            new_ibgib,
            intermediate_ibgibs: Vec::new(),
            dnas: dna.into_iter().collect(),
        }
    }
}

/// How a lineage rel8n is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Append the source to the inherited list
    #[default]
    Accumulate,
    /// Keep only the source
    Linked,
}

/// Linkage of the rel8ns transforms manage themselves
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Lineage {
    pub past: Linkage,
    pub ancestor: Linkage,
    pub dna: Linkage,
}

impl Lineage {
    pub fn linked() -> Self {
        Self {
            past: Linkage::Linked,
            ancestor: Linkage::Linked,
            dna: Linkage::Linked,
        }
    }

    /// `past` and `ancestor` linked, `dna` accumulating
    pub fn linked_history() -> Self {
        Self {
            past: Linkage::Linked,
            ancestor: Linkage::Linked,
            dna: Linkage::Accumulate,
        }
    }
}

/// Marks a fork as the temporal junction point of its new timeline
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TjpOptions {
    pub uuid: bool,
    pub timestamp: bool,
}

impl TjpOptions {
    pub fn full() -> Self {
        Self {
            uuid: true,
            timestamp: true,
        }
    }
}

/// Options shared by every transform
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    pub lineage: Lineage,
    pub no_timestamp: bool,
    /// Record a dna node for the transform
    pub dna: bool,
    /// Maintain the monotonic `data.n` counter
    pub n_counter: bool,
}

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `prior + [addr]` when accumulating, `[addr]` when linked
pub(crate) fn link_into(prior: &[Address], addr: Address, linkage: Linkage) -> Vec<Address> {
    match linkage {
        Linkage::Linked => vec![addr],
        Linkage::Accumulate => {
            let mut list = prior.to_vec();
            list.push(addr);
            list
        }
    }
}

/// Successors of a flagged tjp point back at it through `tjp` and are not
/// themselves flagged. A `tjp` rel8n already on the source was cloned along.
pub(crate) fn carry_tjp(src: &IbGib, data: &mut Data, rel8ns: &mut Rel8ns) {
    if src.is_tjp_flagged() {
        data.remove("isTjp");
        rel8ns.insert(TJP.to_string(), vec![src.addr()]);
    }
}

/// Stamp counter and timestamp, attach the dna record and hash the node.
pub(crate) fn finish(
    src: &IbGib,
    ib: String,
    mut data: Data,
    mut rel8ns: Rel8ns,
    opts: &TransformOptions,
    dna_record: Option<IbGib>,
    fresh_timeline: bool,
) -> Result<IbGib> {
    if opts.n_counter {
        let n = if fresh_timeline {
            0
        } else {
            src.n_counter().map_or(0, |n| n + 1)
        };
        data.insert("n".to_string(), Value::from(n));
    }
    if !opts.no_timestamp {
        data.insert("timestamp".to_string(), Value::String(timestamp()));
    }
    if let Some(record) = &dna_record {
        let dnas = link_into(src.rel8d(DNA), record.addr(), opts.lineage.dna);
        rel8ns.insert(DNA.to_string(), dnas);
    }
    rel8ns.retain(|_, addrs| !addrs.is_empty());

    let data = (!data.is_empty()).then_some(data);
    let rel8ns = (!rel8ns.is_empty()).then_some(rel8ns);
    IbGib::new(ib, data, rel8ns)
}

/// Fork `parent` into a new timeline and, if `data` is non-empty, mut8 the
/// fork with it. The fork is returned as an intermediate node.
pub fn first_gen(
    parent: &IbGib,
    ib: impl Into<String>,
    data: Data,
    tjp: Option<TjpOptions>,
    opts: TransformOptions,
) -> Result<TransformResult> {
    let forked = fork(&ForkOptions {
        tjp,
        common: opts.clone(),
        ..ForkOptions::new(parent.clone(), ib)
    })?;
    if data.is_empty() {
        return Ok(forked);
    }

    let mutated = mut8(&Mut8Options {
        data_to_add_or_patch: Some(data),
        common: opts,
        ..Mut8Options::new(forked.new_ibgib.clone())
    })?;

    let mut dnas = forked.dnas;
    dnas.extend(mutated.dnas);
    Ok(TransformResult {
        new_ibgib: mutated.new_ibgib,
        intermediate_ibgibs: vec![forked.new_ibgib],
        dnas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibgib::{ANCESTOR, PAST};
    use serde_json::json;

    #[test]
    fn test_first_gen_links_fork_as_past_and_tjp() {
        let data = json!({"text": "home"}).as_object().cloned().unwrap();
        let result = first_gen(
            &IbGib::primitive("tag"),
            "tag home",
            data,
            Some(TjpOptions::full()),
            TransformOptions {
                lineage: Lineage::linked_history(),
                dna: true,
                n_counter: true,
                ..Default::default()
            },
        )
        .unwrap();

        let forked = &result.intermediate_ibgibs[0];
        let tag = &result.new_ibgib;
        assert!(forked.is_tjp_flagged());
        assert_eq!(forked.rel8d(ANCESTOR), &[IbGib::primitive("tag").addr()]);
        assert_eq!(tag.ib, "tag home");
        assert_eq!(tag.past(), &[forked.addr()]);
        assert_eq!(tag.rel8d(TJP), &[forked.addr()]);
        assert!(!tag.is_tjp_flagged());
        assert_eq!(tag.n_counter(), Some(1));
        assert_eq!(tag.data_str("text"), Some("home"));
        assert_eq!(tag.data_str("uuid"), forked.data_str("uuid"));
        assert_eq!(result.dnas.len(), 2);
        assert_eq!(tag.rel8d(PAST).len(), 1);
    }

    #[test]
    fn test_link_into() {
        let a = Address::new("a", "A").unwrap();
        let b = Address::new("b", "B").unwrap();
        assert_eq!(link_into(&[a.clone()], b.clone(), Linkage::Linked), vec![b.clone()]);
        assert_eq!(link_into(&[a.clone()], b.clone(), Linkage::Accumulate), vec![a, b]);
    }
}
