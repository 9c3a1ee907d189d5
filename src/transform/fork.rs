//! Fork: start a new timeline from an existing node

use crate::error::Result;
use crate::ibgib::{Data, IbGib, Rel8ns, ANCESTOR, DNA, PAST, TJP};
use serde::Serialize;
use serde_json::Value;

use super::dna::{dna_record, TransformType};
use super::{finish, link_into, timestamp, TjpOptions, TransformOptions, TransformResult};

/// Options for [`fork`]
#[derive(Debug, Clone)]
pub struct ForkOptions {
    pub src: IbGib,
    pub dest_ib: String,
    /// Mark the fork as the tjp of the new timeline
    pub tjp: Option<TjpOptions>,
    /// Add a fresh `data.uuid` even without tjp options
    pub uuid: bool,
    pub clone_data: bool,
    pub clone_rel8ns: bool,
    pub common: TransformOptions,
}

impl ForkOptions {
    pub fn new(src: IbGib, dest_ib: impl Into<String>) -> Self {
        Self {
            src,
            dest_ib: dest_ib.into(),
            tjp: None,
            uuid: false,
            clone_data: false,
            clone_rel8ns: false,
            common: TransformOptions::default(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForkDna<'a> {
    dest_ib: &'a str,
    tjp: Option<TjpOptions>,
    uuid: bool,
    clone_data: bool,
    clone_rel8ns: bool,
    lineage: super::Lineage,
}

/// Fork `opts.src` into a new node whose `ancestor` includes the source.
///
/// The new node has no `past`: it begins a timeline. Primitive sources never
/// contribute data or rel8ns.
pub fn fork(opts: &ForkOptions) -> Result<TransformResult> {
    let src = &opts.src;
    let src_addr = src.addr();

    let mut rel8ns = if opts.clone_rel8ns && !src.is_primitive() {
        src.rel8ns.clone().unwrap_or_default()
    } else {
        Rel8ns::new()
    };
    for name in [PAST, TJP, DNA] {
        rel8ns.remove(name);
    }
    rel8ns.insert(
        ANCESTOR.to_string(),
        link_into(src.rel8d(ANCESTOR), src_addr.clone(), opts.common.lineage.ancestor),
    );

    let mut data = if opts.clone_data && !src.is_primitive() {
        src.data.clone().unwrap_or_default()
    } else {
        Data::new()
    };
    for key in ["isTjp", "n", "uuid"] {
        data.remove(key);
    }
    if opts.uuid || opts.tjp.is_some_and(|t| t.uuid) {
        data.insert("uuid".to_string(), Value::from(uuid::Uuid::new_v4().to_string()));
    }
    if let Some(tjp) = opts.tjp {
        if tjp.timestamp {
            data.insert("timestamp".to_string(), Value::from(timestamp()));
        }
        data.insert("isTjp".to_string(), Value::Bool(true));
    }

    let dna = if opts.common.dna {
        Some(dna_record(
            TransformType::Fork,
            &src_addr,
            &ForkDna {
                dest_ib: &opts.dest_ib,
                tjp: opts.tjp,
                uuid: opts.uuid,
                clone_data: opts.clone_data,
                clone_rel8ns: opts.clone_rel8ns,
                lineage: opts.common.lineage,
            },
        )?)
    } else {
        None
    };

    // the new timeline does not inherit the source's dna
    let forked_src = IbGib {
        rel8ns: None,
        ..src.clone()
    };
    let new_ibgib = finish(
        &forked_src,
        opts.dest_ib.clone(),
        data,
        rel8ns,
        &opts.common,
        dna.clone(),
        true,
    )?;
    Ok(TransformResult::single(new_ibgib, dna))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibgib::Address;
    use crate::transform::Lineage;
    use serde_json::json;

    fn comment() -> IbGib {
        let data = json!({"text": "hi", "n": 3}).as_object().cloned().unwrap();
        let rel8ns = Rel8ns::from([
            (PAST.to_string(), vec![Address::new("comment", "OLD").unwrap()]),
            ("tag".to_string(), vec![Address::new("tag home", "T").unwrap()]),
        ]);
        IbGib::new("comment hi", Some(data), Some(rel8ns)).unwrap()
    }

    #[test]
    fn test_fork_primitive_with_tjp() {
        let result = fork(&ForkOptions {
            tjp: Some(TjpOptions::full()),
            common: TransformOptions {
                n_counter: true,
                ..Default::default()
            },
            ..ForkOptions::new(IbGib::primitive("roots"), "roots")
        })
        .unwrap();

        let node = result.new_ibgib;
        assert_eq!(node.ib, "roots");
        assert!(node.is_tjp_flagged());
        assert!(node.data_str("uuid").is_some());
        assert!(node.data_str("timestamp").is_some());
        assert_eq!(node.n_counter(), Some(0));
        assert!(node.rel8ns.as_ref().unwrap().get(PAST).is_none());
        assert_eq!(node.rel8d(ANCESTOR), &[Address::primitive("roots").unwrap()]);
        assert!(result.dnas.is_empty());
    }

    #[test]
    fn test_fork_clones_without_history() {
        let src = comment();
        let result = fork(&ForkOptions {
            clone_data: true,
            clone_rel8ns: true,
            common: TransformOptions {
                no_timestamp: true,
                dna: true,
                lineage: Lineage::linked(),
                ..Default::default()
            },
            ..ForkOptions::new(src.clone(), "comment copy")
        })
        .unwrap();

        let node = result.new_ibgib;
        assert_eq!(node.data_str("text"), Some("hi"));
        assert!(node.n_counter().is_none());
        assert!(node.past().is_empty());
        assert_eq!(node.rel8d("tag").len(), 1);
        assert_eq!(node.rel8d(ANCESTOR), &[src.addr()]);
        assert_eq!(result.dnas.len(), 1);
        assert_eq!(node.rel8d(DNA), &[result.dnas[0].addr()]);
    }

    #[test]
    fn test_fork_without_timestamp_is_deterministic() {
        let opts = ForkOptions {
            common: TransformOptions {
                no_timestamp: true,
                ..Default::default()
            },
            ..ForkOptions::new(IbGib::primitive("x"), "x child")
        };
        assert_eq!(
            fork(&opts).unwrap().new_ibgib.addr(),
            fork(&opts).unwrap().new_ibgib.addr()
        );
    }
}
