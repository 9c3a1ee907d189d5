//! Mut8: intrinsic change to a node's data

use crate::error::{GibError, Result};
use crate::ibgib::{Data, IbGib, PAST};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::dna::{dna_record, TransformType};
use super::{carry_tjp, finish, link_into, TransformOptions, TransformResult};

/// Options for [`mut8`]. Removals apply first, then renames, then the patch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mut8Options {
    #[serde(skip)]
    pub src: IbGib,
    /// Deep-merged into the source data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_to_add_or_patch: Option<Data>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_to_remove: Vec<String>,
    /// old key -> new key
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data_to_rename: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mut8_ib: Option<String>,
    #[serde(skip)]
    pub common: TransformOptions,
}

impl Mut8Options {
    pub fn new(src: IbGib) -> Self {
        Self {
            src,
            data_to_add_or_patch: None,
            data_to_remove: Vec::new(),
            data_to_rename: BTreeMap::new(),
            mut8_ib: None,
            common: TransformOptions::default(),
        }
    }

    fn is_noop(&self) -> bool {
        self.data_to_add_or_patch.as_ref().map_or(true, Data::is_empty)
            && self.data_to_remove.is_empty()
            && self.data_to_rename.is_empty()
            && self.mut8_ib.is_none()
    }
}

fn patch(target: &mut Data, changes: &Data) {
    for (key, value) in changes {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => patch(existing, incoming),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Mutate the data (and optionally the ib) of `opts.src`.
pub fn mut8(opts: &Mut8Options) -> Result<TransformResult> {
    let src = &opts.src;
    let src_addr = src.addr();
    if src.is_primitive() {
        return Err(GibError::PrimitiveRoot(src_addr));
    }
    if opts.is_noop() {
        return Err(GibError::Transform(format!("mut8 of {} changes nothing", src_addr)));
    }

    let mut data = src.data.clone().unwrap_or_default();
    for key in &opts.data_to_remove {
        data.remove(key);
    }
    for (old, new) in &opts.data_to_rename {
        let value = data.remove(old).ok_or_else(|| {
            GibError::Transform(format!("cannot rename missing key '{}' on {}", old, src_addr))
        })?;
        data.insert(new.clone(), value);
    }
    if let Some(changes) = &opts.data_to_add_or_patch {
        patch(&mut data, changes);
    }

    let mut rel8ns = src.rel8ns.clone().unwrap_or_default();
    rel8ns.insert(
        PAST.to_string(),
        link_into(src.past(), src_addr.clone(), opts.common.lineage.past),
    );
    carry_tjp(src, &mut data, &mut rel8ns);

    let dna = if opts.common.dna {
        Some(dna_record(TransformType::Mut8, &src_addr, opts)?)
    } else {
        None
    };

    let ib = opts.mut8_ib.clone().unwrap_or_else(|| src.ib.clone());
    let new_ibgib = finish(src, ib, data, rel8ns, &opts.common, dna.clone(), false)?;
    Ok(TransformResult::single(new_ibgib, dna))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibgib::{Rel8ns, ANCESTOR};
    use crate::transform::Linkage;
    use serde_json::json;

    fn note() -> IbGib {
        let data = json!({"text": "a", "meta": {"color": "red", "size": 1}, "n": 2})
            .as_object()
            .cloned()
            .unwrap();
        let rel8ns = Rel8ns::from([(ANCESTOR.to_string(), vec![IbGib::primitive("note").addr()])]);
        IbGib::new("note", Some(data), Some(rel8ns)).unwrap()
    }

    #[test]
    fn test_mut8_patches_removes_renames() {
        let src = note();
        let result = mut8(&Mut8Options {
            data_to_add_or_patch: Some(json!({"meta": {"color": "blue"}}).as_object().cloned().unwrap()),
            data_to_rename: BTreeMap::from([("text".to_string(), "body".to_string())]),
            common: TransformOptions {
                n_counter: true,
                no_timestamp: true,
                ..Default::default()
            },
            ..Mut8Options::new(src.clone())
        })
        .unwrap();

        let node = result.new_ibgib;
        let data = node.data.as_ref().unwrap();
        assert_eq!(data["body"], json!("a"));
        assert!(data.get("text").is_none());
        assert_eq!(data["meta"], json!({"color": "blue", "size": 1}));
        assert_eq!(node.n_counter(), Some(3));
        assert_eq!(node.past(), &[src.addr()]);
    }

    #[test]
    fn test_mut8_accumulates_past_unless_linked() {
        let first = mut8(&Mut8Options {
            data_to_remove: vec!["meta".into()],
            ..Mut8Options::new(note())
        })
        .unwrap()
        .new_ibgib;
        let second = mut8(&Mut8Options {
            mut8_ib: Some("note renamed".into()),
            ..Mut8Options::new(first.clone())
        })
        .unwrap()
        .new_ibgib;
        assert_eq!(second.past().len(), 2);
        assert_eq!(second.ib, "note renamed");

        let mut linked = Mut8Options::new(first.clone());
        linked.mut8_ib = Some("note linked".into());
        linked.common.lineage.past = Linkage::Linked;
        let third = mut8(&linked).unwrap().new_ibgib;
        assert_eq!(third.past(), &[first.addr()]);
    }

    #[test]
    fn test_mut8_rejects_primitive_and_noop() {
        let err = mut8(&Mut8Options {
            data_to_remove: vec!["x".into()],
            ..Mut8Options::new(IbGib::primitive("note"))
        })
        .unwrap_err();
        assert!(matches!(err, GibError::PrimitiveRoot(_)));
        assert!(matches!(
            mut8(&Mut8Options::new(note())).unwrap_err(),
            GibError::Transform(_)
        ));
    }
}
