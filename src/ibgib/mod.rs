//! The ibgib node model
//!
//! An ibgib is an immutable record `{ ib, gib, data, rel8ns }`:
//!
//! - `ib` is a human-ish label and is not unique on its own
//! - `data` holds intrinsic content
//! - `rel8ns` holds named, ordered lists of addresses to other ibgibs
//! - `gib` is the content hash over the other three
//!
//! Nodes are never mutated in place. Every change goes through a transform
//! (see [`crate::transform`]) which produces a new node with a new address.

mod address;
mod gib;

pub use address::{Address, IBGIB_DELIMITER};
pub use gib::compute_gib;

use crate::error::{GibError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder gib carried by primitives
pub const GIB: &str = "gib";

/// Ordered predecessors on a timeline
pub const PAST: &str = "past";
/// Nodes this one was forked from
pub const ANCESTOR: &str = "ancestor";
/// Temporal junction point of the timeline
pub const TJP: &str = "tjp";
/// Transform records that produced this node
pub const DNA: &str = "dna";

/// Rel8n names that only transforms may write
pub const FORBIDDEN_REL8N_NAMES: &[&str] = &[PAST, ANCESTOR, DNA];

/// Intrinsic content of a node
pub type Data = serde_json::Map<String, Value>;

/// Named relations. A `BTreeMap` keeps serialization, and therefore the gib,
/// independent of insertion order.
pub type Rel8ns = BTreeMap<String, Vec<Address>>;

/// An immutable, content-addressed graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IbGib {
    pub ib: String,
    pub gib: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel8ns: Option<Rel8ns>,
}

impl IbGib {
    /// A primitive: bare `ib` with the placeholder gib and no content.
    pub fn primitive(ib: impl Into<String>) -> Self {
        Self {
            ib: ib.into(),
            gib: GIB.to_string(),
            data: None,
            rel8ns: None,
        }
    }

    /// Build a node and compute its gib.
    pub fn new(ib: impl Into<String>, data: Option<Data>, rel8ns: Option<Rel8ns>) -> Result<Self> {
        let ib = ib.into();
        validate_ib(&ib)?;
        let gib = compute_gib(&ib, data.as_ref(), rel8ns.as_ref())?;
        Ok(Self { ib, gib, data, rel8ns })
    }

    pub fn addr(&self) -> Address {
        Address::from_parts(&self.ib, &self.gib)
    }

    pub fn is_primitive(&self) -> bool {
        self.gib.is_empty() || self.gib == GIB
    }

    /// Addresses under `name`, empty when the rel8n is absent.
    pub fn rel8d(&self, name: &str) -> &[Address] {
        self.rel8ns
            .as_ref()
            .and_then(|r| r.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn past(&self) -> &[Address] {
        self.rel8d(PAST)
    }

    /// Monotonic timeline counter `data.n`, when present as a non-negative integer.
    pub fn n_counter(&self) -> Option<u64> {
        self.data.as_ref()?.get("n")?.as_u64()
    }

    /// Whether `data.isTjp` is set.
    pub fn is_tjp_flagged(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get("isTjp"))
            .is_some_and(is_truthy)
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }

    /// Check the gib against the content. Primitives always pass.
    pub fn validate(&self) -> Result<()> {
        validate_ib(&self.ib)?;
        if self.is_primitive() {
            return Ok(());
        }
        let expected = compute_gib(&self.ib, self.data.as_ref(), self.rel8ns.as_ref())?;
        if expected != self.gib {
            return Err(GibError::InvalidAddress(format!(
                "gib mismatch for {}: expected {}",
                self.addr(),
                expected
            )));
        }
        Ok(())
    }

    /// Recompute the gib after the content changed.
    pub(crate) fn regib(mut self) -> Result<Self> {
        self.gib = compute_gib(&self.ib, self.data.as_ref(), self.rel8ns.as_ref())?;
        Ok(self)
    }

    /// Copy of this node with `past` emptied and the gib recomputed.
    pub fn sever_past(mut self) -> Result<Self> {
        self.rel8ns.get_or_insert_with(Rel8ns::new).insert(PAST.to_string(), Vec::new());
        self.regib()
    }
}

fn validate_ib(ib: &str) -> Result<()> {
    if ib.is_empty() {
        return Err(GibError::InvalidAddress("ib is empty".to_string()));
    }
    if ib.contains(IBGIB_DELIMITER) {
        return Err(GibError::InvalidAddress(format!(
            "ib '{}' contains the {} delimiter",
            ib, IBGIB_DELIMITER
        )));
    }
    Ok(())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Data {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_identical_content_identical_address() {
        let rel8ns = Rel8ns::from([(
            ANCESTOR.to_string(),
            vec![Address::primitive("comment").unwrap()],
        )]);
        let a = IbGib::new("comment hi", Some(data(json!({"text": "hi"}))), Some(rel8ns.clone())).unwrap();
        let b = IbGib::new("comment hi", Some(data(json!({"text": "hi"}))), Some(rel8ns)).unwrap();
        assert_eq!(a.addr(), b.addr());

        let c = IbGib::new("comment hi", Some(data(json!({"text": "hey"}))), None).unwrap();
        assert_ne!(a.addr(), c.addr());
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let mut first = Data::new();
        first.insert("a".into(), json!(1));
        first.insert("b".into(), json!(2));
        let mut second = Data::new();
        second.insert("b".into(), json!(2));
        second.insert("a".into(), json!(1));
        let x = IbGib::new("x", Some(first), None).unwrap();
        let y = IbGib::new("x", Some(second), None).unwrap();
        assert_eq!(x.gib, y.gib);
    }

    #[test]
    fn test_counter_requires_non_negative_integer() {
        let n = |v: Value| IbGib::new("x", Some(data(json!({ "n": v }))), None).unwrap().n_counter();
        assert_eq!(n(json!(0)), Some(0));
        assert_eq!(n(json!(4)), Some(4));
        assert_eq!(n(json!(-1)), None);
        assert_eq!(n(json!("3")), None);
    }

    #[test]
    fn test_validate_detects_tampering() {
        let mut node = IbGib::new("x", Some(data(json!({"k": "v"}))), None).unwrap();
        assert!(node.validate().is_ok());
        node.data = Some(data(json!({"k": "other"})));
        assert!(node.validate().is_err());
        assert!(IbGib::primitive("tag").validate().is_ok());
    }

    #[test]
    fn test_sever_past() {
        let rel8ns = Rel8ns::from([(PAST.to_string(), vec![Address::new("x", "ABC").unwrap()])]);
        let node = IbGib::new("x", None, Some(rel8ns)).unwrap();
        let severed = node.clone().sever_past().unwrap();
        assert!(severed.past().is_empty());
        assert_ne!(severed.gib, node.gib);
        assert!(severed.validate().is_ok());
    }

    #[test]
    fn test_serde_skips_missing_fields() {
        let json = serde_json::to_value(IbGib::primitive("tag")).unwrap();
        assert_eq!(json, json!({"ib": "tag", "gib": "gib"}));
    }
}
