//! Dna records: the transform that produced a node, as a node of its own

use crate::error::Result;
use crate::ibgib::{Address, Data, IbGib, Rel8ns, ANCESTOR};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformType {
    Fork,
    Mut8,
    Rel8,
}

impl TransformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformType::Fork => "fork",
            TransformType::Mut8 => "mut8",
            TransformType::Rel8 => "rel8",
        }
    }
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the dna node for a transform. `options` must serialize to an object
/// and must not carry timestamps, so identical transforms share a dna address.
pub(crate) fn dna_record(
    transform_type: TransformType,
    src_addr: &Address,
    options: &impl Serialize,
) -> Result<IbGib> {
    let mut data = Data::new();
    if let Value::Object(fields) = serde_json::to_value(options)? {
        data.extend(fields);
    }
    data.insert("type".to_string(), Value::from(transform_type.as_str()));
    data.insert("srcAddr".to_string(), Value::from(src_addr.to_string()));

    let rel8ns = Rel8ns::from([(
        ANCESTOR.to_string(),
        vec![Address::primitive(transform_type.as_str())?],
    )]);
    IbGib::new(transform_type.as_str(), Some(data), Some(rel8ns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dna_is_deterministic() {
        let src = Address::new("comment a", "ABC").unwrap();
        let opts = json!({"dataToRemove": ["x"]});
        let a = dna_record(TransformType::Mut8, &src, &opts).unwrap();
        let b = dna_record(TransformType::Mut8, &src, &opts).unwrap();
        assert_eq!(a.addr(), b.addr());
        assert_eq!(a.ib, "mut8");
        assert_eq!(a.data_str("srcAddr"), Some("comment a^ABC"));
        assert_eq!(a.rel8d(ANCESTOR), &[Address::primitive("mut8").unwrap()]);
    }
}
