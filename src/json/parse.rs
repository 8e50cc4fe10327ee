//! Purpose: Provide the internal fragment split and decode entrypoints.
//! Exports: `object_fragments`, `array_fragments`, `from_fragment`.
//! Role: Parser boundary that centralizes serde_json usage details.
//! Invariants: Fragments borrow the input buffer; nothing is re-serialized.
//! Notes: Error mapping is done by callsites so domain context stays explicit.

use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::HashMap;

/// Split a keyed object into per-key raw fragments. Duplicate keys resolve
/// last-occurrence-wins through the map insert.
pub(crate) fn object_fragments(
    input: &str,
) -> Result<HashMap<String, &RawValue>, serde_json::Error> {
    serde_json::from_str(input)
}

/// Split an array fragment into ordered element fragments.
pub(crate) fn array_fragments(fragment: &RawValue) -> Result<Vec<&RawValue>, serde_json::Error> {
    serde_json::from_str(fragment.get())
}

/// Decode one fragment into a concretely typed value.
pub(crate) fn from_fragment<'de, T: Deserialize<'de>>(
    fragment: &'de RawValue,
) -> Result<T, serde_json::Error> {
    serde_json::from_str(fragment.get())
}

#[cfg(test)]
mod tests {
    use super::{array_fragments, from_fragment, object_fragments};

    #[test]
    fn object_split_preserves_raw_text() {
        let fragments = object_fragments(r#"{"a": {"nested": true}, "b": [1, 2]}"#).expect("split");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments["a"].get(), r#"{"nested": true}"#);
        assert_eq!(fragments["b"].get(), "[1, 2]");
    }

    #[test]
    fn object_split_rejects_non_objects() {
        assert!(object_fragments("[1, 2]").is_err());
        assert!(object_fragments("42").is_err());
        assert!(object_fragments("not json").is_err());
    }

    #[test]
    fn object_split_duplicate_keys_last_wins() {
        let fragments = object_fragments(r#"{"a": 1, "a": 2}"#).expect("split");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments["a"].get(), "2");
    }

    #[test]
    fn array_split_is_ordered() {
        let outer = object_fragments(r#"{"xs": [1, "two", {"three": 3}]}"#).expect("split");
        let elements = array_fragments(outer["xs"]).expect("array");
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].get(), "1");
        assert_eq!(elements[1].get(), r#""two""#);
        assert_eq!(elements[2].get(), r#"{"three": 3}"#);
    }

    #[test]
    fn fragment_decodes_into_typed_value() {
        let outer = object_fragments(r#"{"n": 7}"#).expect("split");
        let n: u32 = from_fragment(outer["n"]).expect("decode");
        assert_eq!(n, 7);
    }
}
