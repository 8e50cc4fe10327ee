// Tagged-envelope convention: extract the `type` discriminant from a fragment.
use crate::core::error::{Error, ErrorKind};
use crate::core::plan::RawFragment;
use crate::json;

/// Field name carrying the discriminant in a polymorphic envelope.
pub const DISCRIMINANT_KEY: &str = "type";

/// Read the discriminant string out of an envelope fragment.
///
/// Fails with [`ErrorKind::MalformedEnvelope`] when the fragment is not a
/// keyed object, the `type` field is absent, or its value is not a string.
/// Only the discriminant fragment is materialized; every other envelope
/// field stays raw until the concrete type decodes the whole fragment.
pub fn read_discriminant(fragment: &RawFragment) -> Result<String, Error> {
    // The object split rejects arrays and bare scalars outright, which a
    // derived probe struct would not (serde also accepts sequences).
    let entries = json::parse::object_fragments(fragment.get()).map_err(|err| {
        Error::new(ErrorKind::MalformedEnvelope)
            .with_message("envelope is not a keyed object")
            .with_source(err)
    })?;
    let Some(&tag) = entries.get(DISCRIMINANT_KEY) else {
        return Err(Error::new(ErrorKind::MalformedEnvelope)
            .with_message("envelope is missing the `type` field"));
    };
    json::parse::from_fragment::<String>(tag).map_err(|err| {
        Error::new(ErrorKind::MalformedEnvelope)
            .with_message("discriminant field `type` is not a string")
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::read_discriminant;
    use crate::core::error::ErrorKind;
    use crate::core::plan::RawFragment;

    fn fragment(input: &str) -> &RawFragment {
        serde_json::from_str(input).expect("raw fragment")
    }

    #[test]
    fn reads_discriminant_string() {
        let tag = read_discriminant(fragment(r#"{"type": "circle", "r": 2}"#)).expect("tag");
        assert_eq!(tag, "circle");
    }

    #[test]
    fn missing_discriminant_is_malformed() {
        let err = read_discriminant(fragment(r#"{"r": 2}"#)).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
    }

    #[test]
    fn non_string_discriminant_is_malformed() {
        let err = read_discriminant(fragment(r#"{"type": 7}"#)).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
    }

    #[test]
    fn non_object_fragment_is_malformed() {
        let err = read_discriminant(fragment("[1, 2]")).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
        let err = read_discriminant(fragment(r#""circle""#)).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
    }

    #[test]
    fn array_fragment_is_malformed_even_when_element_is_a_string() {
        // An array is never a keyed object, no matter its contents.
        let err = read_discriminant(fragment(r#"["circle"]"#)).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
    }
}
