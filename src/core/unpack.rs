//! Purpose: The recursive unpack engine and its per-type decode plans.
//! Exports: `Unpack`, `FieldMap`/`FieldBinding`/`FieldSlot`, `decode_plain`,
//! `decode_tagged` (+ fragment-level variants), and the impl macros.
//! Role: Orchestrates decoding raw fragments into statically typed slots,
//! recursing through sequences and maps and consulting the registry for
//! polymorphic slots.
//! Invariants: The plan for a slot depends only on its static type, never on
//! the input data.
//! Invariants: Destinations mutate field-by-field; fields decoded before a
//! failure keep their values, and the error is surfaced unchanged.

use crate::core::error::{Error, ErrorKind};
use crate::core::plan::{FieldPlan, RawFragment};
use crate::core::registry::TypeRegistry;
use crate::json;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

/// A per-type decode plan: how one slot of this static type is populated
/// from a raw fragment.
///
/// `unpack` is the tagged (registry-aware) strategy; `direct` is the plain
/// strategy that never touches the registry. Implementations come from:
///
/// - [`unpack_scalar!`](crate::unpack_scalar) for serde-decodable types
///   (provided in-crate for primitives, `String`, and `serde_json::Value`);
/// - [`unpack_struct!`](crate::unpack_struct) for [`FieldMap`] structs,
///   which routes nested fields through their own tag namespaces;
/// - [`unpack_capability!`](crate::unpack_capability) for `Box<dyn Trait>`
///   polymorphic slots;
/// - blanket impls below for `Option<T>`, `Vec<T>`, and `HashMap<K, V>`.
pub trait Unpack: Sized {
    /// The decode strategy for this type. Pure: same plan on every call.
    fn plan() -> FieldPlan;

    /// Decode a fragment with polymorphic resolution available.
    fn unpack(fragment: &RawFragment, registry: &TypeRegistry) -> Result<Self, Error>;

    /// Decode a fragment directly, without a registry.
    fn direct(fragment: &RawFragment) -> Result<Self, Error>;
}

/// Decode one fragment into a serde-decodable value, mapping the parser
/// error into the engine's taxonomy. Backs [`unpack_scalar!`](crate::unpack_scalar).
pub fn scalar_from_fragment<T: DeserializeOwned>(fragment: &RawFragment) -> Result<T, Error> {
    json::parse::from_fragment(fragment).map_err(|err| {
        Error::new(ErrorKind::MalformedInput)
            .with_message("fragment does not decode into the field's type")
            .with_source(err)
    })
}

/// Implement [`Unpack`] for types that decode directly through serde
/// (plan: `Scalar`). The type must implement `serde::de::DeserializeOwned`.
#[macro_export]
macro_rules! unpack_scalar {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::core::unpack::Unpack for $ty {
            fn plan() -> $crate::core::plan::FieldPlan {
                $crate::core::plan::FieldPlan::Scalar
            }

            fn unpack(
                fragment: &$crate::core::plan::RawFragment,
                _registry: &$crate::core::registry::TypeRegistry,
            ) -> ::std::result::Result<Self, $crate::core::error::Error> {
                $crate::core::unpack::scalar_from_fragment(fragment)
            }

            fn direct(
                fragment: &$crate::core::plan::RawFragment,
            ) -> ::std::result::Result<Self, $crate::core::error::Error> {
                $crate::core::unpack::scalar_from_fragment(fragment)
            }
        }
    )+};
}

/// Implement [`Unpack`] for a [`FieldMap`] struct (plan: `Scalar`). The
/// tagged strategy runs the struct's own tagged field table, so nested
/// polymorphic slots keep working at any depth; the plain strategy runs the
/// plain table. Requires `Default`.
#[macro_export]
macro_rules! unpack_struct {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::core::unpack::Unpack for $ty {
            fn plan() -> $crate::core::plan::FieldPlan {
                $crate::core::plan::FieldPlan::Scalar
            }

            fn unpack(
                fragment: &$crate::core::plan::RawFragment,
                registry: &$crate::core::registry::TypeRegistry,
            ) -> ::std::result::Result<Self, $crate::core::error::Error> {
                let mut value = <$ty as ::std::default::Default>::default();
                $crate::core::unpack::decode_tagged_fragment(fragment, registry, &mut value)?;
                ::std::result::Result::Ok(value)
            }

            fn direct(
                fragment: &$crate::core::plan::RawFragment,
            ) -> ::std::result::Result<Self, $crate::core::error::Error> {
                let mut value = <$ty as ::std::default::Default>::default();
                $crate::core::unpack::decode_plain_fragment(fragment, &mut value)?;
                ::std::result::Result::Ok(value)
            }
        }
    )+};
}

/// Implement [`Unpack`] for `Box<dyn Trait>` (plan: `Polymorphic`). The
/// tagged strategy resolves the fragment's `type` discriminant through the
/// registry; the plain strategy fails, since a polymorphic slot cannot be
/// decoded without one.
#[macro_export]
macro_rules! unpack_capability {
    ($($trait_:path),+ $(,)?) => {$(
        impl $crate::core::unpack::Unpack for ::std::boxed::Box<dyn $trait_> {
            fn plan() -> $crate::core::plan::FieldPlan {
                $crate::core::plan::FieldPlan::Polymorphic
            }

            fn unpack(
                fragment: &$crate::core::plan::RawFragment,
                registry: &$crate::core::registry::TypeRegistry,
            ) -> ::std::result::Result<Self, $crate::core::error::Error> {
                registry.resolve::<dyn $trait_>(fragment)
            }

            fn direct(
                _fragment: &$crate::core::plan::RawFragment,
            ) -> ::std::result::Result<Self, $crate::core::error::Error> {
                ::std::result::Result::Err(
                    $crate::core::error::Error::new(
                        $crate::core::error::ErrorKind::CapabilityMismatch,
                    )
                    .with_message(concat!(
                        "polymorphic slot ",
                        stringify!($trait_),
                        " requires the tagged decoder",
                    )),
                )
            }
        }
    )+};
}

unpack_scalar!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64, String, serde_json::Value,
);

// Option is transparent: the wrapper exists so destinations have a zero
// value (absent key stays None); the strategy is the inner type's.
impl<T: Unpack> Unpack for Option<T> {
    fn plan() -> FieldPlan {
        T::plan()
    }

    fn unpack(fragment: &RawFragment, registry: &TypeRegistry) -> Result<Self, Error> {
        T::unpack(fragment, registry).map(Some)
    }

    fn direct(fragment: &RawFragment) -> Result<Self, Error> {
        T::direct(fragment).map(Some)
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn plan() -> FieldPlan {
        FieldPlan::Sequence(Box::new(T::plan()))
    }

    fn unpack(fragment: &RawFragment, registry: &TypeRegistry) -> Result<Self, Error> {
        let elements = split_sequence(fragment)?;
        let mut out = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let value = T::unpack(element, registry)
                .map_err(|err| err.with_key_segment(&format!("[{index}]")))?;
            out.push(value);
        }
        Ok(out)
    }

    fn direct(fragment: &RawFragment) -> Result<Self, Error> {
        let elements = split_sequence(fragment)?;
        let mut out = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let value =
                T::direct(element).map_err(|err| err.with_key_segment(&format!("[{index}]")))?;
            out.push(value);
        }
        Ok(out)
    }
}

impl<K, V> Unpack for HashMap<K, V>
where
    K: FromStr + Eq + Hash,
    K::Err: std::fmt::Display,
    V: Unpack,
{
    fn plan() -> FieldPlan {
        FieldPlan::Associative {
            key: std::any::type_name::<K>(),
            element: Box::new(V::plan()),
        }
    }

    fn unpack(fragment: &RawFragment, registry: &TypeRegistry) -> Result<Self, Error> {
        let entries = split_associative(fragment)?;
        let mut out = HashMap::with_capacity(entries.len());
        for (raw_key, value_fragment) in entries {
            let key = parse_key::<K>(&raw_key)?;
            let value = V::unpack(value_fragment, registry)
                .map_err(|err| err.with_key_segment(&raw_key))?;
            out.insert(key, value);
        }
        Ok(out)
    }

    fn direct(fragment: &RawFragment) -> Result<Self, Error> {
        let entries = split_associative(fragment)?;
        let mut out = HashMap::with_capacity(entries.len());
        for (raw_key, value_fragment) in entries {
            let key = parse_key::<K>(&raw_key)?;
            let value =
                V::direct(value_fragment).map_err(|err| err.with_key_segment(&raw_key))?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

fn split_sequence(fragment: &RawFragment) -> Result<Vec<&RawFragment>, Error> {
    json::parse::array_fragments(fragment).map_err(|err| {
        Error::new(ErrorKind::MalformedInput)
            .with_message("fragment is not an array")
            .with_source(err)
    })
}

fn split_associative(fragment: &RawFragment) -> Result<HashMap<String, &RawFragment>, Error> {
    json::parse::object_fragments(fragment.get()).map_err(|err| {
        Error::new(ErrorKind::MalformedInput)
            .with_message("fragment is not a keyed object")
            .with_source(err)
    })
}

fn parse_key<K: FromStr>(raw_key: &str) -> Result<K, Error>
where
    K::Err: std::fmt::Display,
{
    raw_key.parse::<K>().map_err(|err| {
        Error::new(ErrorKind::KeyDecode)
            .with_message(format!(
                "cannot parse key into {}: {err}",
                std::any::type_name::<K>()
            ))
            .with_key_segment(raw_key)
    })
}

/// One field of a destination struct: its key in each tag namespace plus a
/// mutable slot. A field participates in an entry point only when it has a
/// key in that namespace.
pub struct FieldBinding<'a> {
    plain_key: Option<&'static str>,
    tagged_key: Option<&'static str>,
    slot: &'a mut dyn FieldSlot,
}

impl<'a> FieldBinding<'a> {
    pub fn new(slot: &'a mut dyn FieldSlot) -> Self {
        Self {
            plain_key: None,
            tagged_key: None,
            slot,
        }
    }

    /// Key in the plain namespace, used by [`decode_plain`].
    pub fn plain(mut self, key: &'static str) -> Self {
        self.plain_key = Some(key);
        self
    }

    /// Key in the tagged namespace, used by [`decode_tagged`].
    pub fn tagged(mut self, key: &'static str) -> Self {
        self.tagged_key = Some(key);
        self
    }
}

/// Object-safe face of [`Unpack`] so field tables can hold slots of mixed
/// types. Blanket-implemented for every `Unpack` type.
pub trait FieldSlot {
    fn plan(&self) -> FieldPlan;
    fn assign_direct(&mut self, fragment: &RawFragment) -> Result<(), Error>;
    fn assign_tagged(&mut self, fragment: &RawFragment, registry: &TypeRegistry)
        -> Result<(), Error>;
}

impl<T: Unpack> FieldSlot for T {
    fn plan(&self) -> FieldPlan {
        T::plan()
    }

    fn assign_direct(&mut self, fragment: &RawFragment) -> Result<(), Error> {
        *self = T::direct(fragment)?;
        Ok(())
    }

    fn assign_tagged(
        &mut self,
        fragment: &RawFragment,
        registry: &TypeRegistry,
    ) -> Result<(), Error> {
        *self = T::unpack(fragment, registry)?;
        Ok(())
    }
}

/// A destination struct that declares its field table. Binding order is the
/// order fields are visited, which fixes what the partial-mutation contract
/// means: on failure, every binding before the failing one keeps its
/// decoded value.
///
/// # Example
///
/// ```
/// use tagson::{decode_plain, FieldBinding, FieldMap};
///
/// #[derive(Default)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// impl FieldMap for Point {
///     fn fields(&mut self) -> Vec<FieldBinding<'_>> {
///         vec![
///             FieldBinding::new(&mut self.x).plain("x"),
///             FieldBinding::new(&mut self.y).plain("y"),
///         ]
///     }
/// }
///
/// let mut point = Point::default();
/// decode_plain(r#"{"x": 1.5, "y": -2.0, "z": 9}"#, &mut point).unwrap();
/// assert_eq!((point.x, point.y), (1.5, -2.0));
/// ```
pub trait FieldMap {
    fn fields(&mut self) -> Vec<FieldBinding<'_>>;
}

/// Decode a top-level keyed object into `dest` using the plain namespace:
/// each bound key present in the input decodes directly into its field's
/// concrete type, with no polymorphic resolution.
///
/// Absent keys leave their fields untouched; unknown input keys are
/// ignored. On failure the destination keeps every field decoded before the
/// failing one.
pub fn decode_plain<T: FieldMap>(input: &str, dest: &mut T) -> Result<(), Error> {
    decode_fields(input, None, dest)
}

/// Decode a top-level keyed object into `dest` using the tagged namespace:
/// each bound key present in the input is routed through its slot's
/// [`Unpack`] plan, resolving polymorphic slots through `registry` and
/// recursing into sequences and maps.
///
/// Absent keys leave their fields untouched; unknown input keys are
/// ignored. On failure the destination keeps every field decoded before the
/// failing one.
pub fn decode_tagged<T: FieldMap>(
    input: &str,
    registry: &TypeRegistry,
    dest: &mut T,
) -> Result<(), Error> {
    decode_fields(input, Some(registry), dest)
}

/// [`decode_plain`] over an already-split fragment.
pub fn decode_plain_fragment<T: FieldMap>(
    fragment: &RawFragment,
    dest: &mut T,
) -> Result<(), Error> {
    decode_fields(fragment.get(), None, dest)
}

/// [`decode_tagged`] over an already-split fragment.
pub fn decode_tagged_fragment<T: FieldMap>(
    fragment: &RawFragment,
    registry: &TypeRegistry,
    dest: &mut T,
) -> Result<(), Error> {
    decode_fields(fragment.get(), Some(registry), dest)
}

// Shared top-level walk. The two entry points differ only in which key
// namespace selects a binding and which strategy assigns the slot.
fn decode_fields<T: FieldMap>(
    input: &str,
    registry: Option<&TypeRegistry>,
    dest: &mut T,
) -> Result<(), Error> {
    let fragments = json::parse::object_fragments(input).map_err(|err| {
        Error::new(ErrorKind::MalformedInput)
            .with_message("top-level input is not a keyed object")
            .with_source(err)
    })?;
    tracing::trace!(
        fields = fragments.len(),
        tagged = registry.is_some(),
        "split top-level object"
    );
    for binding in dest.fields() {
        let key = match registry {
            Some(_) => binding.tagged_key,
            None => binding.plain_key,
        };
        let Some(key) = key else { continue };
        let Some(&fragment) = fragments.get(key) else {
            continue;
        };
        let assigned = match registry {
            Some(registry) => binding.slot.assign_tagged(fragment, registry),
            None => binding.slot.assign_direct(fragment),
        };
        assigned.map_err(|err| err.with_key_segment(key))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{decode_plain, decode_tagged, FieldBinding, FieldMap, FieldSlot, Unpack};
    use crate::core::error::ErrorKind;
    use crate::core::plan::FieldPlan;
    use crate::core::registry::TypeRegistry;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Sample {
        name: String,
        count: u32,
        scores: Vec<f64>,
        labels: HashMap<u32, String>,
    }

    impl FieldMap for Sample {
        fn fields(&mut self) -> Vec<FieldBinding<'_>> {
            vec![
                FieldBinding::new(&mut self.name).plain("name").tagged("n"),
                FieldBinding::new(&mut self.count).plain("count"),
                FieldBinding::new(&mut self.scores).plain("scores").tagged("scores"),
                FieldBinding::new(&mut self.labels).tagged("labels"),
            ]
        }
    }

    #[test]
    fn plain_namespace_selects_plain_keys() {
        let mut sample = Sample::default();
        decode_plain(
            r#"{"name": "a", "count": 3, "n": "ignored"}"#,
            &mut sample,
        )
        .expect("decode");
        assert_eq!(sample.name, "a");
        assert_eq!(sample.count, 3);
    }

    #[test]
    fn tagged_namespace_selects_tagged_keys() {
        let registry = TypeRegistry::new();
        let mut sample = Sample::default();
        decode_tagged(
            r#"{"n": "b", "count": 9, "labels": {"1": "one"}}"#,
            &registry,
            &mut sample,
        )
        .expect("decode");
        assert_eq!(sample.name, "b");
        // `count` has no tagged key, so the tagged entry point skips it.
        assert_eq!(sample.count, 0);
        assert_eq!(sample.labels.get(&1).map(String::as_str), Some("one"));
    }

    #[test]
    fn absent_keys_leave_fields_untouched() {
        let mut sample = Sample {
            name: "keep".to_string(),
            count: 7,
            ..Sample::default()
        };
        decode_plain("{}", &mut sample).expect("decode");
        assert_eq!(sample.name, "keep");
        assert_eq!(sample.count, 7);
    }

    #[test]
    fn unknown_input_keys_are_ignored() {
        let mut sample = Sample::default();
        decode_plain(r#"{"mystery": [1, 2, 3]}"#, &mut sample).expect("decode");
        assert_eq!(sample.name, "");
    }

    #[test]
    fn top_level_must_be_an_object() {
        let mut sample = Sample::default();
        let err = decode_plain("[1, 2]", &mut sample).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn empty_array_decodes_to_empty_vec() {
        let mut sample = Sample {
            scores: vec![1.0],
            ..Sample::default()
        };
        decode_plain(r#"{"scores": []}"#, &mut sample).expect("decode");
        assert!(sample.scores.is_empty());
    }

    #[test]
    fn sequence_order_is_preserved() {
        let mut sample = Sample::default();
        decode_plain(r#"{"scores": [3.0, 1.0, 2.0]}"#, &mut sample).expect("decode");
        assert_eq!(sample.scores, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn map_keys_parse_into_destination_key_type() {
        let registry = TypeRegistry::new();
        let mut sample = Sample::default();
        decode_tagged(
            r#"{"labels": {"10": "ten", "20": "twenty"}}"#,
            &registry,
            &mut sample,
        )
        .expect("decode");
        assert_eq!(sample.labels.len(), 2);
        assert_eq!(sample.labels.get(&20).map(String::as_str), Some("twenty"));
    }

    #[test]
    fn bad_map_key_is_a_key_decode_error() {
        let registry = TypeRegistry::new();
        let mut sample = Sample::default();
        let err = decode_tagged(r#"{"labels": {"ten": "x"}}"#, &registry, &mut sample)
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::KeyDecode);
        assert_eq!(err.key(), Some("labels.ten"));
    }

    #[test]
    fn nested_failure_reports_the_key_path() {
        let mut sample = Sample::default();
        let err =
            decode_plain(r#"{"scores": [1.0, "oops"]}"#, &mut sample).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert_eq!(err.key(), Some("scores[1]"));
    }

    // `plan` is both a trait fn on `Unpack` and a method on `FieldSlot`;
    // fully qualified calls keep the two apart.
    #[test]
    fn plans_are_idempotent() {
        assert_eq!(<Vec<f64> as Unpack>::plan(), <Vec<f64> as Unpack>::plan());
        assert_eq!(
            <HashMap<u32, Vec<String>> as Unpack>::plan(),
            <HashMap<u32, Vec<String>> as Unpack>::plan()
        );
        assert_eq!(<String as Unpack>::plan(), FieldPlan::Scalar);
    }

    #[test]
    fn plans_nest_per_element_type() {
        let plan = <Vec<HashMap<u32, f64>> as Unpack>::plan();
        let FieldPlan::Sequence(element) = plan else {
            panic!("expected sequence plan");
        };
        let FieldPlan::Associative { element, .. } = *element else {
            panic!("expected associative element plan");
        };
        assert!(element.is_scalar());
    }

    #[test]
    fn option_wrapper_is_transparent() {
        assert_eq!(
            <Option<Vec<f64>> as Unpack>::plan(),
            <Vec<f64> as Unpack>::plan()
        );

        #[derive(Default)]
        struct Holder {
            maybe: Option<u32>,
        }
        impl FieldMap for Holder {
            fn fields(&mut self) -> Vec<FieldBinding<'_>> {
                vec![FieldBinding::new(&mut self.maybe).plain("maybe")]
            }
        }

        let mut holder = Holder::default();
        decode_plain("{}", &mut holder).expect("decode");
        assert_eq!(holder.maybe, None);
        decode_plain(r#"{"maybe": 5}"#, &mut holder).expect("decode");
        assert_eq!(holder.maybe, Some(5));
    }

    #[test]
    fn slot_plan_matches_type_plan() {
        let mut scores: Vec<f64> = Vec::new();
        let slot: &mut dyn FieldSlot = &mut scores;
        assert_eq!(slot.plan(), <Vec<f64> as Unpack>::plan());
    }
}
