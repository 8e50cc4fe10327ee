//! Purpose: Map discriminant tags to factories and whole-fragment decoders.
//! Exports: `TypeRegistry`.
//! Role: The one piece of shared decode state; passed explicitly to entry points.
//! Invariants: Registration takes `&mut self`, resolution `&self`; populate
//! the registry before sharing it and the borrow checker enforces the
//! single-writer init phase.
//! Invariants: Every resolution constructs a fresh instance, never a cache.

use crate::core::envelope;
use crate::core::error::{Error, ErrorKind};
use crate::core::plan::RawFragment;
use crate::json;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

struct RegistryEntry {
    capability: TypeId,
    capability_name: &'static str,
    // Both closures wrap Box<C> in Box<dyn Any> so entries for different
    // capabilities can share one table.
    construct: Box<dyn Fn() -> Box<dyn Any> + Send + Sync>,
    decode: Box<dyn Fn(&RawFragment) -> Result<Box<dyn Any>, Error> + Send + Sync>,
}

/// Registry resolving discriminant tags to concrete capability objects.
///
/// Each entry binds a tag to a concrete payload type `T` and an explicit
/// `T -> Box<C>` conversion into the capability object the destination slot
/// expects. Registering an existing tag overwrites silently: last write
/// wins.
///
/// # Example
///
/// ```
/// use tagson::TypeRegistry;
/// # use serde::Deserialize;
/// # trait Shape { fn area(&self) -> f64; }
/// # #[derive(Default, Deserialize)]
/// # struct Circle { #[serde(default)] r: f64 }
/// # impl Shape for Circle { fn area(&self) -> f64 { std::f64::consts::PI * self.r * self.r } }
///
/// let mut registry = TypeRegistry::new();
/// registry.register("circle", |c: Circle| Box::new(c) as Box<dyn Shape>);
///
/// let fragment = serde_json::value::RawValue::from_string(
///     r#"{"type": "circle", "r": 2.0}"#.to_string(),
/// ).unwrap();
/// let shape: Box<dyn Shape> = registry.resolve(&fragment).unwrap();
/// assert!((shape.area() - std::f64::consts::PI * 4.0).abs() < 1e-9);
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tag` to decode into payload type `T`, converted into the
    /// capability object `Box<C>` by `into`.
    ///
    /// `T` should derive `Deserialize` (typically with `#[serde(default)]`
    /// so absent payload fields keep their zero values); a `type` field in
    /// the payload is ignored unless `T` declares one.
    pub fn register<C, T, F>(&mut self, tag: impl Into<String>, into: F)
    where
        C: ?Sized + 'static,
        T: DeserializeOwned + Default + 'static,
        F: Fn(T) -> Box<C> + Send + Sync + 'static,
    {
        let tag = tag.into();
        let into = Arc::new(into);
        let construct = {
            let into = Arc::clone(&into);
            Box::new(move || Box::new(into(T::default())) as Box<dyn Any>)
        };
        let decode = Box::new(move |fragment: &RawFragment| {
            let payload: T = json::parse::from_fragment(fragment).map_err(|err| {
                Error::new(ErrorKind::MalformedInput)
                    .with_message("payload does not decode into the registered type")
                    .with_source(err)
            })?;
            Ok(Box::new(into(payload)) as Box<dyn Any>)
        });
        tracing::debug!(
            tag = %tag,
            capability = std::any::type_name::<C>(),
            "registered type"
        );
        self.entries.insert(
            tag,
            RegistryEntry {
                capability: TypeId::of::<C>(),
                capability_name: std::any::type_name::<C>(),
                construct,
                decode,
            },
        );
    }

    /// Construct a fresh, empty (default) instance for `tag`.
    pub fn instance<C: ?Sized + 'static>(&self, tag: &str) -> Result<Box<C>, Error> {
        let entry = self.entry::<C>(tag)?;
        Self::unerase((entry.construct)(), entry, tag)
    }

    /// Resolve an envelope fragment into a capability object: read the
    /// discriminant, look up its entry, then decode the whole fragment
    /// (discriminant field included) into the concrete type.
    pub fn resolve<C: ?Sized + 'static>(&self, fragment: &RawFragment) -> Result<Box<C>, Error> {
        let tag = envelope::read_discriminant(fragment)?;
        let entry = self.entry::<C>(&tag)?;
        tracing::trace!(tag = %tag, "resolved discriminant");
        let instance = (entry.decode)(fragment).map_err(|err| err.with_discriminant(&tag))?;
        Self::unerase(instance, entry, &tag)
    }

    /// Whether `tag` has a registered entry.
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no tags are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry<C: ?Sized + 'static>(&self, tag: &str) -> Result<&RegistryEntry, Error> {
        let entry = self.entries.get(tag).ok_or_else(|| {
            Error::new(ErrorKind::UnknownType)
                .with_message("no factory registered for discriminant")
                .with_discriminant(tag)
        })?;
        if entry.capability != TypeId::of::<C>() {
            return Err(Error::new(ErrorKind::CapabilityMismatch)
                .with_message(format!(
                    "tag is registered for capability {}, slot expects {}",
                    entry.capability_name,
                    std::any::type_name::<C>()
                ))
                .with_discriminant(tag));
        }
        Ok(entry)
    }

    // The TypeId check in entry() makes a downcast failure unreachable, but
    // it is still reported rather than panicking.
    fn unerase<C: ?Sized + 'static>(
        erased: Box<dyn Any>,
        entry: &RegistryEntry,
        tag: &str,
    ) -> Result<Box<C>, Error> {
        erased
            .downcast::<Box<C>>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                Error::new(ErrorKind::CapabilityMismatch)
                    .with_message(format!(
                        "registered instance does not provide capability {}",
                        entry.capability_name
                    ))
                    .with_discriminant(tag)
            })
    }
}
