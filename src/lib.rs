//! Purpose: Tag-directed JSON decoding with runtime-registered polymorphic types.
//! Exports: `core` (registry, envelope, field plans, unpack engine, errors).
//! Role: Library crate; decoding is synchronous, registry state is explicit.
//! Invariants: Field plans derive from static destination types, never input shape.
//! Invariants: Absent input keys are skipped; present-but-failing keys never are.
pub mod core;
pub(crate) mod json;

pub use crate::core::envelope::{read_discriminant, DISCRIMINANT_KEY};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::plan::{FieldPlan, RawFragment};
pub use crate::core::registry::TypeRegistry;
pub use crate::core::unpack::{
    decode_plain, decode_plain_fragment, decode_tagged, decode_tagged_fragment, FieldBinding,
    FieldMap, FieldSlot, Unpack,
};
