// Field plans: the decode strategy derived from a destination's static type.
use serde_json::value::RawValue;

/// An undecoded slice of input held back for type-directed decoding. The
/// engine can inspect a fragment's `type` field before committing to a full
/// decode of the rest.
pub type RawFragment = RawValue;

/// The decode strategy for one destination slot. Derived purely from the
/// slot's static type via [`Unpack::plan`](crate::core::unpack::Unpack::plan),
/// never from the shape of the input data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldPlan {
    /// Direct decode into the concrete type, including plain structs that
    /// run their own tag-driven pass.
    Scalar,
    /// Resolve a registered concrete type from the fragment's discriminant,
    /// then decode the whole fragment into it.
    Polymorphic,
    /// Ordered element-wise recursion, index-for-index.
    Sequence(Box<FieldPlan>),
    /// String-keyed recursion into values; keys parse into `key`.
    Associative {
        /// Type name of the destination key, for diagnostics.
        key: &'static str,
        element: Box<FieldPlan>,
    },
}

impl FieldPlan {
    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldPlan::Scalar)
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self, FieldPlan::Polymorphic)
    }

    /// Element plan for sequences and maps, if any.
    pub fn element(&self) -> Option<&FieldPlan> {
        match self {
            FieldPlan::Sequence(element) => Some(element),
            FieldPlan::Associative { element, .. } => Some(element),
            FieldPlan::Scalar | FieldPlan::Polymorphic => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FieldPlan;

    #[test]
    fn element_plans_are_exposed() {
        let plan = FieldPlan::Sequence(Box::new(FieldPlan::Polymorphic));
        assert!(plan.element().expect("element").is_polymorphic());

        let plan = FieldPlan::Associative {
            key: "u32",
            element: Box::new(FieldPlan::Scalar),
        };
        assert!(plan.element().expect("element").is_scalar());

        assert!(FieldPlan::Scalar.element().is_none());
    }
}
