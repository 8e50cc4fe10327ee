// Core modules implementing the registry, envelope, field plans, and unpack engine.
pub mod envelope;
pub mod error;
pub mod plan;
pub mod registry;
pub mod unpack;
