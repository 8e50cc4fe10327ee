//! Purpose: Internal JSON fragment boundary shared by the unpack engine.
//! Exports: `parse` module with split/decode helpers used by core internals.
//! Role: Single seam for serde_json usage so callsites avoid ad hoc decode logic.
//! Invariants: All raw-fragment handling goes through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
