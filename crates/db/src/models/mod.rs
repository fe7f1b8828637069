//! Row structs and their conversions to domain types.
//!
//! Each submodule contains a `FromRow` struct matching the table columns and
//! a `TryFrom` into the `scenegate-core` type the rest of the system uses.

pub mod approval_threshold;
pub mod scene_layout;
pub mod scene_submission;
