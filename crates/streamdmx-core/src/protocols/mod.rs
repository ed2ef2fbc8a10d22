//! Protocol codec modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets and ranges (source of truth)
//! - `reader` / `writer`: safe byte access in network order
//! - `packet`: domain-level accessors (no direct offset arithmetic)
//! - `error`: explicit, actionable errors
//!
//! Codecs are pure and contain no I/O; the `transport` module moves bytes
//! and the `input` / `output` engines decide when.

pub mod sacn;
