//! Core data structures for tether's blame-carrying contract checks.
//!
//! This crate holds everything that describes *where* a violation happened and
//! *how* it is reported, independent of the values being checked:
//! - [`location`]: Source positions and span narrowing
//! - [`frame`]: Diagnostic frames and responsibility direction
//! - [`indicator`]: Type strings paired with a caret indicator line
//! - [`error`]: [`ContractError`](error::ContractError) and [`BuildError`](error::BuildError)
//! - [`returns`]: The return-site table used to blame the exact `return`
//! - [`source`]: Cached source lines for rendering
//! - [`config`]: Configuration loading from `.tether/tether.json`
//! - [`hash`]: Deterministic xxhash64 keys for the checker cache

pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod indicator;
pub mod location;
pub mod returns;
pub mod source;

pub use error::{BuildError, BuildErrorKind, ContractError, ViolationKind};
pub use frame::{Frame, ResponsibilityDirection};
pub use location::Location;
