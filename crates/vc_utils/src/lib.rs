//! Small shared utilities for the `vc_store` crates.
//!
//! - [`hash`]: fixed-seed hash containers built on *hashbrown* and *foldhash*.
//! - [`TypeIdMap`]: a map keyed by [`TypeId`](core::any::TypeId) with a pass-through hasher.
//! - [`batch`]: sequential-or-parallel fan-out over independent items.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod batch;
pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
