//! Shared helpers for the `vc_store` proc-macro crates.
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro crate")]

extern crate proc_macro;

// -----------------------------------------------------------------------------
// Modules

mod manifest;

// -----------------------------------------------------------------------------
// Exports

pub use manifest::Manifest;
