//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-playback`, `core-plugin`). Hosts can depend on
//! `decoder-workspace` and enable the documented features without wiring each
//! crate individually.
