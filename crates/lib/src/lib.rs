//! pbuild-lib: cross-compilation orchestration for Go projects
//!
//! This crate holds every policy decision of a multi-target build run:
//! - `config` / `resolve`: strategy and CPU feature levels to a per-target `BuildPlan`
//! - `toolchain`: running the external compiler for one target
//! - `artifact`: compression, checksums and sizing of a produced binary
//! - `execute`: the worker pool, result aggregation and the persisted metadata record

pub mod artifact;
pub mod config;
pub mod consts;
pub mod execute;
pub mod platform;
pub mod project;
pub mod resolve;
pub mod toolchain;
pub mod util;
pub mod version;
