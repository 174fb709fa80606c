//! tinyforge-lib: core types and logic for tinyforge
//!
//! This crate provides the building blocks behind the `tinyforge` binary:
//! - `config`: layered build configuration (defaults, project file, env, CLI)
//! - `toolchain`: capability trait over the AVR cross tools
//! - `programmer`: capability trait over the UPDI programmer script
//! - `artifact`: artifact naming and cleanup
//! - `pipeline`: the fixed step compositions behind each user-facing command
//! - `d64`: helpers for working with 1541 disk images

pub mod artifact;
pub mod config;
pub mod d64;
pub mod pipeline;
pub mod process;
pub mod programmer;
pub mod toolchain;
