//! p12crack-core: types shared by the container, engine, and CLI crates
//!
//! - `error`: the failure taxonomy and its process exit codes
//! - `config`: the TOML config schema (`p12crack.toml`)
//! - `types`: the `Verifier` seam and small value types

pub mod config;
pub mod error;
pub mod types;

pub use error::{CrackError, CrackResult, ExitCode};
pub use types::{AttackMode, Verifier};
