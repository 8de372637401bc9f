//! CLI command implementations.

pub mod collect;

pub use collect::{CollectCommand, CollectOptions, Collection};
