#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod catalog;
pub mod checker;
pub mod config;
pub mod filter;
pub mod input;
pub mod ui;

#[cfg(test)]
mod testutil;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, run_check};
