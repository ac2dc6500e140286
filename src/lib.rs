#![doc = include_str!("../README.md")]

pub mod cli;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod services;
pub mod tools;
pub mod types;

mod tests;

pub use engine::*;
pub use error::{HoundError, Result};
pub use services::*;
pub use types::*;
