// src/lib.rs
// Fix Fast - regression triage agent over deterministic analysis engines

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod agent;
pub mod config;
pub mod engines;
pub mod error;
pub mod llm;
pub mod model;
pub mod tools;

pub use error::{FixFastError, Result};
