//! Execution engine for plbsync
//!
//! The engine orchestrates:
//! 1. Planning - Order the manifest into passes (parents first, removals last)
//! 2. Diffing - Preview every resource against the device
//! 3. Executing - Converge each resource, continuing past failures

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute, plan_all};
