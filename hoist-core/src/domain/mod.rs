//! Core domain types
//!
//! This module contains the core domain structures used across Hoist crates.
//! These types are shared between the orchestrator (dispatch and steps) and
//! the deployment client (remote mutations).

pub mod event;
pub mod step;
pub mod target;
