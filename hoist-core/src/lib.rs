//! Hoist Core
//!
//! Core types and abstractions for the Hoist deployment relay.
//!
//! This crate contains:
//! - Domain types: trigger events, deployment targets, step results
//! - DTOs: inbound webhook payloads and the GraphQL wire envelope

pub mod domain;
pub mod dto;
