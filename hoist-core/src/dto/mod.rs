//! Data Transfer Objects
//!
//! DTOs for the webhook boundary: the inbound payload shape and the
//! response bodies returned to the event source.

pub mod webhook;
