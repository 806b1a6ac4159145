//! Integration test utilities for the gateway client
//!
//! This crate provides an in-process mock gateway and helpers for driving a
//! real `GatewayClient` against it.

pub mod helpers;

pub use frames::*;
pub use helpers::*;
