//! Test utilities for the ministore server.
//!
//! This crate provides utilities to facilitate testing of the server and its startup sequence. See
//! the modules for all available utilities.

pub mod server;
pub mod tracing;
