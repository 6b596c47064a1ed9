//! The ministore server bootstrap.
//!
//! This crate turns startup parameters into a validated set of listeners for the storage API and
//! the management UI, and serves them. See [`bootstrap`] for the startup sequence and [`config`]
//! for all configuration sources.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod driver;
pub mod endpoints;
pub mod error;
pub mod healthcheck;
pub mod observability;
pub mod state;
pub mod tls;
pub mod topology;
pub mod web;
