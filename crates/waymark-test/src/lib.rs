//! Test harnesses for the Waymark router server.
//!
//! `TestServer` boots the `waymark` binary on a free port against a route
//! manifest and offers HTTP helpers for full-stack tests.

#[cfg(test)]
pub mod cli;
pub mod server;

pub use server::{TestError, TestServer};
