//! Shared fixtures; each test binary uses a subset
#![allow(dead_code)]

pub mod config;
pub mod mcp;
pub mod mock_upstream;
pub mod server;
