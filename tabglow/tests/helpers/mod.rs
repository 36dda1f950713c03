// Shared helpers for integration tests
// Each test binary uses a different subset of these.
#![allow(dead_code)]

pub mod bridge;
pub mod polling;
