//! Common test utilities and fixtures.

pub mod metadata;

#[allow(unused_imports)]
pub use metadata::*;
