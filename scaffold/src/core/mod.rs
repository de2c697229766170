//! Deterministic, pure logic shared by the scaffolding engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! content and definitions and return deterministic outputs suitable for tests.

pub mod anchor;
pub mod guard;
pub mod mutator;
pub mod types;
pub mod validate;
