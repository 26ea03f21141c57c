//! Integration tests
//!
//! The in-memory suites run with a plain `cargo test`. Suites that need
//! PostgreSQL or a running server are `#[ignore]`d; run them with
//! `cargo test -- --ignored`.

mod api_tests;
mod auth_tests;
mod lending_tests;
