//! Integration test suite.
//!
//! Drives the real actix `App` against an in-memory SQLite database and a
//! wiremock stand-in for the GitHub REST API.
//!
//! Run with: cargo test --test integration

mod mock_github;
mod test_helpers;

mod test_directory;
mod test_health;
mod test_integrations;
mod test_issue_sync;
