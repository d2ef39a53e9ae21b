//! StarSling server library.
//!
//! Receives GitHub App webhooks, links installations to organizations and
//! mirrors repositories and issues for the dashboard.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
