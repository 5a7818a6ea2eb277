//! # Colabora Shared Library
//!
//! This crate contains the types and data-layer logic shared by the Colabora
//! API server and its tests.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWT tokens, request auth context and project access checks
//! - `db`: Connection pool and migrations
//! - `models`: Database models (users, projects, collaborators, tasks, files)
//! - `pagination`: Offset pagination arithmetic

pub mod auth;
pub mod db;
pub mod models;
pub mod pagination;

/// Current version of the Colabora shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
