//! # Colabora API Server Library
//!
//! HTTP and WebSocket server for collaborative projects and tasks.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: Startup provisioning of the admin account
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors with JSON rejections
//! - `middleware`: Role guard and response format negotiation
//! - `realtime`: Rooms and event fan-out
//! - `routes`: API route handlers
//! - `storage`: Attachment storage

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod realtime;
pub mod routes;
pub mod storage;

/// Version reported by the health check
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
