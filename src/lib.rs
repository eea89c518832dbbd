//! Notescribe - note-taking backend server library
//!
//! This library provides the core functionality for the Notescribe backend,
//! including the AI gateway, chat session store, log shipping pipeline,
//! workspace file operations, and the HTTP surface.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `gateway`: Provider abstraction and the Gemini implementation
//! - `session`: In-memory chat session store
//! - `logship`: Log queue, shipper worker, and tracing layer
//! - `workspace`: Workspace root, path resolution, and file tree
//! - `http`: Axum router, handlers, and error mapping
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use notescribe_server::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     // Server startup would go here
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod logship;
pub mod session;
pub mod workspace;

// Re-export commonly used types
pub use config::Config;
pub use error::{NotescribeError, Result};
pub use gateway::Gateway;
pub use session::SessionStore;
pub use workspace::Workspace;
