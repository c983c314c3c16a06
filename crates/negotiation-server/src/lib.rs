//! Command-line and HTTP front end for the negotiation simulation.
//!
//! # Modules
//!
//! - [`runtime`]: Loading configuration and building a simulation for the chosen backend
//! - [`server`]: `GET /start` server-sent event stream and `GET /health`
//! - [`console`]: Table rendering of a run for the terminal

pub mod console;
pub mod runtime;
pub mod server;

pub use console::{render_event, truncate, ConsoleSink};
pub use runtime::{build_simulation, build_with_backend, load_config};
pub use server::{bind, router, serve, serve_on};
