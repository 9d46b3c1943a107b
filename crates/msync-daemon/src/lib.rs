//! msync-daemon library surface.
//!
//! Exposes the router, state, and runner so scenario tests can compose
//! the daemon in-process without binding a socket.

pub mod api_types;
pub mod routes;
pub mod runner;
pub mod state;
