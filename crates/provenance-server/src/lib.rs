//! Provenance Server
//!
//! HTTP boundary and command-line front end for the authorship ensemble.
//! Handlers only call `analyze` and the readiness probe; everything else
//! lives in `provenance-classifiers`.

pub mod config;
pub mod input;
pub mod report;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::create_router;
pub use state::AppState;
