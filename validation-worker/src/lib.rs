//! Validation Worker
//!
//! Runs an [`invoice_validation::ValidationEngine`] behind a message
//! envelope so it can live off the caller's thread or process.
//!
//! - [`actor`]: single task owning the engine, cloneable handle
//! - [`message`]: `{type, data}` request and response envelope
//! - [`transport`]: JSON-lines framing over any async reader/writer

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod message;
pub mod transport;

pub use actor::{ValidationActor, WorkerHandle, WorkerMessage};
pub use config::{LogFormat, WorkerConfig};
pub use error::{Error, Result};
pub use message::{WorkerRequest, WorkerResponse};
pub use transport::serve_lines;
