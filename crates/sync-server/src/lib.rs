//! Server-side building blocks for the sync protocol: listening acceptor,
//! per-connection worker, request validator, and startup errors.

pub mod acceptor;
pub mod error;
pub mod validator;
pub mod worker;

pub use acceptor::accept_clients;
pub use error::ServerError;
pub use validator::{validate, ValidatedUpgradeRequest};
pub use worker::{handle_connection, WorkerSlot};
