//! CoWriter Interaction Service Library Crate
//!
//! Runs the handwriting tutoring controller as a service: configuration,
//! the JSON bus protocol and its WebSocket bridge, a small REST surface with
//! OpenAPI docs, and the runtime that executes controller commands. The
//! `interaction` binary is a thin wrapper around this library.

pub mod bus;
pub mod config;
pub mod handlers;
pub mod models;
pub mod protocol;
pub mod router;
pub mod runtime;
pub mod state;
