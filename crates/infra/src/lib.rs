//! Infrastructure layer: event store, command dispatch, projections,
//! sagas, and background workers.
//!
//! Everything here is IO-free and backed by in-memory implementations;
//! domain crates stay pure and this crate wires them together.

pub mod command_dispatcher;
pub mod event_store;
pub mod operations;
pub mod projections;
pub mod read_model;
pub mod saga;
pub mod workers;
