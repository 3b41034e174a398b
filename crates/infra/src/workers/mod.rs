//! Background workers that keep read models and sagas fed.

pub mod projection_worker;

pub use projection_worker::{ProjectionWorker, WorkerHandle};
