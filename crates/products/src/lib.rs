//! Products domain module (event-sourced).
//!
//! This crate contains business rules for the product catalog, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{
    ArchiveProduct, CostMetadata, Product, ProductArchived, ProductCommand, ProductCostUpdated,
    ProductEvent, ProductId, ProductRegistered, ProductStatus, RegisterProduct, UpdateCost,
};
