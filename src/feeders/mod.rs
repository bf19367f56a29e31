//! Feeders: independently scheduled message producers.

pub mod base;
pub mod registry;
pub mod web;

pub use base::{Feed, Feeder};
pub use registry::{FeederFactory, FeederRegistry, FeederRegistryBuilder};
pub use web::WebFeed;
