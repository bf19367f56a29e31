//! Driplane — rule-driven content pipelines.
//!
//! A rule pairs one feeder with an ordered chain of filters. The feeder
//! polls a source and publishes messages on the bus; each filter tests
//! what it receives and forwards matches to the next stage.

pub mod bus;
pub mod capabilities;
pub mod config;
pub mod cookies;
pub mod error;
pub mod feeders;
pub mod filters;
pub mod html;
pub mod message;
pub mod net;
pub mod pipeline;
pub mod template;
