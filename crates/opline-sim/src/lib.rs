//! Traffic simulator for Opline.
//!
//! Stands in for the real instrument during development: a seeded
//! [`TrafficGenerator`] produces event and error records on configurable
//! cadences, and [`Simulator`] drives them through a [`opline_link::LinkEndpoint`]
//! over any transport, keeping a record of every transmitted line.

pub mod config;
pub mod error;
pub mod generator;
pub mod simulator;

pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use generator::TrafficGenerator;
pub use simulator::{SimReport, Simulator};
