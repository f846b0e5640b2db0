//! Hungry-cat detection service.
//!
//! Wires a camera channel and a microphone channel into the fusion
//! coordinator and exposes the resulting composite signal to subscribers.

pub mod config;
pub mod logging;
pub mod models;
pub mod service;
pub mod simulator;

pub use config::{Config, ConfigError};
pub use logging::init_logging;
pub use models::{AudioClassifier, CatDetector, MeowDetector, ObjectDetector};
pub use service::{HungryCatService, ServiceError};
