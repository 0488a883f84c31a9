pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod favorites;
pub mod metrics;
pub mod migrator;
pub mod places;
pub mod planner;
pub mod providers;
pub mod telemetry;

pub use sea_orm;
