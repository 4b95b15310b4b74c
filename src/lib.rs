pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod services;
pub mod sheets;
