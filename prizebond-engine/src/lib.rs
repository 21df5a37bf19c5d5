pub mod analysis;
pub mod config;
pub mod display;
pub mod ensemble;
pub mod error;
pub mod export;
pub mod features;
pub mod models;
