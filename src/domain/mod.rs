//! Core domain types and logic.

pub mod price;
pub mod moving_average;
pub mod frame;
pub mod regime;
pub mod allocation;
pub mod allocation_parser;
pub mod metrics;
pub mod strategy;
pub mod simulation;
pub mod benchmark;
pub mod overlap;
pub mod sweep;
pub mod dataset;
pub mod config_validation;
pub mod error;
