//! Quoting Service - Quote line pricing derivation and batch persistence.

pub mod config;
pub mod derivation;
pub mod models;
pub mod services;
pub mod startup;
