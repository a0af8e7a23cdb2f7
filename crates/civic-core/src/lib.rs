//! Core library behind the BlackRoad citizen engagement platform.

pub mod city;
pub mod config;
pub mod engagement;
pub mod error;
pub mod gateway;
pub mod store;
pub mod telemetry;
