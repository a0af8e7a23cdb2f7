//! Civic engagement modules mounted behind the gateway.

pub mod alerts;
pub mod budget;
pub mod citizens;
pub mod council;
pub mod issues;
pub mod voting;
