//! Citizen identity: registration, neighborhood association and session tokens.

pub mod domain;
pub mod registry;
pub mod router;

pub use domain::{normalize_neighborhood, Citizen, CitizenId, NewCitizen, Registration};
pub use registry::{CitizenError, CitizenRegistry};
pub use router::citizen_router;
