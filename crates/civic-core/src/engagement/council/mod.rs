//! Council meeting schedules and agendas.

pub mod domain;
pub mod router;
pub mod service;

pub use domain::{Meeting, MeetingId, MeetingQuery, NewMeeting};
pub use router::council_router;
pub use service::{CouncilError, CouncilService};
