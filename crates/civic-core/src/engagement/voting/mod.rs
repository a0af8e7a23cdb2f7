//! Ballot initiatives: staff define the options and voting window, each
//! citizen casts at most one vote, and tallies are computed from the stored
//! votes whenever they are requested.

pub mod domain;
pub mod router;
pub mod service;


pub use domain::{
    Ballot, BallotId, BallotStatus, BallotView, NewBallot, OptionTally, Tally, VoteReceipt,
    VoteRequest,
};
pub use router::voting_router;
pub use service::{VotingError, VotingService};
