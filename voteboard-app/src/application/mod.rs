mod cast_vote;

pub use cast_vote::CastVote;
