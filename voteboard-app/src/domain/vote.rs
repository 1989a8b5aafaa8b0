use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a vote, stored verbatim in the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    #[sea_orm(string_value = "upvote")]
    Upvote,
    #[sea_orm(string_value = "downvote")]
    Downvote,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Upvote => Self::Downvote,
            Self::Downvote => Self::Upvote,
        }
    }
}

impl std::fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transition branch fired. Counters are never returned alongside: they
/// can already be stale by the time the caller sees them, so callers re-read
/// the feature request for fresh totals.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Added,
    AlreadyInState,
    Switched,
}

impl VoteOutcome {
    pub fn action(&self, direction: VoteDirection) -> String {
        match self {
            Self::Added => "added".to_string(),
            Self::AlreadyInState => format!("already_{}d", direction.as_str()),
            Self::Switched => "switched".to_string(),
        }
    }

    pub fn message(&self, direction: VoteDirection) -> String {
        match self {
            Self::Added => format!("Successfully {}d", direction.as_str()),
            Self::AlreadyInState => {
                format!("You have already {}d this feature request", direction.as_str())
            }
            Self::Switched => format!("Changed from {} to {}", direction.opposite(), direction),
        }
    }
}

/// Unit of work planned for one vote request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VotePlan {
    /// First vote by this user on this request.
    Insert,
    /// Ledger already holds the requested direction.
    NoOp,
    /// Existing row flips to the requested direction.
    Switch { from: VoteDirection },
}

/// The vote state machine. Both HTTP directions run through this single
/// transition function, so they share identical race handling.
pub fn plan(existing: Option<VoteDirection>, requested: VoteDirection) -> VotePlan {
    match existing {
        None => VotePlan::Insert,
        Some(current) if current == requested => VotePlan::NoOp,
        Some(current) => VotePlan::Switch { from: current },
    }
}

#[cfg(test)]
mod tests {
    use super::VoteDirection::{Downvote, Upvote};
    use super::*;

    #[test]
    fn transition_table() {
        assert_eq!(plan(None, Upvote), VotePlan::Insert);
        assert_eq!(plan(None, Downvote), VotePlan::Insert);
        assert_eq!(plan(Some(Upvote), Upvote), VotePlan::NoOp);
        assert_eq!(plan(Some(Downvote), Downvote), VotePlan::NoOp);
        assert_eq!(plan(Some(Upvote), Downvote), VotePlan::Switch { from: Upvote });
        assert_eq!(plan(Some(Downvote), Upvote), VotePlan::Switch { from: Downvote });
    }

    #[test]
    fn action_strings_match_wire_format() {
        assert_eq!(VoteOutcome::Added.action(Upvote), "added");
        assert_eq!(VoteOutcome::AlreadyInState.action(Upvote), "already_upvoted");
        assert_eq!(VoteOutcome::AlreadyInState.action(Downvote), "already_downvoted");
        assert_eq!(VoteOutcome::Switched.action(Downvote), "switched");
    }

    #[test]
    fn switch_message_names_both_directions() {
        assert_eq!(
            VoteOutcome::Switched.message(Upvote),
            "Changed from downvote to upvote"
        );
    }

    #[test]
    fn direction_serializes_to_wire_names() {
        assert_eq!(serde_json::to_string(&Upvote).unwrap(), "\"upvote\"");
        assert_eq!(serde_json::to_string(&Downvote).unwrap(), "\"downvote\"");
    }
}
