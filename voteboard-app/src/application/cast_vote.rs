use sea_orm::{DatabaseConnection, DbErr, SqlErr, TransactionTrait};
use voteboard_errors::AppError;

use crate::domain::{plan, AuthenticatedUser, VoteDirection, VoteOutcome, VotePlan};
use crate::infrastructure::db::{FeatureRequestRepository, VoteRepository};

/// The vote engine. Reads the ledger to decide the transition, then applies
/// the ledger mutation and the counter mutation in one transaction; partial
/// effects are never visible and the counters cannot drift from the ledger.
pub struct CastVote {
    db: DatabaseConnection,
    feature_requests: FeatureRequestRepository,
    votes: VoteRepository,
}

impl CastVote {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            feature_requests: FeatureRequestRepository::new(db.clone()),
            votes: VoteRepository::new(db.clone()),
            db,
        }
    }

    /// Apply one vote request and report which transition fired.
    ///
    /// The existence check runs before any transaction is opened. A lost race
    /// on the first insert (unique-constraint violation) or on a guarded
    /// switch surfaces as `Conflict` and is retried exactly once by
    /// re-reading the ledger and re-planning; a second loss escalates.
    pub async fn apply(
        &self,
        user: &AuthenticatedUser,
        feature_request_id: i32,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, AppError> {
        if !self.feature_requests.exists(feature_request_id).await? {
            return Err(AppError::NotFound);
        }

        let mut retried = false;
        loop {
            let existing = self
                .votes
                .find_by_pair(feature_request_id, user.id)
                .await?;
            let current = existing.as_ref().map(|row| row.direction);

            let attempt = match plan(current, direction) {
                VotePlan::NoOp => return Ok(VoteOutcome::AlreadyInState),
                VotePlan::Insert => self
                    .insert_vote(user, feature_request_id, direction)
                    .await
                    .map(|()| VoteOutcome::Added),
                VotePlan::Switch { from } => {
                    let Some(row) = existing else {
                        return Err(AppError::Internal(
                            "switch planned without a ledger row".to_string(),
                        ));
                    };
                    self.switch_vote(row.id, feature_request_id, from, direction)
                        .await
                        .map(|()| VoteOutcome::Switched)
                }
            };

            match attempt {
                Ok(outcome) => return Ok(outcome),
                Err(AppError::Conflict) if !retried => {
                    tracing::debug!(
                        feature_request_id,
                        user_id = user.id,
                        "vote lost a concurrent race, re-reading ledger"
                    );
                    retried = true;
                }
                Err(AppError::Conflict) => {
                    return Err(AppError::Internal(
                        "vote transition failed to settle after retry".to_string(),
                    ))
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn insert_vote(
        &self,
        user: &AuthenticatedUser,
        feature_request_id: i32,
        direction: VoteDirection,
    ) -> Result<(), AppError> {
        let txn = self.db.begin().await.map_err(AppError::from)?;
        self.votes
            .insert(&txn, feature_request_id, user, direction)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    AppError::Conflict
                } else {
                    AppError::from(err)
                }
            })?;
        self.feature_requests
            .bump_counter(&txn, feature_request_id, direction)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    async fn switch_vote(
        &self,
        vote_id: i32,
        feature_request_id: i32,
        from: VoteDirection,
        to: VoteDirection,
    ) -> Result<(), AppError> {
        let txn = self.db.begin().await.map_err(AppError::from)?;
        if !self
            .votes
            .switch_direction(&txn, vote_id, from, to)
            .await?
        {
            txn.rollback().await?;
            return Err(AppError::Conflict);
        }
        self.feature_requests
            .swap_counters(&txn, feature_request_id, from, to)
            .await?;
        txn.commit().await?;
        Ok(())
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;
    use crate::domain::UserDetail;
    use crate::infrastructure::db::entities::{feature_request, vote};

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            id: 7,
            email: "u1@example.com".to_string(),
            username: "u1".to_string(),
            name: "User One".to_string(),
        }
    }

    fn detail() -> UserDetail {
        UserDetail::from(&user())
    }

    fn feature_request_row() -> feature_request::Model {
        feature_request::Model {
            id: 1,
            title: "Dark mode".to_string(),
            subtitle: "Please add a dark theme".to_string(),
            upvotes: 0,
            downvotes: 0,
            user_id: 3,
            user_detail: detail(),
            created_at: chrono::Utc::now(),
        }
    }

    fn vote_row(direction: VoteDirection) -> vote::Model {
        vote::Model {
            id: 5,
            feature_request_id: 1,
            user_id: 7,
            user_detail: detail(),
            direction,
            created_at: chrono::Utc::now(),
        }
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 1,
            rows_affected: 1,
        }
    }

    #[tokio::test]
    async fn first_vote_inserts_and_bumps_counter() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![feature_request_row()]])
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();
        let probe = db.clone();

        let outcome = CastVote::new(db)
            .apply(&user(), 1, VoteDirection::Upvote)
            .await
            .unwrap();

        assert_eq!(outcome, VoteOutcome::Added);
        // Two guard reads plus one transaction holding both writes.
        assert_eq!(probe.into_transaction_log().len(), 3);
    }

    #[tokio::test]
    async fn same_direction_is_a_no_op_both_times() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![feature_request_row()]])
            .append_query_results([vec![vote_row(VoteDirection::Upvote)]])
            .append_query_results([vec![feature_request_row()]])
            .append_query_results([vec![vote_row(VoteDirection::Upvote)]])
            .into_connection();
        let probe = db.clone();

        let engine = CastVote::new(db);
        for _ in 0..2 {
            let outcome = engine.apply(&user(), 1, VoteDirection::Upvote).await.unwrap();
            assert_eq!(outcome, VoteOutcome::AlreadyInState);
        }

        // Four reads, no transaction, no counter writes.
        assert_eq!(probe.into_transaction_log().len(), 4);
    }

    #[tokio::test]
    async fn opposite_direction_switches_in_one_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![feature_request_row()]])
            .append_query_results([vec![vote_row(VoteDirection::Downvote)]])
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection();
        let probe = db.clone();

        let outcome = CastVote::new(db)
            .apply(&user(), 1, VoteDirection::Upvote)
            .await
            .unwrap();

        assert_eq!(outcome, VoteOutcome::Switched);
        assert_eq!(probe.into_transaction_log().len(), 3);
    }

    #[tokio::test]
    async fn missing_feature_request_opens_no_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<feature_request::Model>::new()])
            .into_connection();
        let probe = db.clone();

        let err = CastVote::new(db)
            .apply(&user(), 99, VoteDirection::Downvote)
            .await
            .unwrap_err();

        assert_eq!(err, AppError::NotFound);
        // Only the existence read ran.
        assert_eq!(probe.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn lost_switch_race_retries_once_then_resolves() {
        // The guarded update matches nothing because another request already
        // flipped the row; the retry re-reads and lands on the no-op branch.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![feature_request_row()]])
            .append_query_results([vec![vote_row(VoteDirection::Downvote)]])
            .append_query_results([vec![vote_row(VoteDirection::Upvote)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let outcome = CastVote::new(db)
            .apply(&user(), 1, VoteDirection::Upvote)
            .await
            .unwrap();

        assert_eq!(outcome, VoteOutcome::AlreadyInState);
    }

    #[tokio::test]
    async fn second_lost_race_escalates_to_internal() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![feature_request_row()]])
            .append_query_results([vec![vote_row(VoteDirection::Downvote)]])
            .append_query_results([vec![vote_row(VoteDirection::Downvote)]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let err = CastVote::new(db)
            .apply(&user(), 1, VoteDirection::Upvote)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn generic_db_errors_are_not_unique_violations() {
        let err = DbErr::Custom("duplicate key value".to_string());
        assert!(!is_unique_violation(&err));
    }
}
