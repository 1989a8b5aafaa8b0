use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr};

use super::entities::{vote, Vote};
use crate::domain::{AuthenticatedUser, UserDetail, VoteDirection};

#[derive(Clone)]
pub struct VoteRepository {
    db: DatabaseConnection,
}

impl VoteRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Current ledger row for this (feature request, user) pair, if any.
    pub async fn find_by_pair(
        &self,
        feature_request_id: i32,
        user_id: i64,
    ) -> Result<Option<vote::Model>, DbErr> {
        Vote::find()
            .filter(vote::Column::FeatureRequestId.eq(feature_request_id))
            .filter(vote::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    /// First vote by this user on this request. The unique constraint on
    /// (feature_request_id, user_id) rejects concurrent duplicates; callers
    /// treat that violation as a lost race, not a failure.
    pub async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        feature_request_id: i32,
        user: &AuthenticatedUser,
        direction: VoteDirection,
    ) -> Result<(), DbErr> {
        let active = vote::ActiveModel {
            feature_request_id: Set(feature_request_id),
            user_id: Set(user.id),
            user_detail: Set(UserDetail::from(user)),
            direction: Set(direction),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        Vote::insert(active).exec_without_returning(conn).await?;
        Ok(())
    }

    /// Guarded flip of an existing row. Filtering on the expected old
    /// direction makes the update match nothing when a concurrent request
    /// already moved the row; returns whether this call won.
    pub async fn switch_direction<C: ConnectionTrait>(
        &self,
        conn: &C,
        vote_id: i32,
        from: VoteDirection,
        to: VoteDirection,
    ) -> Result<bool, DbErr> {
        let result = Vote::update_many()
            .col_expr(vote::Column::Direction, Expr::value(to))
            .col_expr(vote::Column::CreatedAt, Expr::value(chrono::Utc::now()))
            .filter(vote::Column::Id.eq(vote_id))
            .filter(vote::Column::Direction.eq(from))
            .exec(conn)
            .await?;
        Ok(result.rows_affected == 1)
    }
}
