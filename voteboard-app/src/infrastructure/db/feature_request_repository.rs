use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr, PaginatorTrait};

use super::entities::{feature_request, FeatureRequest};
use crate::domain::{AuthenticatedUser, FeatureRequestView, UserDetail, VoteDirection};

impl From<feature_request::Model> for FeatureRequestView {
    fn from(model: feature_request::Model) -> Self {
        let created_by = model.user_detail.display_name().to_string();
        Self {
            id: model.id,
            title: model.title,
            subtitle: model.subtitle,
            votes: model.upvotes - model.downvotes,
            upvotes: model.upvotes,
            downvotes: model.downvotes,
            user_id: model.user_id,
            user_detail: model.user_detail,
            created_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct FeatureRequestRepository {
    db: DatabaseConnection,
}

impl FeatureRequestRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn exists(&self, id: i32) -> Result<bool, DbErr> {
        Ok(FeatureRequest::find_by_id(id).one(&self.db).await?.is_some())
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<FeatureRequestView>, DbErr> {
        Ok(FeatureRequest::find_by_id(id)
            .one(&self.db)
            .await?
            .map(FeatureRequestView::from))
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        title: String,
        subtitle: String,
    ) -> Result<feature_request::Model, DbErr> {
        let active = feature_request::ActiveModel {
            title: Set(title),
            subtitle: Set(subtitle),
            upvotes: Set(0),
            downvotes: Set(0),
            user_id: Set(user.id),
            user_detail: Set(UserDetail::from(user)),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        active.insert(&self.db).await
    }

    /// One page, newest first, then re-sorted by derived net votes. The sort
    /// is presentation only; stored rows carry no ordering invariant.
    pub async fn list_page(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<FeatureRequestView>, u64), DbErr> {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let rows = FeatureRequest::find()
            .order_by_desc(feature_request::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;
        let total = FeatureRequest::find().count(&self.db).await?;

        let mut views: Vec<FeatureRequestView> =
            rows.into_iter().map(FeatureRequestView::from).collect();
        views.sort_by(|a, b| b.votes.cmp(&a.votes));
        Ok((views, total))
    }

    /// Server-side relative bump of one counter, inside the caller's vote
    /// transaction. Never read-modify-write: concurrent bumps must not lose
    /// an update to a stale read.
    pub async fn bump_counter<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
        direction: VoteDirection,
    ) -> Result<(), DbErr> {
        let col = counter_column(direction);
        FeatureRequest::update_many()
            .col_expr(col, Expr::col(col).add(1))
            .filter(feature_request::Column::Id.eq(id))
            .exec(conn)
            .await?;
        Ok(())
    }

    /// Move one vote between counters in a single statement: the old
    /// direction's counter drops by one while the new one gains one.
    pub async fn swap_counters<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
        from: VoteDirection,
        to: VoteDirection,
    ) -> Result<(), DbErr> {
        let from_col = counter_column(from);
        let to_col = counter_column(to);
        FeatureRequest::update_many()
            .col_expr(from_col, Expr::col(from_col).sub(1))
            .col_expr(to_col, Expr::col(to_col).add(1))
            .filter(feature_request::Column::Id.eq(id))
            .exec(conn)
            .await?;
        Ok(())
    }
}

fn counter_column(direction: VoteDirection) -> feature_request::Column {
    match direction {
        VoteDirection::Upvote => feature_request::Column::Upvotes,
        VoteDirection::Downvote => feature_request::Column::Downvotes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> feature_request::Model {
        feature_request::Model {
            id: 1,
            title: "Dark mode".to_string(),
            subtitle: "Please add a dark theme".to_string(),
            upvotes: 3,
            downvotes: 1,
            user_id: 7,
            user_detail: UserDetail {
                username: "jdoe".to_string(),
                name: "Jane Doe".to_string(),
                email: "jdoe@example.com".to_string(),
            },
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn view_derives_net_votes_and_created_by() {
        let view = FeatureRequestView::from(model());
        assert_eq!(view.votes, 2);
        assert_eq!(view.created_by, "jdoe");
    }

    #[test]
    fn counter_column_tracks_direction() {
        assert!(matches!(
            counter_column(VoteDirection::Upvote),
            feature_request::Column::Upvotes
        ));
        assert!(matches!(
            counter_column(VoteDirection::Downvote),
            feature_request::Column::Downvotes
        ));
    }
}
