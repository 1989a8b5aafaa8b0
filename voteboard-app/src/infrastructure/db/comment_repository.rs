use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

use super::entities::{comment, Comment};
use crate::domain::{AuthenticatedUser, UserDetail};

#[derive(Clone)]
pub struct CommentRepository {
    db: DatabaseConnection,
}

impl CommentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        feature_request_id: i32,
        text: String,
    ) -> Result<comment::Model, DbErr> {
        let active = comment::ActiveModel {
            feature_request_id: Set(feature_request_id),
            user_id: Set(user.id),
            user_detail: Set(UserDetail::from(user)),
            comment: Set(text),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        active.insert(&self.db).await
    }

    pub async fn list_for_feature_request(
        &self,
        feature_request_id: i32,
    ) -> Result<Vec<comment::Model>, DbErr> {
        Comment::find()
            .filter(comment::Column::FeatureRequestId.eq(feature_request_id))
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
    }
}
