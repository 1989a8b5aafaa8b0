use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::application::CastVote;
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::db::{CommentRepository, FeatureRequestRepository};

#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub cast_vote: Arc<CastVote>,
    pub feature_requests: FeatureRequestRepository,
    pub comments: CommentRepository,
    pub verifier: TokenVerifier,
}

impl AppContext {
    pub fn new(db: DatabaseConnection, auth_check_url: String) -> Self {
        Self {
            cast_vote: Arc::new(CastVote::new(db.clone())),
            feature_requests: FeatureRequestRepository::new(db.clone()),
            comments: CommentRepository::new(db.clone()),
            verifier: TokenVerifier::new(auth_check_url),
            db,
        }
    }

    pub async fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let auth_check_url = std::env::var("AUTH_CHECK_URL").expect("AUTH_CHECK_URL must be set");

        let db = crate::infrastructure::db::create_connection(&database_url)
            .await
            .expect("Failed to connect to database");

        Self::new(db, auth_check_url)
    }
}
