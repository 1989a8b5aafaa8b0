use serde::{Deserialize, Serialize};

use super::UserDetail;

/// Read-side projection of a feature request. `votes` is derived at read time
/// from the stored counters and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRequestView {
    pub id: i32,
    pub title: String,
    pub subtitle: String,
    pub votes: i32,
    pub upvotes: i32,
    pub downvotes: i32,
    pub user_id: i64,
    pub user_detail: UserDetail,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
