use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{UserDetail, VoteDirection};

/// One ledger row per (feature_request_id, user_id) pair; the schema enforces
/// uniqueness, application checks alone are not race-safe.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub feature_request_id: i32,
    pub user_id: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub user_detail: UserDetail,
    pub direction: VoteDirection,
    /// Last-transition timestamp, refreshed in place on direction change.
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::feature_request::Entity",
        from = "Column::FeatureRequestId",
        to = "super::feature_request::Column::Id",
        on_delete = "Cascade"
    )]
    FeatureRequest,
}

impl Related<super::feature_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeatureRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
