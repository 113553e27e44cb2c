use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    /// Assigned by the database; never reused.
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Original upload filename.
    pub name: String,

    /// Blob store location. Never exposed to clients.
    #[sea_orm(unique)]
    pub location: String,

    /// Size of the blob in bytes.
    pub size: i64,

    /// Validated MIME content type.
    pub content_type: String,

    /// SHA-256 of the content, lowercase hex.
    pub checksum: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
