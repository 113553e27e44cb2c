//! Durable document metadata.

use async_trait::async_trait;
use common::storage::BlobLocation;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set,
};

use super::{Document, NewDocument};
use crate::entity::document;

/// Mapping from document id to descriptor.
///
/// Every write is committed before the call returns.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Insert a descriptor and return it with its freshly assigned id.
    async fn insert(&self, doc: NewDocument) -> Result<Document, DbErr>;

    /// All descriptors, newest `created_at` first, ties broken by id descending.
    async fn list(&self) -> Result<Vec<Document>, DbErr>;

    async fn get(&self, id: i32) -> Result<Option<Document>, DbErr>;

    /// Remove a descriptor. Returns the number of rows removed, `0` when the
    /// id is unknown.
    async fn delete(&self, id: i32) -> Result<u64, DbErr>;
}

/// [`MetadataIndex`] over the `document` table.
#[derive(Clone)]
pub struct SeaOrmIndex {
    db: DatabaseConnection,
}

impl SeaOrmIndex {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataIndex for SeaOrmIndex {
    async fn insert(&self, doc: NewDocument) -> Result<Document, DbErr> {
        let size = i64::try_from(doc.size)
            .map_err(|_| DbErr::Custom(format!("document size {} out of range", doc.size)))?;

        let model = document::ActiveModel {
            name: Set(doc.name),
            location: Set(doc.location.as_str()),
            size: Set(size),
            content_type: Set(doc.content_type),
            checksum: Set(doc.checksum),
            created_at: Set(doc.created_at),
            ..Default::default()
        };

        model.insert(&self.db).await?.try_into()
    }

    async fn list(&self) -> Result<Vec<Document>, DbErr> {
        document::Entity::find()
            .order_by_desc(document::Column::CreatedAt)
            .order_by_desc(document::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Document::try_from)
            .collect()
    }

    async fn get(&self, id: i32) -> Result<Option<Document>, DbErr> {
        document::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Document::try_from)
            .transpose()
    }

    async fn delete(&self, id: i32) -> Result<u64, DbErr> {
        let result = document::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}

impl TryFrom<document::Model> for Document {
    type Error = DbErr;

    fn try_from(model: document::Model) -> Result<Self, Self::Error> {
        let location = BlobLocation::parse(&model.location).map_err(|e| {
            DbErr::Custom(format!("document {} has a corrupt location: {e}", model.id))
        })?;
        let size = u64::try_from(model.size).map_err(|_| {
            DbErr::Custom(format!("document {} has a negative size", model.id))
        })?;

        Ok(Self {
            id: model.id,
            name: model.name,
            location,
            size,
            content_type: model.content_type,
            checksum: model.checksum,
            created_at: model.created_at,
        })
    }
}
