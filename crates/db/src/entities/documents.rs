//! `SeaORM` Entity for documents table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub original_name: String,
    pub content_type: String,
    pub url: String,
    pub storage_key: String,
    pub file_id: String,
    pub content_sha1: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTimeWithTimeZone,
    pub uploader_uid: String,
    pub uploader_email: String,
    pub company_id: Option<String>,
    pub estado: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
