//! `book` table mapping.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "book")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(StringLen::N(128))")]
    pub title: String,
    #[sea_orm(column_type = "String(StringLen::N(64))")]
    pub author: String,
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub genre: String,
    /// Price in whole cents
    pub price_cents: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
