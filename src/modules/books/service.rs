use bookstore_http::AppError;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;

use super::entity;
use super::models::Book;
use super::validation::{BookDraft, ValidationErrors, DUPLICATE_TITLE};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("invalid book data")]
    Validation(ValidationErrors),
    #[error("book {0} not found")]
    NotFound(i32),
    #[error("book storage failure: {0}")]
    Db(#[from] DbErr),
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(errors) => {
                AppError::validation(errors.into_details(), "Invalid book data")
            }
            BookError::NotFound(id) => AppError::not_found(format!("Book {id} not found")),
            BookError::Db(e) => AppError::Internal(anyhow::Error::new(e).context("book storage failure")),
        }
    }
}

/// Catalog operations over the `book` table.
///
/// Every write is a single statement. Title uniqueness is enforced by the
/// unique index, and an update that matches no row reports the book missing.
/// SQLite serializes such writes through its busy timeout instead of failing
/// lock upgrades inside read-then-write transactions.
#[derive(Clone)]
pub struct BookService {
    db: DatabaseConnection,
}

impl BookService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All books, oldest first.
    pub async fn list(&self) -> Result<Vec<Book>, BookError> {
        let books = entity::Entity::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?;
        Ok(books.into_iter().map(Book::from).collect())
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<u64, BookError> {
        use sea_orm::PaginatorTrait;

        Ok(entity::Entity::find().count(&self.db).await?)
    }

    pub async fn retrieve(&self, id: i32) -> Result<Book, BookError> {
        self.find(id).await.map(Book::from)
    }

    #[instrument(skip(self, payload))]
    pub async fn create(&self, payload: &Map<String, Value>) -> Result<Book, BookError> {
        let draft = BookDraft::full(payload).map_err(BookError::Validation)?;

        let model = entity::ActiveModel {
            id: NotSet,
            title: Set(draft.title),
            author: Set(draft.author),
            genre: Set(draft.genre),
            price_cents: Set(draft.price.cents()),
        }
        .insert(&self.db)
        .await
        .map_err(write_error)?;

        tracing::info!(book_id = model.id, title = %model.title, "book created");
        Ok(model.into())
    }

    /// Replace every field of an existing book.
    pub async fn update(&self, id: i32, payload: &Map<String, Value>) -> Result<Book, BookError> {
        self.apply_update(id, payload, false).await
    }

    /// Replace only the fields present in `payload`.
    pub async fn partial_update(
        &self,
        id: i32,
        payload: &Map<String, Value>,
    ) -> Result<Book, BookError> {
        self.apply_update(id, payload, true).await
    }

    #[instrument(skip(self, payload))]
    async fn apply_update(
        &self,
        id: i32,
        payload: &Map<String, Value>,
        partial: bool,
    ) -> Result<Book, BookError> {
        // Looked up before validation so an unknown id is reported as missing.
        let existing = self.find(id).await?;

        let draft = if partial {
            BookDraft::partial(payload, &BookDraft::from(&existing))
        } else {
            BookDraft::full(payload)
        }
        .map_err(BookError::Validation)?;

        let result = entity::Entity::update_many()
            .col_expr(entity::Column::Title, Expr::value(draft.title.clone()))
            .col_expr(entity::Column::Author, Expr::value(draft.author.clone()))
            .col_expr(entity::Column::Genre, Expr::value(draft.genre.clone()))
            .col_expr(entity::Column::PriceCents, Expr::value(draft.price.cents()))
            .filter(entity::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(write_error)?;

        // Deleted between the lookup and the write.
        if result.rows_affected == 0 {
            return Err(BookError::NotFound(id));
        }

        tracing::info!(book_id = id, partial, "book updated");
        Ok(Book {
            id,
            title: draft.title,
            author: draft.author,
            genre: draft.genre,
            price: draft.price,
        })
    }

    #[instrument(skip(self))]
    pub async fn destroy(&self, id: i32) -> Result<(), BookError> {
        let result = entity::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(BookError::NotFound(id));
        }

        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<entity::Model, BookError> {
        entity::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(BookError::NotFound(id))
    }
}

/// A unique-index violation on write means the title is taken.
fn write_error(err: DbErr) -> BookError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            BookError::Validation(ValidationErrors::single("title", DUPLICATE_TITLE))
        }
        _ => BookError::Db(err),
    }
}
