//! `PostgreSQL` implementation of the `BookRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use storyloom_core::error::DomainError;
use storyloom_core::repository::{Book, BookRepository, BookScene};

use crate::schema::CREATE_BOOK_TABLES;

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {e}"))
}

/// PostgreSQL-backed book repository.
#[derive(Debug, Clone)]
pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    /// Creates a new `PgBookRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the book tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_BOOK_TABLES)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Loads a book with its pages in turn order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on database failure.
    pub async fn find_book(&self, book_id: Uuid) -> Result<Option<Book>, DomainError> {
        let row: Option<(Uuid, String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT book_id, title, cover_url, created_at FROM books WHERE book_id = $1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let Some((book_id, title, cover_url, created_at)) = row else {
            return Ok(None);
        };

        let pages: Vec<(i32, String, String)> = sqlx::query_as(
            "SELECT scene_order, prompt, image_url FROM book_scenes \
             WHERE book_id = $1 ORDER BY scene_order",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let scenes = pages
            .into_iter()
            .map(|(order, prompt, image_url)| {
                let order = u32::try_from(order).map_err(|_| {
                    DomainError::Infrastructure(format!("negative scene order {order}"))
                })?;
                Ok(BookScene {
                    order,
                    prompt,
                    image_url,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(Some(Book {
            book_id,
            title,
            cover_url,
            scenes,
            created_at,
        }))
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn save_book(&self, book: &Book) -> Result<Uuid, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO books (book_id, title, cover_url, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(book.book_id)
        .bind(&book.title)
        .bind(&book.cover_url)
        .bind(book.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for scene in &book.scenes {
            let order = i32::try_from(scene.order).map_err(|_| {
                DomainError::Validation(format!("scene order {} out of range", scene.order))
            })?;
            sqlx::query(
                "INSERT INTO book_scenes (book_id, scene_order, prompt, image_url) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(book.book_id)
            .bind(order)
            .bind(&scene.prompt)
            .bind(&scene.image_url)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;

        info!(book_id = %book.book_id, pages = book.scenes.len(), "book persisted");
        Ok(book.book_id)
    }
}
