//! Book store database schema.
//!
//! Mirrors `migrations/0001_create_books.sql` for callers that bootstrap a
//! database without running migrations.

/// SQL to create the books and book scenes tables.
pub const CREATE_BOOK_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS books (
    book_id    UUID PRIMARY KEY,
    title      TEXT NOT NULL,
    cover_url  TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS book_scenes (
    book_id     UUID NOT NULL REFERENCES books (book_id) ON DELETE CASCADE,
    scene_order INTEGER NOT NULL CHECK (scene_order > 0),
    prompt      TEXT NOT NULL,
    image_url   TEXT NOT NULL,
    PRIMARY KEY (book_id, scene_order)
);
";
