use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'student'
                        CHECK (role IN ('admin', 'faculty', 'student')),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notices (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            priority    TEXT NOT NULL DEFAULT 'low'
                        CHECK (priority IN ('low', 'medium', 'high')),
            author_id   INTEGER REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            expires_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_notices_created
            ON notices(created_at);

        CREATE TABLE IF NOT EXISTS resources (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            file_name   TEXT NOT NULL UNIQUE,
            uploaded_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            company_name    TEXT NOT NULL,
            rating          INTEGER NOT NULL,
            review_text     TEXT NOT NULL,
            position        TEXT NOT NULL,
            placement_type  TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_created
            ON reviews(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
