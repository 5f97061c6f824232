use crate::models::{NewNotice, NewReview, NoticeRow, ResourceRow, ReviewRow, UserRow};
use crate::{Database, now_timestamp};
use anyhow::Result;
use rusqlite::{Connection, Row};

const NOTICE_COLUMNS: &str = "n.id, n.title, n.description, n.priority, n.author_id, u.username, n.created_at, n.expires_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, email: &str, password_hash: &str, role: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (username, email, password_hash, role, now_timestamp()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn email_taken(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE",
                [email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Notices --

    /// Inserts a notice and reads it back with the author's username joined in.
    pub fn insert_notice(&self, notice: &NewNotice<'_>) -> Result<NoticeRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO notices (title, description, priority, author_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    notice.title,
                    notice.description,
                    notice.priority,
                    notice.author_id,
                    now_timestamp(),
                    notice.expires_at,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_notice(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Notice {} vanished after insert", id))?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// All notices, newest first.
    pub fn list_notices(&self) -> Result<Vec<NoticeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTICE_COLUMNS}
                 FROM notices n
                 LEFT JOIN users u ON n.author_id = u.id
                 ORDER BY n.created_at DESC, n.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], notice_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_notice(&self, id: i64) -> Result<Option<NoticeRow>> {
        self.with_conn(|conn| query_notice(conn, id))
    }

    /// Returns false when no notice had this id.
    pub fn delete_notice(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM notices WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Resources --

    /// Fails with a constraint violation if `file_name` is already taken.
    pub fn insert_resource(&self, title: &str, file_name: &str) -> Result<ResourceRow> {
        self.with_conn_mut(|conn| {
            let uploaded_at = now_timestamp();
            conn.execute(
                "INSERT INTO resources (title, file_name, uploaded_at) VALUES (?1, ?2, ?3)",
                (title, file_name, &uploaded_at),
            )?;
            Ok(ResourceRow {
                id: conn.last_insert_rowid(),
                title: title.to_string(),
                file_name: file_name.to_string(),
                uploaded_at,
            })
        })
    }

    pub fn get_resource(&self, id: i64) -> Result<Option<ResourceRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, file_name, uploaded_at FROM resources WHERE id = ?1",
                [id],
                resource_from_row,
            )
            .optional()
        })
    }

    /// All resources, newest first.
    pub fn list_resources(&self) -> Result<Vec<ResourceRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, file_name, uploaded_at FROM resources
                 ORDER BY uploaded_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], resource_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn resource_file_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT file_name FROM resources")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    /// Returns false when no resource had this id.
    pub fn delete_resource(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM resources WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Reviews --

    pub fn insert_review(&self, review: &NewReview<'_>) -> Result<ReviewRow> {
        self.with_conn_mut(|conn| {
            let created_at = now_timestamp();
            conn.execute(
                "INSERT INTO reviews (company_name, rating, review_text, position, placement_type, created_at, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    review.company_name,
                    review.rating,
                    review.review_text,
                    review.position,
                    review.placement_type,
                    &created_at,
                    review.user_id,
                ],
            )?;
            Ok(ReviewRow {
                id: conn.last_insert_rowid(),
                company_name: review.company_name.to_string(),
                rating: review.rating,
                review_text: review.review_text.to_string(),
                position: review.position.to_string(),
                placement_type: review.placement_type.to_string(),
                created_at,
                user_id: review.user_id,
            })
        })
    }

    /// All reviews, newest first.
    pub fn list_reviews(&self) -> Result<Vec<ReviewRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company_name, rating, review_text, position, placement_type, created_at, user_id
                 FROM reviews
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ReviewRow {
                        id: row.get(0)?,
                        company_name: row.get(1)?,
                        rating: row.get(2)?,
                        review_text: row.get(3)?,
                        position: row.get(4)?,
                        placement_type: row.get(5)?,
                        created_at: row.get(6)?,
                        user_id: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, predicate: &str, value: P) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, role, created_at FROM users WHERE {predicate}"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_notice(conn: &Connection, id: i64) -> Result<Option<NoticeRow>> {
    let sql = format!(
        "SELECT {NOTICE_COLUMNS}
         FROM notices n
         LEFT JOIN users u ON n.author_id = u.id
         WHERE n.id = ?1"
    );
    conn.query_row(&sql, [id], notice_from_row).optional()
}

fn notice_from_row(row: &Row<'_>) -> rusqlite::Result<NoticeRow> {
    Ok(NoticeRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority: row.get(3)?,
        author_id: row.get(4)?,
        author_username: row.get(5)?,
        created_at: row.get(6)?,
        expires_at: row.get(7)?,
    })
}

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<ResourceRow> {
    Ok(ResourceRow {
        id: row.get(0)?,
        title: row.get(1)?,
        file_name: row.get(2)?,
        uploaded_at: row.get(3)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
