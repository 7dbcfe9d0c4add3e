//! `PostgreSQL` implementation of [`Store`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, instrument};

use super::{
    GalleryImage, ImageFile, InsertOutcome, NewUser, Store, UpdateOutcome, User, UserType,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const USER_COLUMNS: &str = r"
    id,
    email,
    full_name,
    password_hash,
    user_type,
    image,
    to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD HH24:MI') AS created_at
";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if no connection can be established.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Apply `sql/schema.sql` statement by statement.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn apply_schema(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }

        debug!("schema applied");

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert_user(&self, user: NewUser) -> Result<InsertOutcome> {
        let query = format!(
            r"
            INSERT INTO users (email, full_name, password_hash, user_type, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        );
        let result = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .bind(user.user_type.as_str())
            .bind(user.image.as_deref())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update_user(&self, user: &User) -> Result<UpdateOutcome> {
        let query = r"
            UPDATE users
            SET
                email = $1,
                full_name = $2,
                password_hash = $3,
                user_type = $4,
                image = $5
            WHERE id = $6
        ";
        let result = sqlx::query(query)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .bind(user.user_type.as_str())
            .bind(user.image.as_deref())
            .bind(user.id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(UpdateOutcome::NotFound),
            Ok(_) => Ok(UpdateOutcome::Updated),
            Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_images(&self, owner: Option<i64>) -> Result<Vec<GalleryImage>> {
        let query = r"
            SELECT
                id,
                user_id,
                title,
                description,
                to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD HH24:MI') AS created_at
            FROM images
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
            ORDER BY id DESC
        ";
        let rows = sqlx::query(query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        let mut images: Vec<GalleryImage> = rows
            .into_iter()
            .map(|row| GalleryImage {
                id: row.get("id"),
                user_id: row.get("user_id"),
                title: row.get("title"),
                description: row.get("description"),
                created_at: row.get("created_at"),
                files: Vec::new(),
            })
            .collect();

        if images.is_empty() {
            return Ok(images);
        }

        // Load every file for the page in one query, then attach.
        let ids: Vec<i64> = images.iter().map(|image| image.id).collect();
        let query = r"
            SELECT
                id,
                image_id,
                file,
                to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD HH24:MI') AS created_at
            FROM image_files
            WHERE image_id = ANY($1)
            ORDER BY id
        ";
        let rows = sqlx::query(query).bind(&ids).fetch_all(&self.pool).await?;

        let mut files: HashMap<i64, Vec<ImageFile>> = HashMap::new();
        for row in rows {
            files
                .entry(row.get("image_id"))
                .or_default()
                .push(ImageFile {
                    id: row.get("id"),
                    file: row.get("file"),
                    created_at: row.get("created_at"),
                });
        }

        for image in &mut images {
            image.files = files.remove(&image.id).unwrap_or_default();
        }

        Ok(images)
    }

    #[instrument(skip(self, token_hash))]
    async fn insert_session(&self, token_hash: &[u8], user_id: i64, ttl: Duration) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let pruned = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&mut *tx)
            .await?;
        if pruned.rows_affected() > 0 {
            debug!(pruned = pruned.rows_affected(), "expired sessions removed");
        }

        sqlx::query(
            r"
            INSERT INTO sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
            ",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(ttl.as_secs_f64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<User>> {
        let query = r"
            SELECT
                u.id,
                u.email,
                u.full_name,
                u.password_hash,
                u.user_type,
                u.image,
                to_char(u.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD HH24:MI') AS created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1
              AND s.expires_at > NOW()
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let user_type: String = row.get("user_type");
    let user_type = UserType::parse(&user_type)
        .ok_or_else(|| anyhow!("unknown user_type in database: {user_type}"))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        password_hash: row.get("password_hash"),
        user_type,
        image: row.get("image"),
        created_at: row.get("created_at"),
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Split a schema file into executable statements, skipping `psql` meta commands.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('\\') || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}
