//! Users repository

use chrono::Utc;
use lempman_core::{Error, Result, Role, User};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::info;

use crate::parse_time;

/// Repository for console users
pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the default admin when the table is empty.
    ///
    /// `hash` is only invoked when the account actually needs creating.
    pub async fn ensure_default_admin<F>(&self, username: &str, hash: F) -> Result<bool>
    where
        F: FnOnce() -> Result<String>,
    {
        if self.count().await? > 0 {
            return Ok(false);
        }

        let admin = User::new(username, hash()?, Role::Admin);
        self.insert(&admin).await?;
        info!("Created default admin user '{}'", username);
        Ok(true)
    }

    /// Insert a new user, failing on a duplicate username
    pub async fn insert(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (username, password_hash, role, created_at, last_login)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at.to_rfc3339())
        .bind(user.last_login.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::AlreadyExists(format!("user '{}'", user.username)));
        }
        Ok(())
    }

    pub async fn get(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT username, password_hash, role, created_at, last_login FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT username, password_hash, role, created_at, last_login FROM users ORDER BY created_at, username",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        rows.iter().map(row_to_user).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(row.0)
    }

    /// Replace the stored hash; false when the user does not exist
    pub async fn update_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE username = ?")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_login(&self, username: &str) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE username = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(())
    }

    pub async fn delete(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let created_at: String = row.get("created_at");
    let last_login: Option<String> = row.get("last_login");

    Ok(User {
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: role.parse()?,
        created_at: parse_time(&created_at),
        last_login: last_login.as_deref().map(parse_time),
    })
}
