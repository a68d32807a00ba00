//! Sites repository

use chrono::Utc;
use lempman_core::{Error, Result, Site};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::debug;

/// Repository for hosted sites
pub struct SitesRepository {
    pool: SqlitePool,
}

impl SitesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Allocate an id and insert a new site.
    ///
    /// Ids start at the current time in milliseconds and are bumped until
    /// the insert succeeds, so concurrent creations never collide.
    pub async fn create<F>(&self, build: F) -> Result<Site>
    where
        F: Fn(String) -> Site,
    {
        let mut id = Utc::now().timestamp_millis();

        loop {
            let site = build(id.to_string());
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO sites (id, name, path, enabled, frontend_url, admin_url)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&site.id)
            .bind(&site.name)
            .bind(&site.path)
            .bind(site.enabled)
            .bind(&site.frontend_url)
            .bind(&site.admin_url)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

            if result.rows_affected() > 0 {
                return Ok(site);
            }
            debug!("Site id {} taken, retrying", id);
            id += 1;
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Site>> {
        let row = sqlx::query(
            "SELECT id, name, path, enabled, frontend_url, admin_url FROM sites WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(row.as_ref().map(row_to_site))
    }

    /// All sites, oldest first
    pub async fn list(&self) -> Result<Vec<Site>> {
        let rows = sqlx::query(
            "SELECT id, name, path, enabled, frontend_url, admin_url FROM sites ORDER BY length(id), id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(rows.iter().map(row_to_site).collect())
    }

    /// Overwrite an existing site; false when the id is unknown
    pub async fn update(&self, site: &Site) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sites SET name = ?, path = ?, enabled = ?, frontend_url = ?, admin_url = ?
            WHERE id = ?
            "#,
        )
        .bind(&site.name)
        .bind(&site.path)
        .bind(site.enabled)
        .bind(&site.frontend_url)
        .bind(&site.admin_url)
        .bind(&site.id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_site(row: &sqlx::sqlite::SqliteRow) -> Site {
    Site {
        id: row.get("id"),
        name: row.get("name"),
        path: row.get("path"),
        enabled: row.get("enabled"),
        frontend_url: row.get("frontend_url"),
        admin_url: row.get("admin_url"),
    }
}
