//! Last observed service states

use chrono::{DateTime, Utc};
use lempman_core::{Error, Result, ServiceSnapshot, ServiceState};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::parse_time;

/// Repository for per-service status snapshots
pub struct ServiceStatusRepository {
    pool: SqlitePool,
}

impl ServiceStatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, service: &str) -> Result<Option<ServiceSnapshot>> {
        let row = sqlx::query(
            "SELECT service, state, changed_at, checked_at FROM service_status WHERE service = ?",
        )
        .bind(service)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        row.as_ref().map(row_to_snapshot).transpose()
    }

    pub async fn list(&self) -> Result<Vec<ServiceSnapshot>> {
        let rows = sqlx::query(
            "SELECT service, state, changed_at, checked_at FROM service_status ORDER BY service",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        rows.iter().map(row_to_snapshot).collect()
    }

    /// Record an observation. `changed_at` only moves when the state differs.
    pub async fn record(
        &self,
        service: &str,
        state: ServiceState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let at = at.to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO service_status (service, state, changed_at, checked_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(service) DO UPDATE SET
                changed_at = CASE WHEN state = excluded.state THEN changed_at ELSE excluded.changed_at END,
                state = excluded.state,
                checked_at = excluded.checked_at
            "#,
        )
        .bind(service)
        .bind(state.as_str())
        .bind(&at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DbError(e.to_string()))?;

        Ok(())
    }
}

fn row_to_snapshot(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceSnapshot> {
    let state: String = row.get("state");
    let changed_at: String = row.get("changed_at");
    let checked_at: String = row.get("checked_at");

    Ok(ServiceSnapshot {
        service: row.get("service"),
        state: state.parse()?,
        changed_at: parse_time(&changed_at),
        checked_at: parse_time(&checked_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::setup_db;
    use chrono::Duration;

    #[tokio::test]
    async fn test_record_and_get() {
        let (db, _dir) = setup_db().await;
        let repo = db.service_status();

        assert!(repo.get("nginx").await.unwrap().is_none());

        let t0 = Utc::now();
        repo.record("nginx", ServiceState::Running, t0).await.unwrap();
        let snap = repo.get("nginx").await.unwrap().unwrap();
        assert_eq!(snap.state, ServiceState::Running);
    }

    #[tokio::test]
    async fn test_changed_at_only_moves_on_change() {
        let (db, _dir) = setup_db().await;
        let repo = db.service_status();

        let t0 = Utc::now() - Duration::minutes(10);
        let t1 = t0 + Duration::minutes(5);
        let t2 = t1 + Duration::minutes(5);

        repo.record("mysql", ServiceState::Running, t0).await.unwrap();
        repo.record("mysql", ServiceState::Running, t1).await.unwrap();
        let snap = repo.get("mysql").await.unwrap().unwrap();
        assert_eq!(snap.changed_at.timestamp(), t0.timestamp());
        assert_eq!(snap.checked_at.timestamp(), t1.timestamp());

        repo.record("mysql", ServiceState::Stopped, t2).await.unwrap();
        let snap = repo.get("mysql").await.unwrap().unwrap();
        assert_eq!(snap.state, ServiceState::Stopped);
        assert_eq!(snap.changed_at.timestamp(), t2.timestamp());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
