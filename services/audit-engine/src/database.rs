use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

use crate::controls::AnomalyTable;
use crate::errors::Result;
use crate::models::{ControlId, ControlRecord};
use crate::store::AuditStore;

/// Read-only access to the audit schema.
///
/// Every query checks a connection out of the pool for its own duration and
/// hands it back when the query finishes or fails.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    /// Pool that only connects on first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(database_url)?;

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn list_normativas(&self) -> Result<Vec<Value>> {
        self.rows_as_json("SELECT to_jsonb(n) FROM normativas n").await
    }

    pub async fn list_procesos(&self) -> Result<Vec<Value>> {
        self.rows_as_json("SELECT to_jsonb(p) FROM procesos p").await
    }

    /// Normativas linked to a proceso through `normativa_proceso`.
    pub async fn normativas_for_proceso(&self, proceso_id: i64) -> Result<Vec<Value>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_scalar::<_, Value>(
            "SELECT to_jsonb(n)
             FROM normativas n
             JOIN normativa_proceso np ON np.normativa_id = n.id
             WHERE np.proceso_id = $1",
        )
        .bind(proceso_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// Normativas linked to a control through `control_normativa`.
    pub async fn normativas_for_control(&self, control_id: ControlId) -> Result<Vec<Value>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_scalar::<_, Value>(
            "SELECT to_jsonb(n)
             FROM normativas n
             JOIN control_normativa cn ON cn.normativa_id = n.id
             WHERE cn.control_id = $1",
        )
        .bind(control_id.0)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    async fn rows_as_json(&self, sql: &str) -> Result<Vec<Value>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_scalar::<_, Value>(sql)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows)
    }
}

#[async_trait]
impl AuditStore for Database {
    async fn load_controls(&self) -> Result<Vec<ControlRecord>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(
            "SELECT id::BIGINT AS id,
                    COALESCE(nombre, '') AS nombre,
                    COALESCE(descripcion, '') AS descripcion,
                    accion_requerida
             FROM controles",
        )
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| -> Result<ControlRecord> {
                Ok(ControlRecord {
                    id: ControlId(row.try_get("id")?),
                    nombre: row.try_get("nombre")?,
                    descripcion: row.try_get("descripcion")?,
                    accion_requerida: row.try_get("accion_requerida")?,
                })
            })
            .collect()
    }

    async fn count_rows(&self, table: &AnomalyTable) -> Result<i64> {
        // The table name is derived from an integer id, never from free text.
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());

        let mut conn = self.pool.acquire().await?;
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }

    async fn reference_countries(&self) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        let countries = sqlx::query_scalar::<_, String>(
            "SELECT nombre FROM paises_organizacion WHERE nombre IS NOT NULL",
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(countries)
    }
}
