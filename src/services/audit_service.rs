use crate::error::Result;
use crate::models::audit_log::AuditLog;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

/// Audit sink seam. Callers dispatch fire-and-forget; a failing logger must
/// never change the outcome of the operation that triggered it.
#[async_trait]
pub trait ActivityLogger: Send + Sync {
    async fn log(
        &self,
        actor_id: Option<i64>,
        action: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        context: Option<JsonValue>,
    ) -> Result<AuditLog>;
}

#[derive(Clone)]
pub struct PgActivityLogger {
    pool: PgPool,
}

impl PgActivityLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogger for PgActivityLogger {
    async fn log(
        &self,
        actor_id: Option<i64>,
        action: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        context: Option<JsonValue>,
    ) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditLog>(
            "INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, context) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, actor_id, action, entity_type, entity_id, context, created_at",
        )
        .bind(actor_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(context)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
