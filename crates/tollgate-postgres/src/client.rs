use secrecy::ExposeSecret;
use serde_json::{Value, json};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use tollgate_config::PostgresConfig;
use tollgate_core::{Result, ServiceError};

use crate::types::{
    Column, DescribeTableRequest, ListTablesRequest, QueryRequest, QueryResponse, StatementKind, TableDescription,
    TablesResponse, read_only_statement,
};

pub(crate) const SERVICE: &str = "postgres";

const LIST_TABLES: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = $1 AND table_type IN ('BASE TABLE', 'VIEW')
ORDER BY table_name";

const DESCRIBE_TABLE: &str = "\
SELECT column_name::text, data_type::text, is_nullable = 'YES', column_default::text
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2
ORDER BY ordinal_position";

/// Read-only access to a Postgres database
pub struct PostgresClient {
    pool: PgPool,
    statement_timeout_ms: u64,
    max_rows: u32,
}

impl PostgresClient {
    /// Create the client; connections are opened on first use
    pub fn new(config: &PostgresConfig) -> Result<Self> {
        let url = config
            .url
            .as_ref()
            .ok_or_else(|| ServiceError::Config("connection URL required for Postgres".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.timeout())
            .connect_lazy(url.expose_secret())
            .map_err(|e| ServiceError::Config(format!("invalid Postgres connection URL: {e}")))?;

        tracing::debug!(
            max_connections = config.max_connections,
            max_rows = config.max_rows,
            "Postgres pool configured"
        );

        Ok(Self {
            pool,
            statement_timeout_ms: config.statement_timeout_ms,
            max_rows: config.max_rows,
        })
    }

    pub async fn list_tables(&self, request: &ListTablesRequest) -> Result<TablesResponse> {
        let tables = sqlx::query_scalar::<_, String>(LIST_TABLES)
            .bind(&request.schema)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)?;

        Ok(TablesResponse {
            schema: request.schema.clone(),
            tables,
        })
    }

    /// Columns in ordinal order; an unknown table is an `Api` 404
    pub async fn describe_table(&self, request: &DescribeTableRequest) -> Result<TableDescription> {
        let columns = sqlx::query_as::<_, (String, String, bool, Option<String>)>(DESCRIBE_TABLE)
            .bind(&request.schema)
            .bind(&request.table)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)?;

        if columns.is_empty() {
            return Err(ServiceError::api(
                Some(404),
                format!("table '{}.{}' not found", request.schema, request.table),
            ));
        }

        Ok(TableDescription {
            schema: request.schema.clone(),
            table: request.table.clone(),
            columns: columns
                .into_iter()
                .map(|(name, data_type, nullable, default)| Column {
                    name,
                    data_type,
                    nullable,
                    default,
                })
                .collect(),
        })
    }

    /// Run one read statement inside a `READ ONLY` transaction
    ///
    /// One row beyond `limit` is fetched to detect truncation.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        if request.limit > self.max_rows {
            return Err(ServiceError::validation(
                "limit",
                format!("must be between 1 and {}, got {}", self.max_rows, request.limit),
            ));
        }

        let (statement, kind) = read_only_statement(&request.sql)?;
        let limit = request.limit as usize;

        tracing::debug!(?kind, limit, "running read-only query");

        let mut tx = self.read_only_transaction().await?;

        let mut rows = match kind {
            StatementKind::Rows => {
                let wrapped = format!(
                    "SELECT COALESCE(json_agg(t), '[]'::json) FROM (SELECT * FROM (\n{statement}\n) AS q LIMIT {}) AS t",
                    limit + 1
                );

                let value = sqlx::query_scalar::<_, Value>(&wrapped)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_error)?;

                match value {
                    Value::Array(rows) => rows,
                    other => vec![other],
                }
            }
            StatementKind::Explain => sqlx::query(statement)
                .fetch_all(&mut *tx)
                .await
                .map_err(map_error)?
                .iter()
                .map(plan_line)
                .collect(),
        };

        tx.rollback().await.map_err(map_error)?;

        let truncated = rows.len() > limit;
        rows.truncate(limit);

        Ok(QueryResponse {
            row_count: rows.len(),
            rows,
            truncated,
        })
    }

    async fn read_only_transaction(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(map_error)?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(map_error)?;

        // SET does not accept bind parameters
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", self.statement_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(map_error)?;

        Ok(tx)
    }
}

/// `EXPLAIN` yields one text (or JSON) column per plan line
fn plan_line(row: &PgRow) -> Value {
    row.try_get::<String, _>(0)
        .map(|line| json!({ "QUERY PLAN": line }))
        .or_else(|_| row.try_get::<Value, _>(0).map(|plan| json!({ "QUERY PLAN": plan })))
        .unwrap_or(Value::Null)
}

/// Server-side SQL errors are upstream errors; everything else is local
fn map_error(error: sqlx::Error) -> ServiceError {
    match error {
        sqlx::Error::Database(db) => {
            tracing::error!(service = SERVICE, code = ?db.code(), error = %db, "postgres rejected statement");

            ServiceError::Api {
                status: None,
                message: db.message().to_string(),
                details: Some(json!({ "sqlstate": db.code() })),
            }
        }
        sqlx::Error::Configuration(e) => ServiceError::Config(format!("invalid Postgres configuration: {e}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            ServiceError::api(None, format!("unexpected value from {SERVICE}: {error}"))
        }
        other => {
            tracing::error!(service = SERVICE, error = %other, "postgres connection failed");
            ServiceError::Client(format!("failed to reach {SERVICE}: {other}"))
        }
    }
}
