//! Fiscal document persistence.
//!
//! `status_history` and `original_data` are JSONB columns; enums are stored
//! as their snake_case strings. Updates are compare-and-set on `version`.

use chrono::{DateTime, Utc};
use pacgate_core::{
    CompanyId, DocumentId, DocumentStatus, DocumentType, FiscalDocument, ProcessingStep,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::corrupt_row;

const SELECT_COLUMNS: &str = "id, company_id, document_type, document_number, status, \
     status_history, original_data, amount, client, cufe, error_details, \
     created_at, updated_at, processed_at, version";

/// Insert a freshly created document.
pub async fn insert(pool: &PgPool, doc: &FiscalDocument) -> Result<(), sqlx::Error> {
    let history = encode_history(doc)?;
    let version = encode_version(doc.version)?;

    sqlx::query(
        "INSERT INTO fiscal_documents (id, company_id, document_type, document_number, status,
             status_history, original_data, amount, client, cufe, error_details,
             created_at, updated_at, processed_at, version)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(doc.id.as_uuid())
    .bind(doc.company_id.as_str())
    .bind(doc.document_type.as_str())
    .bind(&doc.document_number)
    .bind(doc.status.as_str())
    .bind(&history)
    .bind(&doc.original_data)
    .bind(&doc.amount)
    .bind(&doc.client)
    .bind(&doc.cufe)
    .bind(&doc.error_details)
    .bind(doc.created_at)
    .bind(doc.updated_at)
    .bind(doc.processed_at)
    .bind(version)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_by_id(pool: &PgPool, id: DocumentId) -> Result<Option<FiscalDocument>, sqlx::Error> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM fiscal_documents WHERE id = $1"
    ))
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?;

    row.map(DocumentRow::into_record).transpose()
}

/// A company's documents, newest first, optionally filtered by status.
pub async fn list_by_company(
    pool: &PgPool,
    company_id: &CompanyId,
    status: Option<DocumentStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<FiscalDocument>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM fiscal_documents
         WHERE company_id = $1 AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC, id
         LIMIT $3 OFFSET $4"
    ))
    .bind(company_id.as_str())
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DocumentRow::into_record).collect()
}

/// `(status, count)` pairs for one company. Statuses with no rows are absent.
pub async fn count_by_status(
    pool: &PgPool,
    company_id: &CompanyId,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT status, COUNT(*) FROM fiscal_documents WHERE company_id = $1 GROUP BY status",
    )
    .bind(company_id.as_str())
    .fetch_all(pool)
    .await
}

/// Overwrite the mutable columns if the stored version is `expected_version`.
///
/// Returns `false` when no row matched (unknown id or stale version).
pub async fn update_versioned(
    pool: &PgPool,
    doc: &FiscalDocument,
    expected_version: u64,
) -> Result<bool, sqlx::Error> {
    let history = encode_history(doc)?;
    let expected = encode_version(expected_version)?;

    let result = sqlx::query(
        "UPDATE fiscal_documents
         SET status = $3, status_history = $4, cufe = $5, error_details = $6,
             updated_at = $7, processed_at = $8, version = version + 1
         WHERE id = $1 AND version = $2",
    )
    .bind(doc.id.as_uuid())
    .bind(expected)
    .bind(doc.status.as_str())
    .bind(&history)
    .bind(&doc.cufe)
    .bind(&doc.error_details)
    .bind(doc.updated_at)
    .bind(doc.processed_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn exists(pool: &PgPool, id: DocumentId) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM fiscal_documents WHERE id = $1)")
        .bind(id.as_uuid())
        .fetch_one(pool)
        .await
}

fn encode_history(doc: &FiscalDocument) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(&doc.status_history).map_err(|e| {
        tracing::error!(document_id = %doc.id, error = %e, "failed to serialize status_history");
        sqlx::Error::Encode(Box::new(e))
    })
}

fn encode_version(version: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(version).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    company_id: String,
    document_type: String,
    document_number: Option<String>,
    status: String,
    status_history: serde_json::Value,
    original_data: serde_json::Value,
    amount: String,
    client: String,
    cufe: Option<String>,
    error_details: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl DocumentRow {
    fn into_record(self) -> Result<FiscalDocument, sqlx::Error> {
        let id = self.id;
        let company_id = CompanyId::new(self.company_id).map_err(|e| corrupt_row(id, e))?;
        let document_type = DocumentType::parse(&self.document_type).ok_or_else(|| {
            corrupt_row(id, format!("unknown document_type {:?}", self.document_type))
        })?;
        let status = DocumentStatus::parse(&self.status)
            .ok_or_else(|| corrupt_row(id, format!("unknown status {:?}", self.status)))?;
        let status_history: Vec<ProcessingStep> =
            serde_json::from_value(self.status_history).map_err(|e| corrupt_row(id, e))?;
        let version = u64::try_from(self.version).map_err(|e| corrupt_row(id, e))?;

        Ok(FiscalDocument {
            id: DocumentId::from_uuid(id),
            company_id,
            document_type,
            document_number: self.document_number,
            status,
            status_history,
            original_data: self.original_data,
            amount: self.amount,
            client: self.client,
            cufe: self.cufe,
            error_details: self.error_details,
            created_at: self.created_at,
            updated_at: self.updated_at,
            processed_at: self.processed_at,
            version,
        })
    }
}
