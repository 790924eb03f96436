//! Company and API key persistence.
//!
//! Companies live in `companies` with their PAC accounts as JSONB; API keys
//! live in `company_api_keys`. Keys are never deleted, only revoked.

use chrono::{DateTime, Utc};
use pacgate_core::{ApiKey, ApiKeyStatus, Company, CompanyId, Environment, PacConfig};
use sqlx::{PgPool, Postgres, Transaction};

use super::corrupt_row;

/// Insert a company and its keys in one transaction.
pub async fn insert(pool: &PgPool, company: &Company) -> Result<(), sqlx::Error> {
    let pac_config = encode_pac_config(company)?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO companies (id, name, ruc, pac_config, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(company.id.as_str())
    .bind(&company.name)
    .bind(&company.ruc)
    .bind(&pac_config)
    .bind(company.created_at)
    .bind(company.updated_at)
    .execute(&mut *tx)
    .await?;

    upsert_keys(&mut tx, company).await?;
    tx.commit().await
}

/// Overwrite the mutable fields of a company and upsert its keys.
///
/// The company row is locked for the transaction and each account's monthly
/// usage is kept from the stored row. Returns the company as written, or
/// `None` if it does not exist.
pub async fn update(pool: &PgPool, company: &Company) -> Result<Option<Company>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let stored: Option<serde_json::Value> =
        sqlx::query_scalar("SELECT pac_config FROM companies WHERE id = $1 FOR UPDATE")
            .bind(company.id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
    let Some(stored) = stored else {
        tx.rollback().await?;
        return Ok(None);
    };
    let stored: PacConfig =
        serde_json::from_value(stored).map_err(|e| corrupt_row(company.id.as_str(), e))?;

    let mut next = company.clone();
    next.pac_config.carry_usage_from(&stored);
    let pac_config = encode_pac_config(&next)?;

    sqlx::query(
        "UPDATE companies SET name = $2, ruc = $3, pac_config = $4, updated_at = $5
         WHERE id = $1",
    )
    .bind(next.id.as_str())
    .bind(&next.name)
    .bind(&next.ruc)
    .bind(&pac_config)
    .bind(next.updated_at)
    .execute(&mut *tx)
    .await?;

    upsert_keys(&mut tx, &next).await?;
    tx.commit().await?;
    Ok(Some(next))
}

/// Fetch a company with its keys.
pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<Company>, sqlx::Error> {
    let row = sqlx::query_as::<_, CompanyRow>(
        "SELECT id, name, ruc, pac_config, created_at, updated_at FROM companies WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let keys = sqlx::query_as::<_, ApiKeyRow>(
        "SELECT key, status, created_at FROM company_api_keys
         WHERE company_id = $1 ORDER BY created_at",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    row.into_record(keys).map(Some)
}

/// Resolve an active API key to its company.
pub async fn find_by_active_key(pool: &PgPool, key: &str) -> Result<Option<Company>, sqlx::Error> {
    let company_id: Option<String> = sqlx::query_scalar(
        "SELECT company_id FROM company_api_keys WHERE key = $1 AND status = 'active'",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    match company_id {
        Some(id) => get_by_id(pool, &id).await,
        None => Ok(None),
    }
}

/// Increment `documentsUsedThisMonth` for one environment's account.
///
/// Runs as a single statement so concurrent submissions do not lose counts.
/// Companies without an account for `env` are left untouched.
pub async fn record_usage(pool: &PgPool, id: &str, env: Environment) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE companies
         SET pac_config = jsonb_set(
                 pac_config,
                 ARRAY[$2::text, 'documentsUsedThisMonth'],
                 to_jsonb(COALESCE((pac_config -> $2::text ->> 'documentsUsedThisMonth')::bigint, 0) + 1)
             ),
             updated_at = $3
         WHERE id = $1 AND jsonb_typeof(pac_config -> $2::text) = 'object'",
    )
    .bind(id)
    .bind(env.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Whether a company row exists.
pub async fn exists(pool: &PgPool, id: &CompanyId) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)")
        .bind(id.as_str())
        .fetch_one(pool)
        .await
}

async fn upsert_keys(tx: &mut Transaction<'_, Postgres>, company: &Company) -> Result<(), sqlx::Error> {
    for key in &company.api_keys {
        sqlx::query(
            "INSERT INTO company_api_keys (key, company_id, status, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (key) DO UPDATE SET status = EXCLUDED.status
             WHERE company_api_keys.company_id = EXCLUDED.company_id",
        )
        .bind(&key.key)
        .bind(company.id.as_str())
        .bind(key_status_str(key.status))
        .bind(key.created_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn encode_pac_config(company: &Company) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(&company.pac_config).map_err(|e| {
        tracing::error!(company_id = %company.id, error = %e, "failed to serialize pac_config");
        sqlx::Error::Encode(Box::new(e))
    })
}

fn key_status_str(status: ApiKeyStatus) -> &'static str {
    match status {
        ApiKeyStatus::Active => "active",
        ApiKeyStatus::Revoked => "revoked",
    }
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    ruc: Option<String>,
    pac_config: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ApiKeyRow {
    key: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_record(self, keys: Vec<ApiKeyRow>) -> Result<Company, sqlx::Error> {
        let id = CompanyId::new(self.id.clone()).map_err(|e| corrupt_row(&self.id, e))?;
        let pac_config: PacConfig =
            serde_json::from_value(self.pac_config).map_err(|e| corrupt_row(&self.id, e))?;

        let api_keys = keys
            .into_iter()
            .map(|k| {
                let status = match k.status.as_str() {
                    "active" => ApiKeyStatus::Active,
                    "revoked" => ApiKeyStatus::Revoked,
                    other => {
                        return Err(corrupt_row(&self.id, format!("unknown key status {other:?}")))
                    }
                };
                Ok(ApiKey {
                    key: k.key,
                    status,
                    created_at: k.created_at,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Company {
            id,
            name: self.name,
            ruc: self.ruc,
            pac_config,
            api_keys,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
