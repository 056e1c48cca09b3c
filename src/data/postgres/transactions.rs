use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Postgres, QueryBuilder, prelude::FromRow};
use utoipa::ToSchema;

use crate::ingest::CanonicalTransaction;

use super::Pool;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Tx {
    pub id: String,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub description: String,
    pub merchant: String,
    pub category: String,
    #[serde(rename = "type")]
    pub tx_type: String,
}

#[derive(Clone)]
pub struct Transactions {
    pool: Pool,
}

impl Transactions {
    pub(crate) fn new(pool: Pool) -> Self {
        return Self { pool };
    }

    /// Cross-batch duplicate check. The caller treats an error here as fatal
    /// for the row in flight; it must never fall back to inserting.
    pub async fn fingerprint_exists(
        &self,
        user_id: &str,
        fingerprint: &str,
    ) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            "select exists(select 1 from transactions where user_id = $1 and fingerprint = $2)",
        )
        .bind(user_id)
        .bind(fingerprint)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// The table carries a unique (user_id, fingerprint) constraint, so a
    /// duplicate slipping past the application-level check still fails here
    /// instead of inserting silently.
    pub async fn insert_many(
        &self,
        user_id: &str,
        txs: &[CanonicalTransaction],
    ) -> Result<(), sqlx::Error> {
        if txs.is_empty() {
            return Ok(());
        }

        let created_at = Utc::now();

        let mut query = QueryBuilder::<Postgres>::new(
            "insert into transactions (
                id, user_id, created_at,
                date, amount, description, merchant, category, tx_type, fingerprint
            ) ",
        );

        query.push_values(txs, |mut row, tx| {
            row.push_bind(&tx.id)
                .push_bind(user_id)
                .push_bind(created_at)
                .push_bind(tx.date)
                .push_bind(tx.amount)
                .push_bind(&tx.description)
                .push_bind(&tx.merchant)
                .push_bind(&tx.category)
                .push_bind(tx.tx_type.as_str())
                .push_bind(&tx.fingerprint);
        });

        query.build().execute(&self.pool).await?;

        Ok(())
    }

    pub async fn query(&self, user_id: &str) -> Result<Vec<Tx>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Tx>(
            "select id, date, amount, description, merchant, category, tx_type
             from transactions
             where user_id = $1
             order by date desc",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
