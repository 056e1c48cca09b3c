use chrono::Utc;
use sqlx::prelude::FromRow;

use super::Pool;

#[derive(Debug, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
}

#[derive(Clone)]
pub struct Sessions {
    pool: Pool,
}

impl Sessions {
    pub(crate) fn new(pool: Pool) -> Self {
        return Self { pool };
    }

    pub async fn get_one(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            "select id, user_id from sessions where user_id = $1 and id = $2",
        )
        .bind(user_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn insert(&self, user_id: &str, session_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("insert into sessions (id, user_id, created_at) values ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
