use anyhow::{Context, Result};

use crate::config::Config;

mod postgres;
pub use postgres::*;

mod id;
pub use id::create_id;

#[derive(Clone)]
pub struct Data {
    pub sessions: postgres::Sessions,
    pub transactions: postgres::Transactions,
}

impl Data {
    pub async fn new(config: &Config) -> Result<Self> {
        let postgres = Postgres::new(&config.database_url)
            .await
            .context("error creating postgres")?;

        return Ok(Self {
            sessions: postgres.sessions,
            transactions: postgres.transactions,
        });
    }
}
