use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Client for the remote category classifier: text in, category label out.
/// Called with normalized descriptions only, one call per cache group.
#[derive(Clone)]
pub struct Classifier {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    category: String,
}

impl Classifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            url: config.classifier_url.clone(),
        }
    }

    pub async fn classify(&self, text: &str) -> Result<String> {
        let res = self
            .client
            .post(format!("{url}/classify", url = self.url))
            .json(&ClassifyRequest { text })
            .send()
            .await
            .context("error executing classify request")?
            .error_for_status()
            .context("classifier returned an error status")?
            .json::<ClassifyResponse>()
            .await
            .context("error parsing classify response")?;

        Ok(res.category)
    }
}
