use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config, data::Data, ingest::narration::NarrationParser, services::classifier::Classifier,
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub data: Data,
    pub config: Arc<Config>,
    pub classifier: Classifier,
    pub narration: Arc<NarrationParser>,
}
