use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::engine::earnings::{self, EarningsReport, Period};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/admin/earnings", get(get_earnings))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct EarningsQuery {
    pub period: Period,
}

async fn get_earnings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EarningsQuery>,
) -> Json<EarningsReport> {
    Json(earnings::aggregate(&state, query.period))
}
