//! Knowledge graph browsing routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::ApiResult;
use crate::state::AppState;
use gradkg_core::{Error, MajorType, Subject};
use gradkg_resolve::KgContext;
use gradkg_store::{SubstitutionGraph, SubstitutionLink};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/kg/{department}/{major_type}", get(get_kg))
        .route("/subjects/{id}/substitutes", get(get_substitutes))
}

/// GET /api/kg/{department}/{major_type}: every year's requirement rows
/// for one department, as used for cross-year chat answers.
async fn get_kg(
    State(state): State<Arc<AppState>>,
    Path((department, major_type)): Path<(String, String)>,
) -> ApiResult<KgContext> {
    let major_type: MajorType = major_type
        .parse()
        .map_err(|_| Error::InvalidInput(format!("Unknown major type: {}", major_type)))?;
    let ctx = KgContext::build(&state.store, &department, major_type)?;
    Ok(Json(ctx))
}

#[derive(Debug, Serialize)]
pub struct SubstitutesResponse {
    pub subject: Subject,
    /// Subjects that may be taken instead of this one.
    #[serde(rename = "acceptedFor")]
    pub accepted_for: Vec<SubstitutionLink>,
    /// Subjects this one may stand in for.
    #[serde(rename = "countsToward")]
    pub counts_toward: Vec<SubstitutionLink>,
    /// Ids reachable through chained substitutions.
    pub chain: Vec<String>,
}

/// GET /api/subjects/{id}/substitutes
async fn get_substitutes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SubstitutesResponse> {
    let subject = state
        .store
        .get_subject(&id)?
        .ok_or_else(|| Error::NotFound(format!("Subject {}", id)))?;
    let graph = SubstitutionGraph::from_edges(&state.store.all_substitutes()?);

    Ok(Json(SubstitutesResponse {
        accepted_for: graph.accepted_for(&id),
        counts_toward: graph.counts_toward(&id),
        chain: graph.chain(&id),
        subject,
    }))
}
