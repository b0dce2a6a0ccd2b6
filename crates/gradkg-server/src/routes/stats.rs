//! Stats routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use super::ApiResult;
use crate::state::AppState;
use gradkg_store::SubstitutionGraph;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(get_stats))
}

/// GET /api/stats: graph and passage counts.
async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let stats = state.store.get_stats()?;
    let graph = SubstitutionGraph::from_edges(&state.store.all_substitutes()?).stats();

    Ok(axum::Json(serde_json::json!({
        "requirements": stats.requirements,
        "subjects": stats.subjects,
        "includes": stats.includes,
        "substitutes": stats.substitutes,
        "passages": stats.passages,
        "substitutionGraph": {
            "nodes": graph.node_count,
            "edges": graph.edge_count,
        },
        "dbSizeMb": stats.db_size_mb,
        "latestYear": state.config.latest_year,
    })))
}
