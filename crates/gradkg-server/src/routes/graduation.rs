//! Graduation check routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::ApiResult;
use crate::state::AppState;
use gradkg_core::{Error, MajorType};
use gradkg_resolve::{parse_taken_courses, GraduationQuery, GraduationReport, GraduationResolver};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/departments", get(get_departments))
        .route("/graduation/check", post(check))
}

/// GET /api/departments: selectable departments and admission years.
async fn get_departments(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "departments": state.config.departments(),
        "years": state.config.year_options(),
        "latestYear": state.config.latest_year,
        "majorTypes": MajorType::ALL.iter().map(|m| m.label()).collect::<Vec<_>>(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(rename = "admissionYear")]
    pub admission_year: i32,
    pub department: String,
    #[serde(rename = "majorType")]
    pub major_type: MajorType,
    /// Course names, one per entry.
    #[serde(default, rename = "takenCourses")]
    pub taken_courses: Vec<String>,
    /// Course names as free text, separated by commas or newlines.
    #[serde(default, rename = "takenText")]
    pub taken_text: Option<String>,
}

impl CheckRequest {
    fn into_query(self) -> GraduationQuery {
        let mut taken: Vec<String> = self
            .taken_courses
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if let Some(text) = &self.taken_text {
            for name in parse_taken_courses(text) {
                if !taken.contains(&name) {
                    taken.push(name);
                }
            }
        }
        GraduationQuery {
            year: self.admission_year,
            department: self.department.trim().to_string(),
            major_type: self.major_type,
            taken,
        }
    }
}

/// POST /api/graduation/check: reconcile taken courses against the
/// requirement for the student's year, department and major type.
async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> ApiResult<GraduationReport> {
    let query = req.into_query();
    if query.department.is_empty() {
        return Err(Error::InvalidInput("department is required".into()).into());
    }
    let report = GraduationResolver::check(&state.store, &query)?;
    info!(
        "Graduation check {} {} {}: {} taken, {} missing",
        query.year,
        query.department,
        query.major_type.label(),
        query.taken.len(),
        report.missing_count()
    );
    Ok(Json(report))
}
