// Interview subject templates per form type, and per-applicant marks laid
// over them. `marks` is pure; `templates` owns the SQL.

pub mod handlers;
pub mod marks;
pub mod templates;

use axum::{
    routing::{get, put},
    Router,
};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/admin/interview-templates",
            get(handlers::handle_list_templates),
        )
        .route(
            "/api/v1/admin/interview-templates/:form_type",
            put(handlers::handle_replace_templates),
        )
        .route(
            "/api/v1/admin/applications/:form_type/:id/interview-marks",
            get(handlers::handle_get_marks).put(handlers::handle_save_marks),
        )
}
