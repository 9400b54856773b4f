// Admissions: public KG & STD and +1 applications, tracking, generated
// documents, and the back-office review pipeline. SQL lives in `repository`;
// the handlers in each module stay thin.

pub mod documents;
pub mod forms;
pub mod numbering;
pub mod repository;
pub mod review;
pub mod submission;
pub mod tracking;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Public
        .route(
            "/api/v1/admissions/kg-std",
            post(submission::handle_submit_kg_std),
        )
        .route(
            "/api/v1/admissions/plus-one",
            post(submission::handle_submit_plus_one),
        )
        .route("/api/v1/admissions/forms", get(forms::handle_list_forms))
        .route("/api/v1/admissions/track", post(tracking::handle_track))
        .route(
            "/api/v1/admissions/interview-letter",
            post(documents::handle_interview_letter),
        )
        .route(
            "/api/v1/admissions/application-copy",
            post(documents::handle_application_copy),
        )
        // Back office
        .route(
            "/api/v1/admin/admission-forms/:form_type",
            put(forms::handle_update_form),
        )
        .route("/api/v1/admin/applications", get(review::handle_list))
        .route(
            "/api/v1/admin/applications/stats",
            get(review::handle_stats),
        )
        .route(
            "/api/v1/admin/applications/bulk-delete",
            post(review::handle_bulk_delete),
        )
        .route(
            "/api/v1/admin/applications/:form_type/:id",
            get(review::handle_detail).delete(review::handle_delete),
        )
        .route(
            "/api/v1/admin/applications/:form_type/:id/status",
            patch(review::handle_update_status),
        )
}
