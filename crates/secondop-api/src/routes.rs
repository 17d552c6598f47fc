//! API Routes

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Create API v1 routes
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/users", user_routes())
        .route("/doctors", get(handlers::users::find_doctors))
        .nest("/wallet", wallet_routes())
        .nest("/cases", case_routes())
        .route("/assist/refine", post(handlers::platform::refine_symptoms))
        .route("/leaderboard", get(handlers::platform::leaderboard))
        .route("/leaderboard/me", get(handlers::platform::my_standing))
        .nest("/admin", admin_routes())
        .route(
            "/locale",
            get(handlers::platform::get_locale).put(handlers::platform::set_locale),
        )
        .route("/locale/toggle", post(handlers::platform::toggle_locale))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            post(handlers::users::register).get(handlers::users::list_users),
        )
        .route("/me", get(handlers::users::me))
        .route(
            "/:id",
            get(handlers::users::get_user)
                .patch(handlers::users::update_profile)
                .delete(handlers::users::delete_user),
        )
        .route("/:id/approval", put(handlers::users::set_approval))
}

fn wallet_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deposit", post(handlers::wallet::deposit))
        .route("/withdraw", post(handlers::wallet::withdraw))
        .route("/transactions", get(handlers::wallet::transactions))
}

fn case_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            post(handlers::cases::create_case).get(handlers::cases::list_cases),
        )
        .route("/available", get(handlers::cases::available_cases))
        .route("/:id", get(handlers::cases::get_case))
        .route("/:id/opinion", post(handlers::cases::submit_opinion))
        .route("/:id/rating", post(handlers::cases::rate_doctor))
        .route("/:id/analysis", get(handlers::cases::analyze_case))
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(handlers::platform::platform_stats))
        .route("/audit", get(handlers::platform::audit_balances))
}
