use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod pricing;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::dashboard_routes())
        .merge(handlers::subscription_routes())
}
