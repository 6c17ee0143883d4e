use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod reset;
pub mod store;
pub mod token;
pub mod verification;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::verification_routes())
        .merge(handlers::reset_routes())
}
