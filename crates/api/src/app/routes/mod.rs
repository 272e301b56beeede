use axum::{Router, routing::get};

pub mod brigade_routes;
pub mod brigades;
pub mod invitations;
pub mod live;
pub mod members;
pub mod stations;
pub mod system;
pub mod verification;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(system::me))
        .route("/me/brigades", get(system::my_brigades))
        .merge(brigades::router())
        .merge(brigade_routes::router())
        .merge(members::router())
        .merge(invitations::router())
        .merge(verification::router())
        .merge(stations::router())
        .merge(live::router())
}
