use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/materials", material_routes())
        .nest("/stats", stats_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn material_routes() -> Router<AppState> {
    let mutating = Router::new()
        .route(
            "/",
            get(handlers::material::list_materials).post(handlers::material::upload_material),
        )
        .route(
            "/{id}",
            put(handlers::material::update_material)
                .delete(handlers::material::delete_material),
        )
        .layer(handlers::material::material_upload_body_limit());

    let fetch = Router::new()
        .route("/{id}/download", get(handlers::material::download_material))
        .route("/{id}/view", get(handlers::material::view_material));

    mutating.merge(fetch)
}

fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/activity", get(handlers::stats::activity_stats))
        .route("/access", get(handlers::stats::access_stats))
}
