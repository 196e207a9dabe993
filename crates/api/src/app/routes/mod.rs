use axum::{routing::get, Router};

pub mod compat;
pub mod invoices;
pub mod system;

/// Router for all invoice endpoints (services are injected by `build_app`).
pub fn router() -> Router {
    Router::new()
        .nest("/invoices", invoices::router())
        .route(
            "/api/invoice",
            get(compat::fetch)
                .post(compat::create)
                .put(compat::update)
                .delete(compat::delete),
        )
}
