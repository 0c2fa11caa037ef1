use axum::Router;
use axum::http::HeaderName;
use migration::MigratorTrait;
use sea_orm::Database;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::web::{TaskState, create_task_router};

/// Builds the application router: the task routes, static assets under
/// `/static`, request tracing, and CORS exposure of the HTMX trigger header.
pub fn create_app(state: Arc<TaskState>, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .merge(create_task_router(state))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().expose_headers([HeaderName::from_static("hx-trigger")])),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let server_address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Arc::new(db);
    let task_state = Arc::new(TaskState { db: Arc::clone(&db) });
    let app = create_app(task_state, &config.static_dir);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router, and with it the last state handle, is dropped once serve returns.
    match Arc::try_unwrap(db) {
        Ok(db) => {
            db.close().await?;
            tracing::info!("Database connection pool closed");
        }
        Err(_) => tracing::warn!("Database pool still shared at shutdown, leaving it to drop"),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("Failed to listen for SIGTERM: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    fn app() -> Router {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        create_app(
            Arc::new(TaskState { db: Arc::new(db) }),
            concat!(env!("CARGO_MANIFEST_DIR"), "/static"),
        )
    }

    #[tokio::test]
    async fn can_serve_static_assets() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/static/style.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/css");
    }

    #[tokio::test]
    async fn missing_static_asset_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/static/missing.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn can_expose_hx_trigger_to_cross_origin_clients() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("access-control-expose-headers")
                .unwrap(),
            "hx-trigger"
        );
    }
}
