use crate::{
    catalog::MetricCatalog,
    exporter::Exporter,
    exposition::{
        self,
        CONTENT_TYPE,
    },
    sink::{
        drain,
        SampleSink,
    },
};
use axum::{
    extract::State,
    http::{
        header,
        StatusCode,
    },
    response::{
        IntoResponse,
        Redirect,
        Response,
    },
    routing::get,
    Router,
};
use std::{
    future::Future,
    sync::Arc,
};
use tokio::net::TcpListener;

const HEALTH_PATH: &str = "/healthz";

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("cannot encode the scraped metrics: {0}")]
    Encode(#[from] prometheus::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!(error = %self, "scrape failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

pub struct AppState {
    pub exporter: Exporter,
    pub catalog: MetricCatalog,
}

/// Any path that is neither the telemetry path nor the health check redirects to the telemetry path.
pub fn create_router(telemetry_path: &str, state: AppState) -> Router {
    let mut router = Router::new().route(telemetry_path, get(metrics));
    if telemetry_path != HEALTH_PATH {
        router = router.route(HEALTH_PATH, get(healthz));
    }
    let target = telemetry_path.to_string();
    router
        .fallback(move || {
            let target = target.clone();
            async move { Redirect::permanent(&target) }
        })
        .with_state(Arc::new(state))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ServerError> {
    let (sink, receiver) = SampleSink::channel();
    let outcome = state.exporter.scrape(&sink).await;
    drop(sink);
    let samples = drain(receiver).await;
    debug!(?outcome, samples = samples.len(), "scraped");

    let body = exposition::render(&state.catalog, &samples)?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response())
}

/// Serves until `shutdown` resolves, letting in-flight scrapes finish.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> eyre::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{
            signal,
            SignalKind,
        };
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{
        to_bytes,
        Body,
    };
    use axum::http::Request;
    use bastion_exporter_config::{
        Args,
        Config,
    };
    use clap::Parser as _;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt as _;

    fn router(telemetry_path: &str) -> Router {
        // Nothing listens there, scrapes report the bastion as down.
        let args = Args::try_parse_from([
            "wallix-bastion-exporter",
            "--config-dir",
            "/nonexistent",
            "-u",
            "admin",
            "-p",
            "s3cret",
            "-w",
            "http://127.0.0.1:1/api",
            "-t",
            "2",
        ])
        .unwrap();
        let config = Config::load(args).unwrap();
        let state = AppState {
            exporter: Exporter::new(&config).unwrap(),
            catalog: MetricCatalog::new(config.sessions_closed_window),
        };
        create_router(telemetry_path, state)
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_telemetry() {
        let response = get(router("/probe"), "/").await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/probe");
    }

    #[tokio::test]
    async fn health() {
        let response = get(router("/metrics"), "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn unreachable_bastion_still_answers() {
        let response = get(router("/metrics"), "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], CONTENT_TYPE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("wallix_bastion_up 0\n"), "{body}");
        assert!(!body.contains("wallix_bastion_users"), "{body}");
    }

    #[tokio::test]
    async fn unknown_paths_redirect_to_telemetry() {
        let response = get(router("/metrics"), "/nope/deeper").await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/metrics");
    }

    #[tokio::test]
    async fn telemetry_on_root() {
        let response = get(router("/"), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = get(router("/"), "/other").await;
        assert_eq!(response.headers()[header::LOCATION], "/");
    }
}
