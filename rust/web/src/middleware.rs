use std::time::Instant;
use warp::filters::BoxedFilter;
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::reply::Response;
use warp::Filter;

/// Wrap the API so every request logs `incoming request` and, once a
/// response exists, its status at a level matching the status class.
pub fn with_request_logging(
    routes: BoxedFilter<(Response,)>,
) -> BoxedFilter<(Response,)> {
    warp::any()
        .and(warp::path::full())
        .and(warp::method())
        .map(|path: FullPath, method: Method| {
            tracing::info!(path = %path.as_str(), method = %method, "incoming request");
            (Instant::now(), path, method)
        })
        .and(routes)
        .map(
            |(start, path, method): (Instant, FullPath, Method), response: Response| {
                let duration_ms = start.elapsed().as_millis();
                log_response(response.status(), path.as_str(), method.as_str(), duration_ms);
                response
            },
        )
        .boxed()
}

pub fn log_response(status: StatusCode, path: &str, method: &str, duration_ms: u128) {
    if status.is_server_error() {
        tracing::error!(
            status = status.as_u16(),
            path = %path,
            method = %method,
            duration_ms,
            "request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            status = status.as_u16(),
            path = %path,
            method = %method,
            duration_ms,
            "request completed with client error"
        );
    } else {
        tracing::info!(
            status = status.as_u16(),
            path = %path,
            method = %method,
            duration_ms,
            "request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TestLogSubscriber;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;
    use warp::Reply;

    fn routes() -> BoxedFilter<(Response,)> {
        let ok = warp::path!("api" / "shoe")
            .and(warp::get())
            .map(|| warp::reply::json(&"ok").into_response());
        let missing = warp::path!("api" / "history" / "undo")
            .and(warp::post())
            .map(|| {
                warp::reply::with_status(warp::reply::json(&"empty"), StatusCode::BAD_REQUEST)
                    .into_response()
            });
        ok.or(missing).unify().boxed()
    }

    #[tokio::test]
    async fn logs_incoming_and_completed_requests() {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());
        let _guard = tracing::subscriber::set_default(registry);

        let filter = with_request_logging(routes());
        let response = warp::test::request()
            .method("GET")
            .path("/api/shoe")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(subscriber.contains(Level::INFO, "incoming request"));
        let completed = subscriber
            .entries()
            .into_iter()
            .find(|e| e.message == "request completed")
            .expect("completion logged");
        assert_eq!(completed.field("status"), Some("200"));
        assert_eq!(completed.field("path"), Some("/api/shoe"));
    }

    #[tokio::test]
    async fn client_errors_log_at_warn() {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());
        let _guard = tracing::subscriber::set_default(registry);

        let filter = with_request_logging(routes());
        let response = warp::test::request()
            .method("POST")
            .path("/api/history/undo")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(subscriber.contains(Level::WARN, "client error"));
    }

    #[test]
    fn server_errors_log_at_error() {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());

        tracing::subscriber::with_default(registry, || {
            log_response(StatusCode::INTERNAL_SERVER_ERROR, "/api/train", "POST", 12);
        });

        let entries = subscriber.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::ERROR);
        assert_eq!(entries[0].field("method"), Some("POST"));
    }
}
