//! Route configuration for the master API.

use super::handlers::*;
use super::state::MasterState;
use axum::{
    routing::{get, post},
    Router,
};

/// Path of the master `init` route.
pub const INIT_ROUTE: &str = "/init/controller/{ip}/port/{port}/switch/{switch_type}/topology/{topo}/size/{size}/group/{group}/delay/{delay}/hosts/{hosts}";

/// Create the full router with all master routes.
pub fn create_router(state: MasterState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(INIT_ROUTE, post(init_handler))
        .route("/start", post(start_handler))
        .route("/get_switches", post(get_switches_handler))
        .route("/stop", post(stop_handler))
        .route("/ping_all", post(ping_all_handler))
        .route("/detect_hosts", post(detect_hosts_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{BroadcastConfig, Broadcaster};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn create_test_state() -> MasterState {
        MasterState {
            broadcaster: Broadcaster::new(BroadcastConfig::default()).unwrap(),
            default_port: 3333,
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_router_health() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_worker_list_succeeds() {
        let app = create_router(create_test_state());

        let response = app.oneshot(post_json("/start", "[]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_malformed_worker_entry_rejected() {
        let app = create_router(create_test_state());

        let response = app
            .clone()
            .oneshot(post_json("/stop", r#"["10.0.0.1", "10.0.0.2:notaport"]"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("notaport"));

        let response = app
            .oneshot(post_json("/stop", r#"{"workers": []}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_init_route_parses_path() {
        let app = create_router(create_test_state());

        let uri = "/init/controller/10.0.0.254/port/6653/switch/ovsk/topology/linear/size/10/group/3/delay/100/hosts/1";
        let response = app.clone().oneshot(post_json(uri, "[]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bad = "/init/controller/10.0.0.254/port/notaport/switch/ovsk/topology/linear/size/10/group/3/delay/100/hosts/1";
        let response = app.oneshot(post_json(bad, "[]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
