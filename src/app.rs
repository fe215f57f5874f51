use std::net::SocketAddr;

use axum::{middleware, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth, catalog, config::AppConfig, db, error::ApiError, health, history, notes, reactions, state::AppState,
    trials, users, wishlist,
};

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .merge(health::health_routes())
        .merge(auth::router())
        .merge(users::router())
        .merge(wishlist::router())
        .merge(notes::router())
        .merge(history::router())
        .merge(trials::router())
        .merge(reactions::router())
        .merge(catalog::router())
        .fallback(unknown_route)
        .layer(middleware::from_fn_with_state(state.clone(), db::require_store))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

async fn unknown_route() -> ApiError {
    ApiError::NotFound("route")
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install terminate handler");
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
}

#[cfg(test)]
mod app_tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::build_app;
    use crate::{
        db::{ConnectionMonitor, DbState},
        state::AppState,
    };

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            req = req.header("User-ID", user);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, user: Option<&str>) -> Request<Body> {
        let mut req = Request::get(uri);
        if let Some(user) = user {
            req = req.header("User-ID", user);
        }
        req.body(Body::empty()).unwrap()
    }

    async fn register(app: &Router, email: &str) -> Value {
        let (status, body) = call(
            app,
            post(
                "/users",
                None,
                json!({"name": "Ana", "email": email, "password": "secret123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn health_and_banner_need_no_identity() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["dbState"], "connected");

        let (status, body) = call(&app, get("/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn missing_and_unknown_identities_are_rejected() {
        let app = build_app(AppState::fake());

        let (status, body) = call(&app, get("/wishlist", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHENTICATED");

        let (status, body) = call(&app, get("/wishlist", Some("nobody"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "INVALID_IDENTITY");
    }

    #[tokio::test]
    async fn registration_then_duplicate_email() {
        let app = build_app(AppState::fake());
        let body = register(&app, "Ana@X.com").await;
        assert_eq!(body["user"]["email"], "ana@x.com");
        assert_eq!(body["user"]["trialPeriodDays"], 5);
        assert_eq!(body["user"]["language"], "es");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["token"].is_string());

        let (status, body) = call(
            &app,
            post(
                "/users",
                None,
                json!({"name": "Other", "email": "ana@x.com", "password": "secret123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "EMAIL_ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let app = build_app(AppState::fake());
        register(&app, "ana@x.com").await;

        let wrong_password = call(
            &app,
            post("/login", None, json!({"email": "ana@x.com", "password": "nope-nope"})),
        )
        .await;
        let unknown_email = call(
            &app,
            post("/login", None, json!({"email": "who@x.com", "password": "nope-nope"})),
        )
        .await;
        assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_email);

        let (status, body) = call(
            &app,
            post("/login", None, json!({"email": " ANA@x.com ", "password": "secret123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "ana@x.com");
    }

    #[tokio::test]
    async fn bearer_token_and_storage_key_both_identify() {
        let app = build_app(AppState::fake());
        let body = register(&app, "ana@x.com").await;
        let token = body["token"].as_str().unwrap().to_string();
        let user_id = body["user"]["userID"].as_str().unwrap().to_string();
        let key = body["user"]["_id"].as_str().unwrap().to_string();

        let req = Request::get("/verify-token")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["user"]["userID"], user_id.as_str());

        // storage key resolves to the same semantic id
        let (status, body) = call(&app, get("/profile", Some(&key))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userID"], user_id.as_str());

        let req = Request::get("/profile")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_lifecycle_over_http() {
        let app = build_app(AppState::fake());
        let user = register(&app, "ana@x.com").await["user"]["userID"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, test) = call(&app, post("/tests", Some(&user), json!({"itemID": "p1"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(test["completed"], false);
        assert_eq!(test["result"], Value::Null);

        let (status, body) = call(&app, post("/tests", Some(&user), json!({"itemID": "p1"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "TEST_IN_PROGRESS");

        let id = test["_id"].as_str().unwrap();
        let req = Request::put(format!("/tests/{id}"))
            .header("User-ID", user.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"result": "Safe"}).to_string()))
            .unwrap();
        let (status, done) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["completed"], true);
        assert_eq!(done["result"], "Safe");

        let (status, _) = call(&app, post("/tests", Some(&user), json!({"itemID": "p1"}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn records_of_other_users_are_not_found() {
        let app = build_app(AppState::fake());
        let ana = register(&app, "ana@x.com").await["user"]["userID"]
            .as_str()
            .unwrap()
            .to_string();
        let bob = register(&app, "bob@x.com").await["user"]["userID"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, item) = call(
            &app,
            post("/wishlist", Some(&ana), json!({"productID": "p1", "userID": bob.as_str()})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["userID"], ana.as_str());

        let id = item["_id"].as_str().unwrap();
        let req = Request::delete(format!("/wishlist/{id}"))
            .header("User-ID", bob.as_str())
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = call(&app, get("/wishlist", Some(&bob))).await;
        assert_eq!(list, json!([]));
        let (_, list) = call(&app, get("/wishlist", Some(&ana))).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let req = Request::delete("/wishlist/not-a-uuid")
            .header("User-ID", ana.as_str())
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reaction_upsert_reports_insert_then_update() {
        let app = build_app(AppState::fake());
        let user = register(&app, "ana@x.com").await["user"]["userID"]
            .as_str()
            .unwrap()
            .to_string();

        let body = json!({"productID": "p1", "reaction": "Critic"});
        let (status, _) = call(&app, post("/product-reactions", Some(&user), body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let body = json!({"productID": "p1", "reaction": "Safe"});
        let (status, saved) = call(&app, post("/product-reactions", Some(&user), body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["reaction"], "Safe");

        let (_, list) = call(&app, get("/product-reactions", Some(&user))).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let req = |user: &str| {
            Request::delete("/product-reactions/p1")
                .header("User-ID", user)
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(call(&app, req(&user)).await.0, StatusCode::OK);
        assert_eq!(call(&app, req(&user)).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = build_app(AppState::fake());
        let req = Request::post("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn requests_fail_fast_while_store_is_down() {
        let healthy = AppState::fake();
        let state = AppState::from_parts(
            healthy.store.clone(),
            healthy.config.clone(),
            Arc::new(ConnectionMonitor::new(DbState::Connecting)),
            healthy.provider.clone(),
        );
        let app = build_app(state);

        let (status, body) = call(&app, get("/wishlist", Some("u1"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "SERVICE_UNAVAILABLE");

        let (status, body) = call(&app, get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dbState"], "connecting");
    }

    fn put(uri: &str, user: &str, body: Value) -> Request<Body> {
        Request::put(uri)
            .header("User-ID", user)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn user_id(app: &Router, email: &str) -> String {
        register(app, email).await["user"]["userID"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn password_change_and_trial_period() {
        let app = build_app(AppState::fake());
        let user = user_id(&app, "ana@x.com").await;

        let body = json!({"currentPassword": "wrong-one", "newPassword": "another123"});
        let (status, body) = call(&app, post("/change-password", Some(&user), body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "INVALID_CREDENTIALS");

        let body = json!({"currentPassword": "secret123", "newPassword": "short"});
        let (status, body) = call(&app, post("/change-password", Some(&user), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "PASSWORD_TOO_SHORT");

        let body = json!({"currentPassword": "secret123", "newPassword": "another123"});
        let (status, _) = call(&app, post("/change-password", Some(&user), body)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(
            &app,
            post("/login", None, json!({"email": "ana@x.com", "password": "another123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            call(&app, post("/update-trial-period", Some(&user), json!({"trialDays": "ten"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_TRIAL_DAYS");

        let (status, body) =
            call(&app, post("/update-trial-period", Some(&user), json!({"trialDays": 10}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trialPeriodDays"], 10);
        let (_, profile) = call(&app, get("/profile", Some(&user))).await;
        assert_eq!(profile["trialPeriodDays"], 10);
    }

    #[tokio::test]
    async fn notes_are_validated_and_owner_scoped() {
        let app = build_app(AppState::fake());
        let ana = user_id(&app, "ana@x.com").await;
        let bob = user_id(&app, "bob@x.com").await;

        let (status, _) = call(
            &app,
            post("/productnotes", Some(&ana), json!({"productID": "p1", "note": "ok", "rating": 9})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, note) = call(
            &app,
            post("/productnotes", Some(&ana), json!({"productID": "p1", "note": "ok", "rating": 4})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/productnotes/{}", note["_id"].as_str().unwrap());

        let (status, _) = call(&app, put(&uri, &bob, json!({"note": "mine now"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, put(&uri, &ana, json!({"rating": 2}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = call(&app, put(&uri, &ana, json!({"note": "worse"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["note"], "worse");
        assert_eq!(updated["rating"], 4);
    }

    #[tokio::test]
    async fn history_defaults_timestamp_and_pages() {
        let app = build_app(AppState::fake());
        let user = user_id(&app, "ana@x.com").await;

        let (status, entry) = call(&app, post("/history", Some(&user), json!({"itemID": "p1"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(entry["timestamp"].is_string());

        let body = json!({"itemID": "p0", "timestamp": "2024-01-01T00:00:00Z"});
        let (status, _) = call(&app, post("/history", Some(&user), body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, page) = call(&app, get("/history?limit=1", Some(&user))).await;
        let page = page.as_array().unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["itemID"], "p1");
    }

    #[tokio::test]
    async fn catalog_is_shared_between_users() {
        let app = build_app(AppState::fake());
        let ana = user_id(&app, "ana@x.com").await;
        let bob = user_id(&app, "bob@x.com").await;

        let (status, _) = call(&app, post("/articles", Some(&ana), json!({"title": "Gluten"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = json!({"title": "Gluten", "content": "...", "tags": ["diet", " "]});
        let (status, article) = call(&app, post("/articles", Some(&ana), body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(article["tags"], json!(["diet"]));

        let body = json!({"name": "lactose", "properties": {"dairy": true}, "safetyLevel": "low"});
        let (status, _) = call(&app, post("/productingredients", Some(&ana), body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, articles) = call(&app, get("/articles", Some(&bob))).await;
        assert_eq!(articles.as_array().unwrap().len(), 1);
        let (_, ingredients) = call(&app, get("/productingredients", Some(&bob))).await;
        assert_eq!(ingredients[0]["safetyLevel"], "low");

        let (status, _) = call(&app, get("/articles", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn completing_a_test_needs_no_body() {
        let app = build_app(AppState::fake());
        let user = user_id(&app, "ana@x.com").await;
        let (_, test) = call(&app, post("/tests", Some(&user), json!({"itemID": "p1"}))).await;
        let uri = format!("/tests/{}", test["_id"].as_str().unwrap());

        let req = Request::put(&uri)
            .header("User-ID", user.as_str())
            .body(Body::empty())
            .unwrap();
        let (status, done) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["completed"], true);
        assert_eq!(done["result"], Value::Null);

        let req = Request::put(&uri)
            .header("User-ID", user.as_str())
            .body(Body::from("{oops"))
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn bad_paging_and_unknown_routes_render_as_json() {
        let app = build_app(AppState::fake());
        let user = user_id(&app, "ana@x.com").await;

        let (status, body) = call(&app, get("/history?limit=abc", Some(&user))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, body) = call(&app, get("/nope", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
        assert_eq!(body["message"], "route not found");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_signal_triggers_shutdown() {
        let waiter = tokio::spawn(super::shutdown_signal());
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .expect("shutdown future should resolve on SIGTERM")
            .unwrap();
    }
}
