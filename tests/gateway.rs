mod common;

use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use authz_gateway::api::handlers::fallback::no_route;
use common::{TestGateway, echo_upstream, json_body, openapi, request, token, token_with};

fn orders_and_metadata() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        (
            "orders",
            openapi(&[
                ("GET", "/api/orders", "USER,ADMIN"),
                ("DELETE", "/api/orders/{id}", "ADMIN"),
                ("GET", "/api/orders/{id}", ""),
            ]),
        ),
        (
            "metadata",
            openapi(&[
                ("GET", "/api/metadata/{id}", "ADMIN"),
                ("GET", "/api/metadata/public", "USER"),
            ]),
        ),
    ]
}

#[tokio::test]
async fn user_without_required_role_gets_403_naming_it() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;
    let bearer = token("u-1", &["USER"]);

    let response = gw
        .router
        .oneshot(request(Method::DELETE, "/api/orders/42", Some(&bearer)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(body["error"]["required_roles"], json!(["ADMIN"]));
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("ADMIN")
    );
}

#[tokio::test]
async fn same_user_passes_through_on_unrestricted_route() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;
    let bearer = token("u-1", &["USER"]);

    // Declared without roles, and not declared at all.
    for path in ["/api/orders/42", "/api/unknown/thing"] {
        let response = gw
            .router
            .clone()
            .oneshot(request(Method::GET, path, Some(&bearer)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(json_body(response).await["path"], path);
    }
}

#[tokio::test]
async fn any_one_required_role_is_enough() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;

    for roles in [&["USER"][..], &["ADMIN"][..], &["ADMIN", "AUDITOR"][..]] {
        let response = gw
            .router
            .clone()
            .oneshot(request(Method::GET, "/api/orders", Some(&token("u", roles))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{roles:?}");
    }

    let response = gw
        .router
        .oneshot(request(
            Method::GET,
            "/api/orders",
            Some(&token("u", &["AUDITOR"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn exact_route_wins_over_template() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;
    let user = token("u", &["USER"]);

    // `/api/metadata/public` (USER) shadows `/api/metadata/{id}` (ADMIN).
    let response = gw
        .router
        .clone()
        .oneshot(request(Method::GET, "/api/metadata/public", Some(&user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = gw
        .router
        .clone()
        .oneshot(request(Method::GET, "/api/metadata/42", Some(&user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Variables never span segments.
    let response = gw
        .router
        .oneshot(request(Method::GET, "/api/metadata/42/extra", Some(&user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_invalid_token_is_401() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;

    let response = gw
        .router
        .clone()
        .oneshot(request(Method::DELETE, "/api/orders/1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({ "error": { "code": "UNAUTHORIZED", "message": "unauthorized" } })
    );

    let expired = token_with(json!({
        "sub": "u",
        "exp": chrono::Utc::now().timestamp() - 600,
        "realm_access": { "roles": ["ADMIN"] }
    }));
    let wrong_issuer = token_with(json!({
        "sub": "u",
        "iss": "http://elsewhere/realms/x",
        "realm_access": { "roles": ["ADMIN"] }
    }));

    for bearer in [expired.as_str(), wrong_issuer.as_str(), "garbage"] {
        let response = gw
            .router
            .clone()
            .oneshot(request(Method::GET, "/api/orders/1", Some(bearer)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn identity_headers_are_forwarded_and_spoofs_replaced() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;
    let bearer = token("u-7", &["USER", "ADMIN"]);

    let mut req = request(Method::GET, "/api/orders", Some(&bearer));
    req.headers_mut()
        .insert("x-user-id", HeaderValue::from_static("root"));
    req.headers_mut()
        .insert("x-user-roles", HeaderValue::from_static("ROLE_SUPERUSER"));

    let response = gw.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["x-user-id"], "u-7");
    assert_eq!(body["x-user-email"], "u-7@example.com");
    assert_eq!(body["x-user-roles"], "ROLE_ADMIN,ROLE_USER");
}

#[tokio::test]
async fn token_without_email_or_roles_forwards_only_the_subject() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;
    let bearer = token_with(json!({ "sub": "svc-account" }));

    let mut req = request(Method::GET, "/api/orders/9", Some(&bearer));
    req.headers_mut()
        .insert("x-user-email", HeaderValue::from_static("spoof@example.com"));

    let body = json_body(gw.router.oneshot(req).await.unwrap()).await;
    assert_eq!(body["x-user-id"], "svc-account");
    assert_eq!(body["x-user-email"], serde_json::Value::Null);
    assert_eq!(body["x-user-roles"], serde_json::Value::Null);
}

#[tokio::test]
async fn health_and_info_are_public() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;

    let response = gw
        .router
        .clone()
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "status": "ok", "rules_loaded": true })
    );

    let response = gw
        .router
        .oneshot(request(Method::GET, "/info", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let info = json_body(response).await;
    assert_eq!(info["generation"], 1);
    assert_eq!(info["rule_count"], 4);
    assert_eq!(info["services"][0]["service"], "orders");
    assert_eq!(info["services"][0]["rules"], 2);
    assert_eq!(info["services"][0]["freshness"], "fresh");
    assert_eq!(info["services"][1]["service"], "metadata");
}

#[tokio::test]
async fn decisions_follow_the_latest_refresh() {
    let gw = TestGateway::start(&orders_and_metadata(), echo_upstream()).await;
    let user = token("u", &["USER"]);

    // orders now locks its collection down to ADMIN; metadata goes away.
    gw.fetcher
        .set("orders", openapi(&[("GET", "/api/orders", "ADMIN")]));
    gw.fetcher.remove("metadata");
    let report = gw.state.registry.refresh().await;
    assert!(report.published);
    assert_eq!(report.failures().count(), 1);

    let response = gw
        .router
        .clone()
        .oneshot(request(Method::GET, "/api/orders", Some(&user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // metadata failed to refresh: its previous rules still apply.
    let response = gw
        .router
        .oneshot(request(Method::GET, "/api/metadata/42", Some(&user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn no_rules_loaded_means_everything_is_unrestricted() {
    let gw = TestGateway::start(&[], echo_upstream()).await;

    let response = gw
        .router
        .clone()
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["rules_loaded"], false);

    let response = gw
        .router
        .oneshot(request(
            Method::DELETE,
            "/api/orders/1",
            Some(&token("u", &[])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unclaimed_requests_get_no_route_after_authz() {
    let gw = TestGateway::start(&orders_and_metadata(), Router::new().fallback(no_route)).await;

    let response = gw
        .router
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/orders",
            Some(&token("u", &["USER"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "NO_ROUTE");

    // Authz still runs first.
    let response = gw
        .router
        .oneshot(request(
            Method::DELETE,
            "/api/orders/1",
            Some(&token("u", &["USER"])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn request_id_is_generated_and_returned() {
    let gw = TestGateway::start(&[], echo_upstream()).await;

    let response = gw
        .router
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
