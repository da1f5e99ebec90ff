//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tally_core::credentials::hash_password;
use tally_core::models::{Role, User};
use tally_core::test_utils::{MockChatServer, MockReply};
use tally_core::MockBackend;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

struct TestApp {
    db: Database,
    alice: User,
    bob: User,
    admin: User,
}

impl TestApp {
    fn new() -> Self {
        let db = Database::in_memory().unwrap();
        let hash = hash_password("password123").unwrap();
        let alice = db.create_user("alice", &hash, Role::User).unwrap();
        let bob = db.create_user("bob", &hash, Role::User).unwrap();
        let admin = db.create_user("root", &hash, Role::Admin).unwrap();
        Self {
            db,
            alice,
            bob,
            admin,
        }
    }

    fn router(&self, ai: Option<AIClient>) -> Router {
        create_router_with_ai(self.db.clone(), config(), ai)
    }

    fn mock_router(&self) -> Router {
        self.router(Some(AIClient::mock()))
    }
}

fn config() -> ServerConfig {
    ServerConfig::new(AuthConfig::new(SECRET))
}

fn token_for(user: &User) -> String {
    auth::issue_token(&config().auth, user).unwrap().token
}

fn get(uri: &str, user: &User) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token_for(user)))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, user: Option<&User>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user)));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn message(user: &User, text: &str) -> Request<Body> {
    post_json("/api/ai/message", Some(user), json!({ "message": text }))
}

fn scripted(reply: &str) -> Option<AIClient> {
    Some(AIClient::Mock(MockBackend::with_replies(vec![
        reply.to_string()
    ])))
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ========== Auth API Tests ==========

#[tokio::test]
async fn test_register_returns_token() {
    let t = TestApp::new();

    let response = t
        .mock_router()
        .oneshot(post_json(
            "/auth/register",
            None,
            json!({ "username": "newbie", "password": "hunter22" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "user created");
    assert!(json["expires_at"].is_string());

    let caller = auth::verify_token(&config().auth, json["token"].as_str().unwrap()).unwrap();
    assert_eq!(caller.username, "newbie");
    assert_eq!(caller.role, Role::User);
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let t = TestApp::new();

    let response = t
        .mock_router()
        .oneshot(post_json(
            "/auth/register",
            None,
            json!({ "username": "alice", "password": "another-one" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = t
        .mock_router()
        .oneshot(post_json(
            "/auth/register",
            None,
            json!({ "username": "carol", "password": "123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t
        .mock_router()
        .oneshot(post_json(
            "/auth/register",
            None,
            json!({ "username": "cd", "password": "long-enough" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login() {
    let t = TestApp::new();

    let response = t
        .mock_router()
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "username": "alice", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "logged in");
    assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));

    for (username, password) in [("alice", "wrong-password"), ("nobody", "password123")] {
        let response = t
            .mock_router()
            .oneshot(post_json(
                "/auth/login",
                None,
                json!({ "username": username, "password": password }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = get_body_json(response).await;
        assert_eq!(json["error"], "invalid credentials");
    }
}

#[tokio::test]
async fn test_middleware_rejections() {
    let t = TestApp::new();

    let cases = [
        (None, "Authorization header missing"),
        (Some("Token abc".to_string()), "Invalid Authorization header"),
        (Some("Bearer ".to_string()), "Invalid Authorization header"),
        (Some("Bearer not.a.jwt".to_string()), "Invalid or expired token"),
    ];

    for (header, expected) in cases {
        let mut builder = Request::builder().uri("/api/me");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let response = t
            .mock_router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = get_body_json(response).await;
        assert_eq!(json["error"], expected);
    }
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let t = TestApp::new();
    let foreign = auth::issue_token(&AuthConfig::new("other"), &t.alice)
        .unwrap()
        .token;

    let response = t
        .mock_router()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", format!("Bearer {}", foreign))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me() {
    let t = TestApp::new();

    let response = t
        .mock_router()
        .oneshot(get("/api/me", &t.admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["user_id"], t.admin.id);
    assert_eq!(json["username"], "root");
    assert_eq!(json["role"], "admin");
}

// ========== Message API Tests ==========

#[tokio::test]
async fn test_message_add() {
    let t = TestApp::new();

    let response = t
        .mock_router()
        .oneshot(message(&t.alice, "I bought a desk lamp for 35 dollars"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json["message"].is_string());
    assert_eq!(json["purchase"]["title"], "desk lamp");
    assert_eq!(json["purchase"]["amount"], 35.0);
    assert_eq!(json["purchase"]["user_id"], t.alice.id);
    assert_eq!(json["purchase"]["status"], "confirmed");
}

#[tokio::test]
async fn test_message_query_is_scoped() {
    let t = TestApp::new();
    let app = t.mock_router();

    app.clone()
        .oneshot(message(&t.alice, "I bought a lamp for 20"))
        .await
        .unwrap();
    app.clone()
        .oneshot(message(&t.bob, "I bought a bike for 200"))
        .await
        .unwrap();

    // the model asks for bob's purchases on alice's behalf
    let reply = format!(
        r#"{{"action":"query","request_context":{{"user_role":"admin","target_users":[{}]}},"assistant_reply":"Here."}}"#,
        t.bob.id
    );
    let response = t
        .router(scripted(&reply))
        .oneshot(message(&t.alice, "show bob's purchases"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Here.");
    assert_eq!(json["total"], 1);
    assert_eq!(json["purchases"][0]["user_id"], t.alice.id);
}

#[tokio::test]
async fn test_message_analyze() {
    let t = TestApp::new();
    let app = t.mock_router();

    for text in ["I bought lunch for 12", "I bought a book for 30"] {
        let response = app.clone().oneshot(message(&t.alice, text)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(message(&t.alice, "analyze my spending"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("42.00"));
    assert_eq!(json["analysis"]["total_amount"], 42.0);
    assert_eq!(json["analysis"]["purchase_count"], 2);
    // the mock backend leaves category blank
    assert_eq!(json["analysis"]["top_category"], "");
    assert_eq!(json["analysis"]["top_category_total"], 42.0);
}

#[tokio::test]
async fn test_message_malformed_output() {
    let t = TestApp::new();

    let response = t
        .router(scripted("```json\n{\"action\":\"add\"}\n```"))
        .oneshot(message(&t.alice, "I bought a lamp for 20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = get_body_json(response).await;
    assert_eq!(json["raw_ai"], "```json\n{\"action\":\"add\"}\n```");
    assert!(t.db.list_ai_logs(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_message_unknown_action() {
    let t = TestApp::new();

    let response = t
        .router(scripted(r#"{"action":"delete","assistant_reply":"I can't delete things."}"#))
        .oneshot(message(&t.alice, "delete everything"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "unknown action");
    assert_eq!(json["message"], "I can't delete things.");
}

#[tokio::test]
async fn test_message_invalid_purchase() {
    let t = TestApp::new();

    let response = t
        .router(scripted(
            r#"{"action":"add","data":{"title":"","amount":"-4"},"assistant_reply":"What did you buy?"}"#,
        ))
        .oneshot(message(&t.alice, "I bought something"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "title is required");
    assert_eq!(json["message"], "What did you buy?");
}

#[tokio::test]
async fn test_message_summarizer_failure() {
    let t = TestApp::new();
    let ai = AIClient::Mock(
        MockBackend::with_replies(vec![r#"{"action":"analyze"}"#.to_string()]).failing_summary(),
    );

    let response = t
        .router(Some(ai))
        .oneshot(message(&t.alice, "analyze"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = get_body_json(response).await;
    assert!(json["error"].is_string());
    assert!(json["raw"].as_str().is_some_and(|r| !r.is_empty()));
}

#[tokio::test]
async fn test_message_validation_and_missing_backend() {
    let t = TestApp::new();

    let response = t
        .mock_router()
        .oneshot(message(&t.alice, "   "))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t
        .router(None)
        .oneshot(message(&t.alice, "I bought a lamp for 20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_message_through_chat_completions_backend() {
    let t = TestApp::new();
    let server = MockChatServer::start().await;
    server.push(MockReply::content(
        r#"{"action":"add","data":{"title":"Tea","amount":6,"category":"Food"},"assistant_reply":"Logged your tea."}"#,
    ));

    let ai = AIClient::openai_compatible(&server.url(), "test-model");
    let response = t
        .router(Some(ai))
        .oneshot(message(&t.alice, "I bought tea for 6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Logged your tea.");
    assert_eq!(json["purchase"]["category"], "Food");
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_message_upstream_error() {
    let t = TestApp::new();
    let server = MockChatServer::start().await;
    server.push(MockReply::status(500, "model crashed"));

    let ai = AIClient::openai_compatible(&server.url(), "test-model");
    let response = t
        .router(Some(ai))
        .oneshot(message(&t.alice, "I bought tea for 6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = get_body_json(response).await;
    assert_eq!(json["raw"], "model crashed");
}

// ========== Purchases & Logs API Tests ==========

#[tokio::test]
async fn test_list_purchases_scoping() {
    let t = TestApp::new();
    let app = t.mock_router();

    app.clone()
        .oneshot(message(&t.alice, "I bought a lamp for 20"))
        .await
        .unwrap();
    app.clone()
        .oneshot(message(&t.bob, "I bought a bike for 200"))
        .await
        .unwrap();

    // a plain user cannot look at someone else's purchases
    let uri = format!("/api/purchases?user_id={}", t.bob.id);
    let response = app.clone().oneshot(get(&uri, &t.alice)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["purchases"][0]["title"], "lamp");

    // an admin can
    let response = app.clone().oneshot(get(&uri, &t.admin)).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["purchases"][0]["title"], "bike");

    // and sees everything without a user_id
    let response = app.oneshot(get("/api/purchases", &t.admin)).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn test_ai_logs_admin_only() {
    let t = TestApp::new();
    let app = t.mock_router();

    app.clone()
        .oneshot(message(&t.alice, "show my purchases"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/ai/logs", &t.alice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get("/api/ai/logs?limit=5", &t.admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let logs = json.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["user_id"], t.alice.id);
    assert_eq!(logs[0]["input_text"], "show my purchases");
}

// ========== Misc ==========

#[tokio::test]
async fn test_security_headers() {
    let t = TestApp::new();

    let response = t
        .mock_router()
        .oneshot(get("/api/me", &t.alice))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
}

#[test]
fn test_parse_origins() {
    assert_eq!(
        parse_origins(" http://a.test, ,http://b.test "),
        vec!["http://a.test".to_string(), "http://b.test".to_string()]
    );
    assert!(parse_origins("").is_empty());
}

#[test]
fn test_core_error_mapping() {
    let err = AppError::from(tally_core::Error::Conflict("taken".into()));
    assert_eq!(err.status, StatusCode::CONFLICT);

    let err = AppError::from(tally_core::Error::InvalidData("lock".into()));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "An internal error occurred");
}
