//! REST layer: routing, authentication, status codes and problem documents

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use school_service::api::rest::routes::register_routes;
use school_service::contract::*;
use school_service::domain::repository::TokenRepository;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{Classroom, TestEnv, SCHOOL_LAT, SCHOOL_LON};

fn router(env: &TestEnv) -> Router {
    register_routes(Router::new(), env.service.clone())
}

/// Issue a token for a fixture user without going through login
async fn token_for(env: &TestEnv, user: &User) -> String {
    let token = AuthToken {
        key: format!("token-{}", user.id),
        user_id: user.id,
        created: env.service.now(),
    };
    TokenRepository::create(&env.store, &token).await.unwrap();
    token.key
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_then_me() {
    let env = TestEnv::new();
    let app = router(&env);

    let response = send(
        &app,
        "POST",
        "/api/users/register",
        None,
        Some(json!({
            "username": "alice",
            "email": "alice@school.test",
            "password": "correct-horse",
            "first_name": "Alice",
            "last_name": "Smith",
            "role": "student"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["role"], "student");

    let response = send(&app, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = json_body(response).await;
    assert_eq!(me["username"], "alice");
    assert_eq!(me["profile"]["level"], 1);
}

#[tokio::test]
async fn missing_token_is_a_401_problem() {
    let env = TestEnv::new();
    let app = router(&env);

    let response = send(&app, "GET", "/api/grades", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Token"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    let problem = json_body(response).await;
    assert_eq!(problem["status"], 401);
}

#[tokio::test]
async fn expired_token_is_a_401() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;

    env.clock.advance(chrono::Duration::hours(25));
    let response = send(&app, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(env.store.token_count(), 0);
}

#[tokio::test]
async fn bearer_scheme_is_accepted() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;

    let request = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_is_a_400_problem() {
    let env = TestEnv::new();
    let app = router(&env);

    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let problem = json_body(response).await;
    assert_eq!(problem["status"], 400);
}

#[tokio::test]
async fn wrong_password_is_a_400() {
    let env = TestEnv::new();
    let app = router(&env);

    let response = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "nobody", "password": "whatever1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mark_attendance_reports_created_then_updated() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;
    let body = json!({"latitude": SCHOOL_LAT, "longitude": SCHOOL_LON.to_string()});

    let response = send(
        &app,
        "POST",
        "/api/attendances/mark_attendance",
        Some(&token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let check_in = json_body(response).await;
    assert_eq!(check_in["status"], "present");

    let response = send(
        &app,
        "POST",
        "/api/attendances/mark_attendance",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/attendances/today", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn mark_attendance_requires_coordinates() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;

    let response = send(
        &app,
        "POST",
        "/api/attendances/mark_attendance",
        Some(&token),
        Some(json!({"latitude": "north"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_students_check_in_whatever_the_body() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.parent).await;

    let response = send(
        &app,
        "POST",
        "/api/attendances/mark_attendance",
        Some(&token),
        Some(json!({"latitude": "north"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn hidden_grade_is_a_404() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let grade = env
        .service
        .create_grade(
            &room.teacher,
            NewGrade {
                student_id: room.bob.id,
                subject_id: room.subject.id,
                value: 42.0,
                date: None,
                comments: None,
            },
        )
        .await
        .unwrap();
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;

    let response = send(
        &app,
        "GET",
        &format!("/api/grades/{}", grade.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/api/grades", Some(&token), None).await;
    let page = json_body(response).await;
    assert_eq!(page["total"], 0);
    assert_eq!(page["page_size"], 10);
}

#[tokio::test]
async fn non_staff_write_is_a_403() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.teacher).await;

    let response = send(
        &app,
        "POST",
        "/api/schools",
        Some(&token),
        Some(json!({
            "name": "Another school",
            "address": "2 Side Street",
            "email": "office@another.test"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_parameters_on_the_wire() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.staff).await;

    let response = send(&app, "GET", "/api/subjects?page=zero", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // unknown keys are ignored, oversized pages are capped
    let response = send(
        &app,
        "GET",
        "/api/subjects?format=json&page_size=1000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["page_size"], 100);

    let response = send(&app, "GET", "/api/subjects?page=9", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        "GET",
        "/api/subjects?search=mat&ordering=-name",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["items"][0]["name"], "Math");
}

#[tokio::test]
async fn leaderboard_metric_is_validated() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;

    let response = send(&app, "GET", "/api/leaderboard", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    assert_eq!(board["metric"], "xp");
    assert_eq!(board["entries"].as_array().unwrap().len(), 2);

    let response = send(
        &app,
        "GET",
        "/api/leaderboard?metric=homework",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leaderboard_pages_and_searches() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;

    let response = send(
        &app,
        "GET",
        "/api/leaderboard?metric=xp&page=2&page_size=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    assert_eq!(board["total"], 2);
    assert_eq!(board["page"], 2);
    assert_eq!(board["entries"].as_array().unwrap().len(), 1);
    assert_eq!(board["entries"][0]["rank"], 2);

    let response = send(&app, "GET", "/api/leaderboard?search=BO", Some(&token), None).await;
    let board = json_body(response).await;
    assert_eq!(board["total"], 1);
    assert_eq!(board["entries"][0]["username"], "bob");

    let response = send(&app, "GET", "/api/leaderboard?page=3", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_returns_no_content() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let app = router(&env);
    let token = token_for(&env, &room.alice).await;

    let response = send(
        &app,
        "POST",
        "/api/notifications",
        Some(&token),
        Some(json!({"message": "Bring a calculator"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = json_body(response).await["id"].as_i64().unwrap();

    let response = send(
        &app,
        "DELETE",
        &format!("/api/notifications/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        "GET",
        &format!("/api/notifications/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
