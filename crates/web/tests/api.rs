use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use platform::{memory::MemoryDatabase, Client};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use web::{config::WebConfig, WebState};

const PASSWORD: &str = "motdepasse";

async fn app() -> Router {
    let client = Client::new(MemoryDatabase::new());
    client
        .bootstrap_admin("admin@busline.sn", PASSWORD, "Administrateur")
        .await
        .unwrap();
    web::app(WebState::new(client, WebConfig::default()))
}

fn request(method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn registration(email: &str) -> Value {
    json!({
        "fullName": "Awa Diop",
        "email": email,
        "password": PASSWORD,
    })
}

fn patron_registration(email: &str) -> Value {
    json!({
        "fullName": "Moussa Ndiaye",
        "email": email,
        "password": PASSWORD,
        "role": "PATRON",
        "company": {
            "name": "Sénégal Express",
            "email": "contact@senegal-express.sn",
            "phone": "+221 33 800 00 00",
            "address": "Avenue Blaise Diagne",
            "city": "Dakar"
        }
    })
}

async fn login(app: &Router, email: &str) -> String {
    let (status, _, body) = send(
        app,
        request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": PASSWORD })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn ping() {
    let app = app().await;
    let (status, _, body) = send(&app, request(Method::GET, "/api/ping", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong!");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unknown_api_routes_answer_json_404() {
    let app = app().await;
    let (status, _, body) = send(&app, request(Method::GET, "/api/v1/nowhere", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Ressource introuvable");
    assert_eq!(body["httpMethod"], "GET");
}

#[tokio::test]
async fn short_passwords_are_rejected_per_field() {
    let app = app().await;
    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "fullName": "Awa Diop",
                "email": "awa@example.sn",
                "password": "1234567",
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Données invalides");
    assert_eq!(body["errors"][0]["field"], "password");
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Corps de requête invalide");
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = app().await;
    let (status, _, body) = send(&app, request(Method::GET, "/api/v1/buses", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["requestedUri"], "/api/v1/buses");

    let (status, _, _) = send(
        &app,
        request(Method::GET, "/api/v1/buses", None, Some("not-a-session")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_a_cookie_and_returns_a_bearer_token() {
    let app = app().await;
    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(registration("Awa@Example.sn")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "awa@example.sn");
    assert_eq!(body["user"]["role"], "CLIENT");

    let (status, headers, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "awa@example.sn", "password": PASSWORD })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_owned();
    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with(&format!("session={}", token)));
    assert!(cookie.contains("HttpOnly"));

    let (status, _, body) = send(
        &app,
        request(Method::GET, "/api/v1/auth/session", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["fullName"], "Awa Diop");

    let by_cookie = Request::builder()
        .uri("/api/v1/auth/session")
        .header(header::COOKIE, format!("session={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, by_cookie).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        &app,
        request(Method::POST, "/api/v1/auth/logout", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(
        &app,
        request(Method::GET, "/api/v1/auth/session", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn a_stale_cookie_does_not_hide_a_valid_bearer_token() {
    let app = app().await;
    let token = login(&app, "admin@busline.sn").await;
    let stale_cookie = |uri: &str, method: Method| {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, "session=expired-session")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _, body) = send(&app, stale_cookie("/api/v1/auth/session", Method::GET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "admin@busline.sn");

    let (status, _, _) = send(&app, stale_cookie("/api/v1/auth/logout", Method::POST)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(
        &app,
        request(Method::GET, "/api/v1/auth/session", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_refused() {
    let app = app().await;
    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "admin@busline.sn", "password": "pas-le-bon" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Email ou mot de passe incorrect");
}

#[tokio::test]
async fn clients_can_not_manage_a_fleet() {
    let app = app().await;
    send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(registration("client@example.sn")),
            None,
        ),
    )
    .await;
    let token = login(&app, "client@example.sn").await;

    let (status, _, body) =
        send(&app, request(Method::GET, "/api/v1/buses", None, Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Accès refusé");

    let (status, _, _) = send(
        &app,
        request(Method::GET, "/api/v1/admin/companies", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn companies_operate_once_approved() {
    let app = app().await;
    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(patron_registration("patron@example.sn")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["company"]["status"], "PENDING");
    let company_id = body["company"]["id"].as_str().unwrap().to_owned();

    let patron = login(&app, "patron@example.sn").await;
    let bus = json!({
        "plateNumber": "DK-1234-AB",
        "model": "Mercedes Tourismo",
        "capacity": 50
    });
    let (status, _, body) = send(
        &app,
        request(Method::POST, "/api/v1/buses", Some(bus.clone()), Some(&patron)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Votre compagnie n'est pas encore approuvée");

    let admin = login(&app, "admin@busline.sn").await;
    let (status, _, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/admin/companies?status=PENDING",
            None,
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["totalItems"], 1);

    let (status, _, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/admin/companies/{}/approve", company_id),
            None,
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");

    let (status, _, body) = send(
        &app,
        request(Method::POST, "/api/v1/buses", Some(bus.clone()), Some(&patron)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["plateNumber"], "DK-1234-AB");
    assert_eq!(body["links"][0]["rel"], "self");

    let (status, _, _) = send(
        &app,
        request(Method::POST, "/api/v1/buses", Some(bus), Some(&patron)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_ids_are_not_found() {
    let app = app().await;
    let admin = login(&app, "admin@busline.sn").await;
    let (status, _, _) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/admin/companies/not-a-uuid",
            None,
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_search_needs_no_session() {
    let app = app().await;
    let (status, _, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/search/trips?departureCity=Dakar",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, _, body) = send(&app, request(Method::GET, "/api/v1/plans", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_array());
}
