mod common;

use actix_web::http::{header::ContentType, StatusCode};
use actix_web::test;
use serde_json::json;

use common::*;

#[actix_web::test]
async fn registration_returns_token_usable_on_account() {
    let repo = test_repo().await;
    let app = test::init_service(app(&repo)).await;

    let resp = test::call_service(
        &app,
        post(
            "/api/registration",
            None,
            json!({
                "email": "camille@studi.fr",
                "password": "password1",
                "firstName": "Camille",
                "guestNumber": 2
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(location_path(&resp), "/api/account/me");
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["user"], "camille@studi.fr");
    assert_eq!(body["roles"], json!(["ROLE_USER"]));
    let token = body["apiToken"].as_str().unwrap().to_string();

    let (status, me) = call(&app, get("/api/account/me", Some(&token)).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "camille@studi.fr");
    assert_eq!(me["firstName"], "Camille");
    assert_eq!(me["guestNumber"], 2);
    assert!(me.get("password").is_none());
}

#[actix_web::test]
async fn registration_validates_and_rejects_duplicates() {
    let repo = test_repo().await;
    create_user(&repo, "taken@studi.fr").await;
    let app = test::init_service(app(&repo)).await;

    let (status, _) = call(
        &app,
        post("/api/registration", None, json!({"email": "taken@studi.fr", "password": "password1"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        post("/api/registration", None, json!({"email": "new@studi.fr", "password": "short"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        post("/api/registration", None, json!({"email": "not-an-email", "password": "password1"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_checks_the_password() {
    let repo = test_repo().await;
    let user = create_user(&repo, "login@studi.fr").await;
    let app = test::init_service(app(&repo)).await;

    let (status, body) = call(
        &app,
        post("/api/login", None, json!({"username": "login@studi.fr", "password": "password1"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apiToken"], user.api_token.as_str());

    let (status, body) = call(
        &app,
        post("/api/login", None, json!({"email": "login@studi.fr", "password": "wrong-password"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No autorizado");
}

#[actix_web::test]
async fn unknown_token_is_rejected_even_on_public_routes() {
    let repo = test_repo().await;
    let app = test::init_service(app(&repo)).await;

    let (status, _) = call(&app, get("/api/restaurant", None).to_request()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, get("/api/restaurant", Some("no-such-token")).to_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn mutations_without_token_are_unauthorized() {
    let repo = test_repo().await;
    let app = test::init_service(app(&repo)).await;

    let requests = [
        post("/api/restaurant", None, restaurant_body("Quai Antique")),
        post("/api/menu", None, json!({"title": "Menu", "description": "Du jour", "price": 20, "restaurantId": 1})),
        post("/api/food", None, json!({"title": "Tartiflette", "description": "Reblochon", "price": 18})),
        post("/api/category", None, json!({"title": "Plats"})),
        post("/api/picture", None, json!({"title": "Salle", "slug": "salle", "restaurantId": 1})),
        post(
            "/api/booking",
            None,
            json!({"restaurantId": 1, "guestNumber": 2, "orderDate": "2030-01-15", "orderHour": "19:30"}),
        ),
        patch("/api/account/edit", None, json!({"firstName": "Anonyme"})),
        get("/api/account/me", None),
        get("/api/booking", None),
        delete("/api/account", None),
    ];

    for req in requests {
        let req = req.to_request();
        let uri = req.uri().to_string();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let repo = test_repo().await;
    let user = create_user(&repo, "json@studi.fr").await;
    let app = test::init_service(app(&repo)).await;

    let req = test::TestRequest::post()
        .uri("/api/food")
        .insert_header(("X-AUTH-TOKEN", user.api_token.clone()))
        .insert_header(ContentType::json())
        .set_payload("{\"title\": ")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "JSON inválido");

    let (status, _) = call(
        &app,
        post("/api/food", Some(&user.api_token), json!({"title": "Tartiflette", "price": "cher"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn account_edit_validates_fields() {
    let repo = test_repo().await;
    let user = create_user(&repo, "edit@studi.fr").await;
    let token = user.api_token.as_str();
    let app = test::init_service(app(&repo)).await;

    let (status, _) = call(
        &app,
        patch("/api/account/edit", Some(token), json!({"guestNumber": 0})).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        patch("/api/account/edit", Some(token), json!({"password": "1234567"})).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        patch(
            "/api/account/edit",
            Some(token),
            json!({"guestNumber": 4, "allergy": "arachides", "email": "hijack@studi.fr"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guestNumber"], 4);
    assert_eq!(body["allergy"], "arachides");
    assert_eq!(body["email"], "edit@studi.fr");
    assert!(body["updatedAt"].is_string());

    let (status, body) = call(
        &app,
        patch("/api/account/edit", Some(token), json!({"guestNumber": null})).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["guestNumber"].is_null());
}
