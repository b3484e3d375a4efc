#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{test, web, App, Error};
use serde_json::{json, Value};

use quai_antique::api::{self, middleware::AUTH_HEADER, security};
use quai_antique::db::{NewUser, SqliteRepo, User};

pub async fn test_repo() -> SqliteRepo {
    SqliteRepo::in_memory().await.expect("in-memory database")
}

pub fn app(
    repo: &SqliteRepo,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = Error,
    >,
> {
    App::new()
        .app_data(web::Data::new(repo.clone()))
        .configure(api::init_routes)
}

/// Inserta un usuario directamente en la base de datos
pub async fn create_user(repo: &SqliteRepo, email: &str) -> User {
    let mut conn = repo.acquire().await.unwrap();
    SqliteRepo::insert_user(
        &mut conn,
        &NewUser {
            email: email.to_string(),
            roles: vec![],
            password: security::hash_password("password1").unwrap(),
            api_token: security::generate_api_token(),
            first_name: None,
            last_name: None,
            guest_number: None,
            allergy: None,
        },
    )
    .await
    .unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> test::TestRequest {
    with_token(test::TestRequest::get().uri(uri), token)
}

pub fn delete(uri: &str, token: Option<&str>) -> test::TestRequest {
    with_token(test::TestRequest::delete().uri(uri), token)
}

pub fn post(uri: &str, token: Option<&str>, body: Value) -> test::TestRequest {
    with_token(test::TestRequest::post().uri(uri), token).set_json(body)
}

pub fn put(uri: &str, token: Option<&str>, body: Value) -> test::TestRequest {
    with_token(test::TestRequest::put().uri(uri), token).set_json(body)
}

pub fn patch(uri: &str, token: Option<&str>, body: Value) -> test::TestRequest {
    with_token(test::TestRequest::patch().uri(uri), token).set_json(body)
}

/// `PUT` con un cuerpo tal cual, aunque no sea JSON válido
pub fn put_raw(uri: &str, token: Option<&str>, body: &str) -> test::TestRequest {
    with_token(test::TestRequest::put().uri(uri), token)
        .insert_header(ContentType::json())
        .set_payload(body.to_string())
}

fn with_token(req: test::TestRequest, token: Option<&str>) -> test::TestRequest {
    match token {
        Some(token) => req.insert_header((AUTH_HEADER, token.to_string())),
        None => req,
    }
}

/// Ejecuta la petición y devuelve el código y el cuerpo JSON (`Null` si está vacío)
pub async fn call<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON body")
    };
    (status, json)
}

/// Ejecuta una creación, comprueba el `201` y devuelve la ruta de `Location` y el cuerpo
pub async fn call_created<S, R, B>(app: &S, req: R) -> (String, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let path = location_path(&resp);
    let body: Value = test::read_body_json(resp).await;
    (path, body)
}

/// Ruta de la cabecera `Location` sin esquema ni host
pub fn location_path<B>(resp: &ServiceResponse<B>) -> String {
    let location = resp
        .headers()
        .get(actix_web::http::header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap();
    let start = location.find("/api/").expect("API path in Location");
    location[start..].to_string()
}

pub fn restaurant_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Cuisine savoyarde",
        "maxGuest": 40,
        "amOpeningTime": ["Mon-Fri 12:00-14:00"],
        "pmOpeningTime": ["Mon-Sat 19:00-22:00"]
    })
}
