//! # API de Restaurantes
//!
//! Este módulo maneja todas las operaciones relacionadas con restaurantes:
//! - Alta de un restaurante (uno por usuario)
//! - Listado y consulta
//! - Modificación y borrado por su dueño
//!
//! Borrar un restaurante borra también sus menús, imágenes y reservas.

use actix_web::http::header;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::middleware::{authenticated_user, current_user, require_user};
use super::validation;
use super::{AppError, AppResult, ResultExt};
use crate::db::{NewRestaurant, Restaurant, SqliteRepo, User};

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub am_opening_time: Vec<String>,
    pub pm_opening_time: Vec<String>,
    pub max_guest: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Restaurant> for RestaurantResponse {
    fn from(restaurant: Restaurant) -> Self {
        RestaurantResponse {
            created_at: validation::format_datetime(&restaurant.created_at),
            updated_at: validation::format_optional_datetime(&restaurant.updated_at),
            id: restaurant.id,
            name: restaurant.name,
            description: restaurant.description,
            am_opening_time: restaurant.am_opening_time.0,
            pm_opening_time: restaurant.pm_opening_time.0,
            max_guest: restaurant.max_guest,
        }
    }
}

/// Campos que el cliente puede escribir
///
/// `id`, el dueño y las marcas de tiempo no se aceptan nunca del cuerpo.
#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantPayload {
    name: Option<String>,
    description: Option<String>,
    max_guest: Option<i64>,
    am_opening_time: Option<Vec<String>>,
    pm_opening_time: Option<Vec<String>>,
}

impl RestaurantPayload {
    pub fn into_new(self, owner_id: i64) -> AppResult<NewRestaurant> {
        let name = self
            .name
            .ok_or_else(|| AppError::validation_field("name", "es obligatorio"))?;
        let description = self
            .description
            .ok_or_else(|| AppError::validation_field("description", "es obligatorio"))?;
        let max_guest = self
            .max_guest
            .ok_or_else(|| AppError::validation_field("maxGuest", "es obligatorio"))?;

        Ok(NewRestaurant {
            owner_id,
            name: validation::required_text("name", &name, 32)?,
            description: validation::required_text("description", &description, 65_535)?,
            max_guest: validation::at_least_one("maxGuest", max_guest)?,
            am_opening_time: self.am_opening_time.unwrap_or_default(),
            pm_opening_time: self.pm_opening_time.unwrap_or_default(),
        })
    }

    pub fn apply(self, restaurant: &mut Restaurant) -> AppResult<()> {
        if let Some(name) = self.name {
            restaurant.name = validation::required_text("name", &name, 32)?;
        }
        if let Some(description) = self.description {
            restaurant.description = validation::required_text("description", &description, 65_535)?;
        }
        if let Some(max_guest) = self.max_guest {
            restaurant.max_guest = validation::at_least_one("maxGuest", max_guest)?;
        }
        if let Some(am) = self.am_opening_time {
            restaurant.am_opening_time.0 = am;
        }
        if let Some(pm) = self.pm_opening_time {
            restaurant.pm_opening_time.0 = pm;
        }

        restaurant.updated_at = Some(SqliteRepo::current_timestamp());
        Ok(())
    }
}

/// Busca un restaurante o responde `404`
pub async fn find_restaurant_or_404(repo: &SqliteRepo, id: i64) -> AppResult<Restaurant> {
    repo.find_restaurant(id)
        .await?
        .ok_or_else(|| AppError::not_found_id("Restaurant", id))
}

/// `403` si `user` no es el dueño del restaurante
pub fn ensure_owner(restaurant: &Restaurant, user: &User) -> AppResult<()> {
    if !restaurant.is_owned_by(user) {
        tracing::warn!(
            restaurant_id = restaurant.id,
            user_id = user.id,
            "User is not the restaurant owner"
        );
        return Err(AppError::Forbidden(
            "Solo el dueño del restaurante puede hacer esto".to_string(),
        ));
    }
    Ok(())
}

/// Crea el restaurante del usuario autenticado
///
/// # Errores
///
/// - `400 Bad Request`: Faltan `name`, `description` o `maxGuest`, o `maxGuest < 1`
/// - `401 Unauthorized`: Sin token
/// - `409 Conflict`: El usuario ya tiene un restaurante
#[post("/api/restaurant")]
#[tracing::instrument(skip_all)]
async fn create_restaurant(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let user = authenticated_user(&repo, &req).await?;

    if repo.find_restaurant_by_owner(user.id).await?.is_some() {
        return Err(AppError::Conflict("El usuario ya tiene un restaurante".to_string()));
    }

    let data: RestaurantPayload = validation::parse_body(&body)?;
    let new_restaurant = data.into_new(user.id)?;

    let mut conn = repo.acquire().await?;
    let restaurant = SqliteRepo::insert_restaurant(&mut conn, &new_restaurant).await?;

    tracing::info!(restaurant_id = restaurant.id, owner_id = user.id, "Restaurant created");

    let location = req
        .url_for("restaurant_show", [restaurant.id.to_string()])
        .map_err_internal("building restaurant location")?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location.to_string()))
        .json(RestaurantResponse::from(restaurant)))
}

#[get("/api/restaurant")]
async fn list_restaurants(repo: web::Data<SqliteRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let restaurants = repo.list_restaurants().await?;
    let results: Vec<RestaurantResponse> = restaurants.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(results))
}

#[get("/api/restaurant/{id}", name = "restaurant_show")]
async fn show_restaurant(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let restaurant = find_restaurant_or_404(&repo, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(RestaurantResponse::from(restaurant)))
}

/// Modifica un restaurante (PUT y PATCH se comportan igual)
///
/// # Errores
///
/// - `400 Bad Request`: Cuerpo ilegible o campo fuera de rango
/// - `401 Unauthorized`: Sin token
/// - `403 Forbidden`: El usuario no es el dueño
/// - `404 Not Found`: El restaurante no existe
///
/// El cuerpo solo se lee cuando las tres comprobaciones anteriores pasan.
#[route("/api/restaurant/{id}", method = "PUT", method = "PATCH")]
#[tracing::instrument(skip_all, fields(restaurant_id = %path))]
async fn edit_restaurant(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let mut restaurant = find_restaurant_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;
    ensure_owner(&restaurant, &user)?;

    let data: RestaurantPayload = validation::parse_body(&body)?;
    data.apply(&mut restaurant)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::update_restaurant(&mut conn, &restaurant).await?;

    tracing::info!(restaurant_id = restaurant.id, "Restaurant updated");
    Ok(HttpResponse::Ok().json(RestaurantResponse::from(restaurant)))
}

#[delete("/api/restaurant/{id}")]
#[tracing::instrument(skip_all, fields(restaurant_id = %path))]
async fn delete_restaurant(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let restaurant = find_restaurant_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;
    ensure_owner(&restaurant, &user)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::delete_restaurant(&mut conn, restaurant.id).await?;

    tracing::info!(restaurant_id = restaurant.id, "Restaurant deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_restaurant)
        .service(list_restaurants)
        .service(show_restaurant)
        .service(edit_restaurant)
        .service(delete_restaurant);
}
