//! # API de Imágenes
//!
//! Las imágenes pertenecen a un restaurante y solo su dueño puede
//! gestionarlas. No se suben ficheros: `filePath` es una ruta relativa al
//! directorio servido en `/uploads`.

use actix_web::http::header;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::middleware::{authenticated_user, current_user, require_user};
use super::restaurant::{ensure_owner, find_restaurant_or_404};
use super::validation::{self, nullable};
use super::{AppError, AppResult, ResultExt};
use crate::db::{NewPicture, Picture, SqliteRepo};

/// Número de imágenes que devuelve el listado
pub const PICTURE_INDEX_LIMIT: i64 = 50;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PictureResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub file_path: Option<String>,
    pub restaurant_id: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Picture> for PictureResponse {
    fn from(picture: Picture) -> Self {
        PictureResponse {
            created_at: validation::format_datetime(&picture.created_at),
            updated_at: validation::format_optional_datetime(&picture.updated_at),
            id: picture.id,
            title: picture.title,
            slug: picture.slug,
            file_path: picture.file_path,
            restaurant_id: picture.restaurant_id,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PicturePayload {
    title: Option<String>,
    slug: Option<String>,
    restaurant_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    file_path: Option<Option<String>>,
}

impl PicturePayload {
    fn into_new(self, restaurant_id: i64) -> AppResult<NewPicture> {
        let title = self
            .title
            .ok_or_else(|| AppError::validation_field("title", "es obligatorio"))?;
        let slug = self
            .slug
            .ok_or_else(|| AppError::validation_field("slug", "es obligatorio"))?;

        Ok(NewPicture {
            restaurant_id,
            title: validation::required_text("title", &title, 64)?,
            slug: validation::required_text("slug", &slug, 64)?,
            file_path: validation::optional_text("filePath", self.file_path.flatten(), 255)?,
        })
    }

    fn apply(self, picture: &mut Picture) -> AppResult<()> {
        if let Some(title) = self.title {
            picture.title = validation::required_text("title", &title, 64)?;
        }
        if let Some(slug) = self.slug {
            picture.slug = validation::required_text("slug", &slug, 64)?;
        }
        if let Some(file_path) = self.file_path {
            picture.file_path = validation::optional_text("filePath", file_path, 255)?;
        }

        picture.updated_at = Some(SqliteRepo::current_timestamp());
        Ok(())
    }
}

async fn find_picture_or_404(repo: &SqliteRepo, id: i64) -> AppResult<Picture> {
    repo.find_picture(id)
        .await?
        .ok_or_else(|| AppError::not_found_id("Picture", id))
}

/// Añade una imagen a un restaurante del usuario autenticado
///
/// # Errores
///
/// - `400 Bad Request`: Falta `title`, `slug` o `restaurantId`
/// - `401 Unauthorized`: Sin token
/// - `403 Forbidden`: El restaurante es de otro usuario
/// - `404 Not Found`: El restaurante no existe
#[post("/api/picture")]
#[tracing::instrument(skip_all)]
async fn create_picture(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let user = authenticated_user(&repo, &req).await?;
    let data: PicturePayload = validation::parse_body(&body)?;

    let restaurant_id = data
        .restaurant_id
        .ok_or_else(|| AppError::validation_field("restaurantId", "es obligatorio"))?;
    let restaurant = find_restaurant_or_404(&repo, restaurant_id).await?;
    ensure_owner(&restaurant, &user)?;

    let new_picture = data.into_new(restaurant.id)?;

    let mut conn = repo.acquire().await?;
    let picture = SqliteRepo::insert_picture(&mut conn, &new_picture).await?;

    tracing::info!(picture_id = picture.id, restaurant_id = restaurant.id, "Picture created");

    let location = req
        .url_for("picture_show", [picture.id.to_string()])
        .map_err_internal("building picture location")?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location.to_string()))
        .json(PictureResponse::from(picture)))
}

/// Las 50 imágenes más recientes
#[get("/api/picture")]
async fn list_pictures(repo: web::Data<SqliteRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let pictures = repo.list_pictures(PICTURE_INDEX_LIMIT).await?;
    let results: Vec<PictureResponse> = pictures.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(results))
}

#[get("/api/picture/{id}", name = "picture_show")]
async fn show_picture(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let picture = find_picture_or_404(&repo, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(PictureResponse::from(picture)))
}

#[route("/api/picture/{id}", method = "PUT", method = "PATCH")]
#[tracing::instrument(skip_all, fields(picture_id = %path))]
async fn edit_picture(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let mut picture = find_picture_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;

    let restaurant = find_restaurant_or_404(&repo, picture.restaurant_id).await?;
    ensure_owner(&restaurant, &user)?;

    let data: PicturePayload = validation::parse_body(&body)?;
    data.apply(&mut picture)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::update_picture(&mut conn, &picture).await?;

    tracing::info!(picture_id = picture.id, "Picture updated");
    Ok(HttpResponse::Ok().json(PictureResponse::from(picture)))
}

#[delete("/api/picture/{id}")]
#[tracing::instrument(skip_all, fields(picture_id = %path))]
async fn delete_picture(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let picture = find_picture_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;

    let restaurant = find_restaurant_or_404(&repo, picture.restaurant_id).await?;
    ensure_owner(&restaurant, &user)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::delete_picture(&mut conn, picture.id).await?;

    tracing::info!(picture_id = picture.id, "Picture deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_picture)
        .service(list_pictures)
        .service(show_picture)
        .service(edit_picture)
        .service(delete_picture);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn picture() -> Picture {
        Picture {
            id: 1,
            restaurant_id: 2,
            title: "Salle".into(),
            slug: "salle".into(),
            file_path: Some("salle.jpg".into()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn blank_slug_is_rejected() {
        let payload: PicturePayload = serde_json::from_str(r#"{"slug": " "}"#).unwrap();

        assert!(payload.apply(&mut picture()).is_err());
    }

    #[test]
    fn file_path_can_be_cleared() {
        let mut picture = picture();
        let payload: PicturePayload = serde_json::from_str(r#"{"filePath": null}"#).unwrap();

        payload.apply(&mut picture).unwrap();

        assert_eq!(picture.file_path, None);
        assert_eq!(picture.slug, "salle");
    }
}
