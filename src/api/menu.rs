//! # API de Menús
//!
//! Un menú pertenece a un restaurante y solo el dueño de ese restaurante
//! puede crearlo, modificarlo o borrarlo. Las categorías se envían como
//! `categoryIds` y sustituyen por completo a las anteriores.

use actix_web::http::header;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::middleware::{authenticated_user, current_user, require_user};
use super::restaurant::{ensure_owner, find_restaurant_or_404};
use super::validation;
use super::{AppError, AppResult, ResultExt};
use crate::db::{EntityTable, JoinTable, ManyToMany, Menu, NewMenu, SqliteRepo};

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MenuResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub restaurant_id: i64,
    pub category_ids: Vec<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl MenuResponse {
    /// `links` es la tabla categoría ↔ menú (completa o solo la de este menú)
    fn new(menu: Menu, links: &ManyToMany<i64, i64>) -> Self {
        MenuResponse {
            category_ids: links.lefts_of(menu.id),
            created_at: validation::format_datetime(&menu.created_at),
            updated_at: validation::format_optional_datetime(&menu.updated_at),
            id: menu.id,
            title: menu.title,
            description: menu.description,
            price: menu.price,
            restaurant_id: menu.restaurant_id,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MenuPayload {
    title: Option<String>,
    description: Option<String>,
    price: Option<i64>,
    restaurant_id: Option<i64>,
    category_ids: Option<Vec<i64>>,
}

impl MenuPayload {
    fn into_new(self, restaurant_id: i64) -> AppResult<NewMenu> {
        let title = self
            .title
            .ok_or_else(|| AppError::validation_field("title", "es obligatorio"))?;
        let description = self
            .description
            .ok_or_else(|| AppError::validation_field("description", "es obligatorio"))?;
        let price = self
            .price
            .ok_or_else(|| AppError::validation_field("price", "es obligatorio"))?;

        Ok(NewMenu {
            restaurant_id,
            title: validation::required_text("title", &title, 64)?,
            description: validation::required_text("description", &description, 65_535)?,
            price: validation::non_negative("price", price)?,
        })
    }

    /// Aplica los campos escalares; `restaurantId` y `categoryIds` se
    /// resuelven aparte contra la base de datos
    fn apply(&mut self, menu: &mut Menu) -> AppResult<()> {
        if let Some(title) = self.title.take() {
            menu.title = validation::required_text("title", &title, 64)?;
        }
        if let Some(description) = self.description.take() {
            menu.description = validation::required_text("description", &description, 65_535)?;
        }
        if let Some(price) = self.price.take() {
            menu.price = validation::non_negative("price", price)?;
        }

        menu.updated_at = Some(SqliteRepo::current_timestamp());
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuQuery {
    restaurant_id: Option<i64>,
}

async fn find_menu_or_404(repo: &SqliteRepo, id: i64) -> AppResult<Menu> {
    repo.find_menu(id)
        .await?
        .ok_or_else(|| AppError::not_found_id("Menu", id))
}

/// Crea un menú en un restaurante del usuario autenticado
///
/// # Errores
///
/// - `400 Bad Request`: Falta `restaurantId`, `title`, `description` o `price`
/// - `401 Unauthorized`: Sin token
/// - `403 Forbidden`: El restaurante es de otro usuario
/// - `404 Not Found`: El restaurante no existe
#[post("/api/menu")]
#[tracing::instrument(skip_all)]
async fn create_menu(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let user = authenticated_user(&repo, &req).await?;
    let mut data: MenuPayload = validation::parse_body(&body)?;

    let restaurant_id = data
        .restaurant_id
        .ok_or_else(|| AppError::validation_field("restaurantId", "es obligatorio"))?;
    let restaurant = find_restaurant_or_404(&repo, restaurant_id).await?;
    ensure_owner(&restaurant, &user)?;

    let category_ids = match data.category_ids.take() {
        Some(ids) => repo.existing_ids(EntityTable::Category, &ids).await?,
        None => Vec::new(),
    };
    let new_menu = data.into_new(restaurant.id)?;

    let mut tx = repo.begin().await?;
    let menu = SqliteRepo::insert_menu(&mut tx, &new_menu).await?;
    let mut links = ManyToMany::new();
    let changes = links.replace_lefts(menu.id, category_ids);
    SqliteRepo::persist_link_changes(&mut tx, JoinTable::CategoryMenu, &changes).await?;
    tx.commit()
        .await
        .map_err(|e| AppError::database("commit_create_menu", e))?;

    tracing::info!(menu_id = menu.id, restaurant_id = restaurant.id, "Menu created");

    let location = req
        .url_for("menu_show", [menu.id.to_string()])
        .map_err_internal("building menu location")?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location.to_string()))
        .json(MenuResponse::new(menu, &links)))
}

/// Lista los menús, opcionalmente de un solo restaurante (`?restaurantId=`)
#[get("/api/menu")]
async fn list_menus(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    query: web::Query<MenuQuery>,
) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let menus = repo.list_menus(query.restaurant_id).await?;
    let links = repo.load_links(JoinTable::CategoryMenu).await?;
    let results: Vec<MenuResponse> = menus
        .into_iter()
        .map(|menu| MenuResponse::new(menu, &links))
        .collect();

    Ok(HttpResponse::Ok().json(results))
}

#[get("/api/menu/{id}", name = "menu_show")]
async fn show_menu(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let menu = find_menu_or_404(&repo, path.into_inner()).await?;
    let mut conn = repo.acquire().await?;
    let links = SqliteRepo::links_of_inverse(&mut conn, JoinTable::CategoryMenu, menu.id).await?;

    Ok(HttpResponse::Ok().json(MenuResponse::new(menu, &links)))
}

/// Modifica un menú (PUT y PATCH se comportan igual)
///
/// Mover el menú a otro restaurante exige ser dueño de los dos.
#[route("/api/menu/{id}", method = "PUT", method = "PATCH")]
#[tracing::instrument(skip_all, fields(menu_id = %path))]
async fn edit_menu(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let mut menu = find_menu_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;

    let current = find_restaurant_or_404(&repo, menu.restaurant_id).await?;
    ensure_owner(&current, &user)?;

    let mut data: MenuPayload = validation::parse_body(&body)?;
    if let Some(restaurant_id) = data.restaurant_id.take() {
        if restaurant_id != menu.restaurant_id {
            let target = find_restaurant_or_404(&repo, restaurant_id).await?;
            ensure_owner(&target, &user)?;
            menu.restaurant_id = target.id;
        }
    }

    let category_ids = match data.category_ids.take() {
        Some(ids) => Some(repo.existing_ids(EntityTable::Category, &ids).await?),
        None => None,
    };
    data.apply(&mut menu)?;

    let mut tx = repo.begin().await?;
    SqliteRepo::update_menu(&mut tx, &menu).await?;
    let mut links = SqliteRepo::links_of_inverse(&mut tx, JoinTable::CategoryMenu, menu.id).await?;
    if let Some(category_ids) = category_ids {
        let changes = links.replace_lefts(menu.id, category_ids);
        SqliteRepo::persist_link_changes(&mut tx, JoinTable::CategoryMenu, &changes).await?;
    }
    tx.commit()
        .await
        .map_err(|e| AppError::database("commit_edit_menu", e))?;

    tracing::info!(menu_id = menu.id, "Menu updated");
    Ok(HttpResponse::Ok().json(MenuResponse::new(menu, &links)))
}

#[delete("/api/menu/{id}")]
#[tracing::instrument(skip_all, fields(menu_id = %path))]
async fn delete_menu(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let menu = find_menu_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;

    let restaurant = find_restaurant_or_404(&repo, menu.restaurant_id).await?;
    ensure_owner(&restaurant, &user)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::delete_menu(&mut conn, menu.id).await?;

    tracing::info!(menu_id = menu.id, "Menu deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_menu)
        .service(list_menus)
        .service(show_menu)
        .service(edit_menu)
        .service(delete_menu);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn negative_price_is_rejected() {
        let payload: MenuPayload = serde_json::from_str(
            r#"{"title": "Menu du midi", "description": "Entrée et plat", "price": -1}"#,
        )
        .unwrap();

        assert!(payload.into_new(1).is_err());
    }

    #[test]
    fn apply_leaves_relations_to_the_caller() {
        let mut menu = Menu {
            id: 3,
            restaurant_id: 1,
            title: "Menu".into(),
            description: "Du jour".into(),
            price: 25,
            created_at: Utc::now(),
            updated_at: None,
        };
        let mut payload: MenuPayload =
            serde_json::from_str(r#"{"price": 32, "restaurantId": 9, "categoryIds": [1, 2]}"#)
                .unwrap();

        payload.apply(&mut menu).unwrap();

        assert_eq!(menu.price, 32);
        assert_eq!(menu.restaurant_id, 1);
        assert_eq!(payload.category_ids, Some(vec![1, 2]));
    }
}
