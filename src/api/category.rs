//! # API de Categorías
//!
//! La categoría es el lado propietario de sus asociaciones con platos y
//! menús: `foodIds` y `menuIds` sustituyen por completo la colección
//! correspondiente cuando vienen en el cuerpo.

use actix_web::http::header;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use super::middleware::{authenticated_user, current_user, require_user};
use super::validation;
use super::{AppError, AppResult, ResultExt};
use crate::db::{Category, EntityTable, JoinTable, ManyToMany, SqliteRepo};

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: i64,
    pub title: String,
    pub food_ids: Vec<i64>,
    pub menu_ids: Vec<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl CategoryResponse {
    fn new(
        category: Category,
        foods: &ManyToMany<i64, i64>,
        menus: &ManyToMany<i64, i64>,
    ) -> Self {
        CategoryResponse {
            food_ids: foods.rights_of(category.id),
            menu_ids: menus.rights_of(category.id),
            created_at: validation::format_datetime(&category.created_at),
            updated_at: validation::format_optional_datetime(&category.updated_at),
            id: category.id,
            title: category.title,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    title: Option<String>,
    food_ids: Option<Vec<i64>>,
    menu_ids: Option<Vec<i64>>,
}

/// Ids ya filtradas contra la base de datos
struct ResolvedIds {
    foods: Option<Vec<i64>>,
    menus: Option<Vec<i64>>,
}

impl CategoryPayload {
    async fn resolve_ids(&mut self, repo: &SqliteRepo) -> AppResult<ResolvedIds> {
        let foods = match self.food_ids.take() {
            Some(ids) => Some(repo.existing_ids(EntityTable::Food, &ids).await?),
            None => None,
        };
        let menus = match self.menu_ids.take() {
            Some(ids) => Some(repo.existing_ids(EntityTable::Menu, &ids).await?),
            None => None,
        };
        Ok(ResolvedIds { foods, menus })
    }
}

/// Carga los enlaces de la categoría y aplica los reemplazos pedidos
async fn sync_links(
    conn: &mut SqliteConnection,
    category_id: i64,
    ids: ResolvedIds,
) -> AppResult<(ManyToMany<i64, i64>, ManyToMany<i64, i64>)> {
    let mut foods = SqliteRepo::links_of_category(conn, JoinTable::CategoryFood, category_id).await?;
    if let Some(food_ids) = ids.foods {
        let changes = foods.replace_rights(category_id, food_ids);
        SqliteRepo::persist_link_changes(conn, JoinTable::CategoryFood, &changes).await?;
    }

    let mut menus = SqliteRepo::links_of_category(conn, JoinTable::CategoryMenu, category_id).await?;
    if let Some(menu_ids) = ids.menus {
        let changes = menus.replace_rights(category_id, menu_ids);
        SqliteRepo::persist_link_changes(conn, JoinTable::CategoryMenu, &changes).await?;
    }

    Ok((foods, menus))
}

async fn find_category_or_404(repo: &SqliteRepo, id: i64) -> AppResult<Category> {
    repo.find_category(id)
        .await?
        .ok_or_else(|| AppError::not_found_id("Category", id))
}

#[post("/api/category")]
#[tracing::instrument(skip_all)]
async fn create_category(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    authenticated_user(&repo, &req).await?;
    let mut data: CategoryPayload = validation::parse_body(&body)?;

    let title = data
        .title
        .take()
        .ok_or_else(|| AppError::validation_field("title", "es obligatorio"))?;
    let title = validation::required_text("title", &title, 64)?;
    let ids = data.resolve_ids(&repo).await?;

    let mut tx = repo.begin().await?;
    let category = SqliteRepo::insert_category(&mut tx, &title).await?;
    let (foods, menus) = sync_links(&mut tx, category.id, ids).await?;
    tx.commit()
        .await
        .map_err(|e| AppError::database("commit_create_category", e))?;

    tracing::info!(category_id = category.id, "Category created");

    let location = req
        .url_for("category_show", [category.id.to_string()])
        .map_err_internal("building category location")?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location.to_string()))
        .json(CategoryResponse::new(category, &foods, &menus)))
}

#[get("/api/category")]
async fn list_categories(repo: web::Data<SqliteRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let categories = repo.list_categories().await?;
    let foods = repo.load_links(JoinTable::CategoryFood).await?;
    let menus = repo.load_links(JoinTable::CategoryMenu).await?;
    let results: Vec<CategoryResponse> = categories
        .into_iter()
        .map(|category| CategoryResponse::new(category, &foods, &menus))
        .collect();

    Ok(HttpResponse::Ok().json(results))
}

#[get("/api/category/{id}", name = "category_show")]
async fn show_category(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let category = find_category_or_404(&repo, path.into_inner()).await?;
    let mut conn = repo.acquire().await?;
    let foods = SqliteRepo::links_of_category(&mut conn, JoinTable::CategoryFood, category.id).await?;
    let menus = SqliteRepo::links_of_category(&mut conn, JoinTable::CategoryMenu, category.id).await?;

    Ok(HttpResponse::Ok().json(CategoryResponse::new(category, &foods, &menus)))
}

#[route("/api/category/{id}", method = "PUT", method = "PATCH")]
#[tracing::instrument(skip_all, fields(category_id = %path))]
async fn edit_category(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let mut category = find_category_or_404(&repo, path.into_inner()).await?;
    require_user(principal)?;

    let mut data: CategoryPayload = validation::parse_body(&body)?;
    if let Some(title) = data.title.take() {
        category.title = validation::required_text("title", &title, 64)?;
    }
    category.updated_at = Some(SqliteRepo::current_timestamp());
    let ids = data.resolve_ids(&repo).await?;

    let mut tx = repo.begin().await?;
    SqliteRepo::update_category(&mut tx, &category).await?;
    let (foods, menus) = sync_links(&mut tx, category.id, ids).await?;
    tx.commit()
        .await
        .map_err(|e| AppError::database("commit_edit_category", e))?;

    tracing::info!(category_id = category.id, "Category updated");
    Ok(HttpResponse::Ok().json(CategoryResponse::new(category, &foods, &menus)))
}

#[delete("/api/category/{id}")]
#[tracing::instrument(skip_all, fields(category_id = %path))]
async fn delete_category(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let category = find_category_or_404(&repo, path.into_inner()).await?;
    require_user(principal)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::delete_category(&mut conn, category.id).await?;

    tracing::info!(category_id = category.id, "Category deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_category)
        .service(list_categories)
        .service(show_category)
        .service(edit_category)
        .service(delete_category);
}
