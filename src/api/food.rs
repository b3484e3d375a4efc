//! # API de Platos
//!
//! Los platos no tienen dueño: cualquier usuario autenticado puede
//! crearlos, modificarlos o borrarlos.

use actix_web::http::header;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::middleware::{authenticated_user, current_user, require_user};
use super::validation;
use super::{AppError, AppResult, ResultExt};
use crate::db::{EntityTable, Food, JoinTable, ManyToMany, NewFood, SqliteRepo};

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FoodResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub category_ids: Vec<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl FoodResponse {
    fn new(food: Food, links: &ManyToMany<i64, i64>) -> Self {
        FoodResponse {
            category_ids: links.lefts_of(food.id),
            created_at: validation::format_datetime(&food.created_at),
            updated_at: validation::format_optional_datetime(&food.updated_at),
            id: food.id,
            title: food.title,
            description: food.description,
            price: food.price,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FoodPayload {
    title: Option<String>,
    description: Option<String>,
    price: Option<i64>,
    category_ids: Option<Vec<i64>>,
}

impl FoodPayload {
    fn into_new(self) -> AppResult<NewFood> {
        let title = self
            .title
            .ok_or_else(|| AppError::validation_field("title", "es obligatorio"))?;
        let description = self
            .description
            .ok_or_else(|| AppError::validation_field("description", "es obligatorio"))?;
        let price = self
            .price
            .ok_or_else(|| AppError::validation_field("price", "es obligatorio"))?;

        Ok(NewFood {
            title: validation::required_text("title", &title, 64)?,
            description: validation::required_text("description", &description, 65_535)?,
            price: validation::non_negative("price", price)?,
        })
    }

    fn apply(&mut self, food: &mut Food) -> AppResult<()> {
        if let Some(title) = self.title.take() {
            food.title = validation::required_text("title", &title, 64)?;
        }
        if let Some(description) = self.description.take() {
            food.description = validation::required_text("description", &description, 65_535)?;
        }
        if let Some(price) = self.price.take() {
            food.price = validation::non_negative("price", price)?;
        }

        food.updated_at = Some(SqliteRepo::current_timestamp());
        Ok(())
    }
}

async fn find_food_or_404(repo: &SqliteRepo, id: i64) -> AppResult<Food> {
    repo.find_food(id)
        .await?
        .ok_or_else(|| AppError::not_found_id("Food", id))
}

#[post("/api/food")]
#[tracing::instrument(skip_all)]
async fn create_food(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    authenticated_user(&repo, &req).await?;
    let mut data: FoodPayload = validation::parse_body(&body)?;

    let category_ids = match data.category_ids.take() {
        Some(ids) => repo.existing_ids(EntityTable::Category, &ids).await?,
        None => Vec::new(),
    };
    let new_food = data.into_new()?;

    let mut tx = repo.begin().await?;
    let food = SqliteRepo::insert_food(&mut tx, &new_food).await?;
    let mut links = ManyToMany::new();
    let changes = links.replace_lefts(food.id, category_ids);
    SqliteRepo::persist_link_changes(&mut tx, JoinTable::CategoryFood, &changes).await?;
    tx.commit()
        .await
        .map_err(|e| AppError::database("commit_create_food", e))?;

    tracing::info!(food_id = food.id, "Food created");

    let location = req
        .url_for("food_show", [food.id.to_string()])
        .map_err_internal("building food location")?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location.to_string()))
        .json(FoodResponse::new(food, &links)))
}

/// Lista los platos, el más reciente primero
#[get("/api/food")]
async fn list_foods(repo: web::Data<SqliteRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let foods = repo.list_foods().await?;
    let links = repo.load_links(JoinTable::CategoryFood).await?;
    let results: Vec<FoodResponse> = foods
        .into_iter()
        .map(|food| FoodResponse::new(food, &links))
        .collect();

    Ok(HttpResponse::Ok().json(results))
}

#[get("/api/food/{id}", name = "food_show")]
async fn show_food(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    current_user(&repo, &req).await?;

    let food = find_food_or_404(&repo, path.into_inner()).await?;
    let mut conn = repo.acquire().await?;
    let links = SqliteRepo::links_of_inverse(&mut conn, JoinTable::CategoryFood, food.id).await?;

    Ok(HttpResponse::Ok().json(FoodResponse::new(food, &links)))
}

#[route("/api/food/{id}", method = "PUT", method = "PATCH")]
#[tracing::instrument(skip_all, fields(food_id = %path))]
async fn edit_food(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let mut food = find_food_or_404(&repo, path.into_inner()).await?;
    require_user(principal)?;

    let mut data: FoodPayload = validation::parse_body(&body)?;
    let category_ids = match data.category_ids.take() {
        Some(ids) => Some(repo.existing_ids(EntityTable::Category, &ids).await?),
        None => None,
    };
    data.apply(&mut food)?;

    let mut tx = repo.begin().await?;
    SqliteRepo::update_food(&mut tx, &food).await?;
    let mut links = SqliteRepo::links_of_inverse(&mut tx, JoinTable::CategoryFood, food.id).await?;
    if let Some(category_ids) = category_ids {
        let changes = links.replace_lefts(food.id, category_ids);
        SqliteRepo::persist_link_changes(&mut tx, JoinTable::CategoryFood, &changes).await?;
    }
    tx.commit()
        .await
        .map_err(|e| AppError::database("commit_edit_food", e))?;

    tracing::info!(food_id = food.id, "Food updated");
    Ok(HttpResponse::Ok().json(FoodResponse::new(food, &links)))
}

#[delete("/api/food/{id}")]
#[tracing::instrument(skip_all, fields(food_id = %path))]
async fn delete_food(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let food = find_food_or_404(&repo, path.into_inner()).await?;
    require_user(principal)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::delete_food(&mut conn, food.id).await?;

    tracing::info!(food_id = food.id, "Food deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_food)
        .service(list_foods)
        .service(show_food)
        .service(edit_food)
        .service(delete_food);
}
