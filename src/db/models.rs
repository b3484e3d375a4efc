use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

/// Rol que todo usuario tiene implícitamente
pub const ROLE_USER: &str = "ROLE_USER";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub roles: Json<Vec<String>>,
    /// Hash PHC de argon2, nunca la contraseña en claro
    pub password: String,
    pub api_token: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub guest_number: Option<i64>,
    pub allergy: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Roles almacenados más `ROLE_USER`, sin duplicados
    pub fn effective_roles(&self) -> Vec<String> {
        let mut roles = self.roles.0.clone();
        roles.push(ROLE_USER.to_string());
        roles.sort();
        roles.dedup();
        roles
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Restaurant {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub am_opening_time: Json<Vec<String>>,
    pub pm_opening_time: Json<Vec<String>>,
    pub max_guest: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Restaurant {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner_id == Some(user.id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Menu {
    pub id: i64,
    pub restaurant_id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Food {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Picture {
    pub id: i64,
    pub restaurant_id: i64,
    pub title: String,
    pub slug: String,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: i64,
    pub restaurant_id: i64,
    /// `None` cuando el cliente ha borrado su cuenta
    pub client_id: Option<i64>,
    pub guest_number: i64,
    pub order_date: NaiveDate,
    pub order_hour: NaiveTime,
    pub allergy: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Valores para inserción: el id y las marcas de tiempo los pone el repositorio

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub roles: Vec<String>,
    pub password: String,
    pub api_token: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub guest_number: Option<i64>,
    pub allergy: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub am_opening_time: Vec<String>,
    pub pm_opening_time: Vec<String>,
    pub max_guest: i64,
}

#[derive(Debug, Clone)]
pub struct NewMenu {
    pub restaurant_id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub title: String,
    pub description: String,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct NewPicture {
    pub restaurant_id: i64,
    pub title: String,
    pub slug: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub restaurant_id: i64,
    pub client_id: Option<i64>,
    pub guest_number: i64,
    pub order_date: NaiveDate,
    pub order_hour: NaiveTime,
    pub allergy: Option<String>,
}
