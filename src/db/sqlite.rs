use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use super::models::*;
use crate::api::AppError;
use crate::config::Config;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone)]
pub struct SqliteRepo {
    pub pool: SqlitePool,
}

impl SqliteRepo {
    pub async fn init(config: &Config) -> Result<SqliteRepo> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| AppError::Internal(format!("DATABASE_URL inválida: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Internal(format!("Error conectando a SQLite: {}", e)))?;

        // Test connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("Error validando conexión SQLite: {}", e)))?;

        tracing::info!(url = %config.database_url, "Conexión a SQLite establecida");

        Ok(SqliteRepo { pool })
    }

    /// Base de datos en memoria con el esquema aplicado (tests y demos)
    ///
    /// Una sola conexión que nunca expira: cada conexión SQLite en memoria
    /// tiene su propia base de datos.
    pub async fn in_memory() -> Result<SqliteRepo> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::Internal(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database("connect_in_memory", e))?;

        let repo = SqliteRepo { pool };
        repo.run_migrations().await?;
        Ok(repo)
    }

    /// Aplica las migraciones embebidas de `migrations/`
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Error aplicando migraciones: {}", e)))?;

        tracing::debug!("Migraciones aplicadas");
        Ok(())
    }

    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| AppError::database("acquire_connection", e))
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::database("begin_transaction", e))
    }

    pub fn current_timestamp() -> DateTime<Utc> {
        Utc::now()
    }

    // ---- user -------------------------------------------------------------

    pub async fn find_user(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_user", e))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM user WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_user_by_email", e))
    }

    pub async fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM user WHERE api_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_user_by_token", e))
    }

    pub async fn insert_user(conn: &mut SqliteConnection, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO user (email, roles, password, api_token, first_name, last_name, guest_number, allergy, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
            .bind(&user.email)
            .bind(Json(&user.roles))
            .bind(&user.password)
            .bind(&user.api_token)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.guest_number)
            .bind(&user.allergy)
            .bind(Self::current_timestamp())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| unique_violation_as_conflict("insert_user", e, "Email already registered"))
    }

    pub async fn update_user(conn: &mut SqliteConnection, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user
            SET first_name = ?, last_name = ?, guest_number = ?, allergy = ?, password = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.guest_number)
            .bind(&user.allergy)
            .bind(&user.password)
            .bind(user.updated_at)
            .bind(user.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("update_user", e))?;
        Ok(())
    }

    /// Borra el usuario; sus reservas quedan sin cliente y su restaurante sin dueño
    pub async fn delete_user(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    // ---- restaurant -------------------------------------------------------

    pub async fn find_restaurant(&self, id: i64) -> Result<Option<Restaurant>> {
        sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurant WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_restaurant", e))
    }

    pub async fn find_restaurant_by_owner(&self, owner_id: i64) -> Result<Option<Restaurant>> {
        sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurant WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_restaurant_by_owner", e))
    }

    pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
        sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurant ORDER BY name ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("list_restaurants", e))
    }

    pub async fn insert_restaurant(
        conn: &mut SqliteConnection,
        restaurant: &NewRestaurant,
    ) -> Result<Restaurant> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            INSERT INTO restaurant (owner_id, name, description, am_opening_time, pm_opening_time, max_guest, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
            .bind(restaurant.owner_id)
            .bind(&restaurant.name)
            .bind(&restaurant.description)
            .bind(Json(&restaurant.am_opening_time))
            .bind(Json(&restaurant.pm_opening_time))
            .bind(restaurant.max_guest)
            .bind(Self::current_timestamp())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| unique_violation_as_conflict("insert_restaurant", e, "User already owns a restaurant"))
    }

    pub async fn update_restaurant(conn: &mut SqliteConnection, restaurant: &Restaurant) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE restaurant
            SET name = ?, description = ?, am_opening_time = ?, pm_opening_time = ?, max_guest = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
            .bind(&restaurant.name)
            .bind(&restaurant.description)
            .bind(&restaurant.am_opening_time)
            .bind(&restaurant.pm_opening_time)
            .bind(restaurant.max_guest)
            .bind(restaurant.updated_at)
            .bind(restaurant.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("update_restaurant", e))?;
        Ok(())
    }

    /// Borra el restaurante junto con sus menús, imágenes y reservas
    pub async fn delete_restaurant(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        delete_by_id(conn, "restaurant", id).await
    }

    // ---- menu -------------------------------------------------------------

    pub async fn find_menu(&self, id: i64) -> Result<Option<Menu>> {
        sqlx::query_as::<_, Menu>("SELECT * FROM menu WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_menu", e))
    }

    pub async fn list_menus(&self, restaurant_id: Option<i64>) -> Result<Vec<Menu>> {
        match restaurant_id {
            Some(restaurant_id) => sqlx::query_as::<_, Menu>(
                "SELECT * FROM menu WHERE restaurant_id = ? ORDER BY created_at DESC, id DESC",
            )
                .bind(restaurant_id)
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query_as::<_, Menu>("SELECT * FROM menu ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await,
        }
            .map_err(|e| AppError::database("list_menus", e))
    }

    pub async fn insert_menu(conn: &mut SqliteConnection, menu: &NewMenu) -> Result<Menu> {
        sqlx::query_as::<_, Menu>(
            r#"
            INSERT INTO menu (restaurant_id, title, description, price, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
            .bind(menu.restaurant_id)
            .bind(&menu.title)
            .bind(&menu.description)
            .bind(menu.price)
            .bind(Self::current_timestamp())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::database("insert_menu", e))
    }

    pub async fn update_menu(conn: &mut SqliteConnection, menu: &Menu) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE menu
            SET restaurant_id = ?, title = ?, description = ?, price = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
            .bind(menu.restaurant_id)
            .bind(&menu.title)
            .bind(&menu.description)
            .bind(menu.price)
            .bind(menu.updated_at)
            .bind(menu.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("update_menu", e))?;
        Ok(())
    }

    pub async fn delete_menu(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        delete_by_id(conn, "menu", id).await
    }

    // ---- food -------------------------------------------------------------

    pub async fn find_food(&self, id: i64) -> Result<Option<Food>> {
        sqlx::query_as::<_, Food>("SELECT * FROM food WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_food", e))
    }

    pub async fn list_foods(&self) -> Result<Vec<Food>> {
        sqlx::query_as::<_, Food>("SELECT * FROM food ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("list_foods", e))
    }

    pub async fn insert_food(conn: &mut SqliteConnection, food: &NewFood) -> Result<Food> {
        sqlx::query_as::<_, Food>(
            r#"
            INSERT INTO food (title, description, price, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
            .bind(&food.title)
            .bind(&food.description)
            .bind(food.price)
            .bind(Self::current_timestamp())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::database("insert_food", e))
    }

    pub async fn update_food(conn: &mut SqliteConnection, food: &Food) -> Result<()> {
        sqlx::query("UPDATE food SET title = ?, description = ?, price = ?, updated_at = ? WHERE id = ?")
            .bind(&food.title)
            .bind(&food.description)
            .bind(food.price)
            .bind(food.updated_at)
            .bind(food.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("update_food", e))?;
        Ok(())
    }

    pub async fn delete_food(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        delete_by_id(conn, "food", id).await
    }

    // ---- category ---------------------------------------------------------

    pub async fn find_category(&self, id: i64) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>("SELECT * FROM category WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_category", e))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>("SELECT * FROM category ORDER BY title ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("list_categories", e))
    }

    pub async fn insert_category(conn: &mut SqliteConnection, title: &str) -> Result<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO category (title, created_at) VALUES (?, ?) RETURNING *",
        )
            .bind(title)
            .bind(Self::current_timestamp())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::database("insert_category", e))
    }

    pub async fn update_category(conn: &mut SqliteConnection, category: &Category) -> Result<()> {
        sqlx::query("UPDATE category SET title = ?, updated_at = ? WHERE id = ?")
            .bind(&category.title)
            .bind(category.updated_at)
            .bind(category.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("update_category", e))?;
        Ok(())
    }

    pub async fn delete_category(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        delete_by_id(conn, "category", id).await
    }

    // ---- picture ----------------------------------------------------------

    pub async fn find_picture(&self, id: i64) -> Result<Option<Picture>> {
        sqlx::query_as::<_, Picture>("SELECT * FROM picture WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_picture", e))
    }

    pub async fn list_pictures(&self, limit: i64) -> Result<Vec<Picture>> {
        sqlx::query_as::<_, Picture>("SELECT * FROM picture ORDER BY created_at DESC, id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("list_pictures", e))
    }

    pub async fn insert_picture(conn: &mut SqliteConnection, picture: &NewPicture) -> Result<Picture> {
        sqlx::query_as::<_, Picture>(
            r#"
            INSERT INTO picture (restaurant_id, title, slug, file_path, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
            .bind(picture.restaurant_id)
            .bind(&picture.title)
            .bind(&picture.slug)
            .bind(&picture.file_path)
            .bind(Self::current_timestamp())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::database("insert_picture", e))
    }

    pub async fn update_picture(conn: &mut SqliteConnection, picture: &Picture) -> Result<()> {
        sqlx::query("UPDATE picture SET title = ?, slug = ?, file_path = ?, updated_at = ? WHERE id = ?")
            .bind(&picture.title)
            .bind(&picture.slug)
            .bind(&picture.file_path)
            .bind(picture.updated_at)
            .bind(picture.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("update_picture", e))?;
        Ok(())
    }

    pub async fn delete_picture(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        delete_by_id(conn, "picture", id).await
    }

    // ---- booking ----------------------------------------------------------

    pub async fn find_booking(&self, id: i64) -> Result<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM booking WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("find_booking", e))
    }

    /// Reservas de un cliente, la más lejana primero
    pub async fn list_bookings_for_client(&self, client_id: i64) -> Result<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM booking WHERE client_id = ? ORDER BY order_date DESC, order_hour DESC, id DESC",
        )
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("list_bookings_for_client", e))
    }

    pub async fn insert_booking(conn: &mut SqliteConnection, booking: &NewBooking) -> Result<Booking> {
        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO booking (restaurant_id, client_id, guest_number, order_date, order_hour, allergy, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
            .bind(booking.restaurant_id)
            .bind(booking.client_id)
            .bind(booking.guest_number)
            .bind(booking.order_date)
            .bind(booking.order_hour)
            .bind(&booking.allergy)
            .bind(Self::current_timestamp())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::database("insert_booking", e))
    }

    pub async fn update_booking(conn: &mut SqliteConnection, booking: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE booking
            SET guest_number = ?, order_date = ?, order_hour = ?, allergy = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
            .bind(booking.guest_number)
            .bind(booking.order_date)
            .bind(booking.order_hour)
            .bind(&booking.allergy)
            .bind(booking.updated_at)
            .bind(booking.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("update_booking", e))?;
        Ok(())
    }

    pub async fn delete_booking(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        delete_by_id(conn, "booking", id).await
    }

    /// Número de usuarios registrados
    pub async fn count_users(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database("count_users", e))
    }
}

async fn delete_by_id(conn: &mut SqliteConnection, table: &'static str, id: i64) -> Result<bool> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::database(&format!("delete_{}", table), e))?;
    Ok(result.rows_affected() > 0)
}

fn unique_violation_as_conflict(operation: &str, error: sqlx::Error, message: &str) -> AppError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message.to_string()),
        _ => AppError::database(operation, error),
    }
}
