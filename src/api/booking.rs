//! # API de Reservas
//!
//! Este módulo maneja todas las operaciones relacionadas con reservas:
//! - Crear una reserva en un restaurante
//! - Listar las reservas propias
//! - Consultar, modificar y cancelar una reserva
//!
//! Todas las operaciones requieren token y solo el cliente que hizo la
//! reserva puede verla o tocarla.

use actix_web::http::header;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::middleware::{authenticated_user, current_user, require_user};
use super::restaurant::find_restaurant_or_404;
use super::validation::{self, nullable};
use super::{AppError, AppResult, ResultExt};
use crate::db::{Booking, NewBooking, SqliteRepo, User};

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: i64,
    pub restaurant_id: i64,
    pub client_id: Option<i64>,
    pub guest_number: i64,
    pub order_date: String,
    pub order_hour: String,
    pub allergy: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        BookingResponse {
            order_date: validation::format_date(&booking.order_date),
            order_hour: validation::format_time(&booking.order_hour),
            created_at: validation::format_datetime(&booking.created_at),
            updated_at: validation::format_optional_datetime(&booking.updated_at),
            id: booking.id,
            restaurant_id: booking.restaurant_id,
            client_id: booking.client_id,
            guest_number: booking.guest_number,
            allergy: booking.allergy,
        }
    }
}

/// Campos escribibles de una reserva
///
/// `orderDate` va en formato `YYYY-MM-DD`, `orderHour` en `HH:MM` o `HH:MM:SS`.
#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    restaurant_id: Option<i64>,
    guest_number: Option<i64>,
    order_date: Option<String>,
    order_hour: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    allergy: Option<Option<String>>,
}

fn missing(field: &str) -> AppError {
    AppError::validation_field(field, "es obligatorio")
}

impl BookingPayload {
    fn into_new(self, restaurant_id: i64, client_id: i64) -> AppResult<NewBooking> {
        let guest_number = self.guest_number.ok_or_else(|| missing("guestNumber"))?;
        let order_date = self.order_date.ok_or_else(|| missing("orderDate"))?;
        let order_hour = self.order_hour.ok_or_else(|| missing("orderHour"))?;

        Ok(NewBooking {
            restaurant_id,
            client_id: Some(client_id),
            guest_number: validation::at_least_one("guestNumber", guest_number)?,
            order_date: validation::parse_date("orderDate", &order_date)?,
            order_hour: validation::parse_time("orderHour", &order_hour)?,
            allergy: validation::optional_text("allergy", self.allergy.flatten(), 255)?,
        })
    }

    fn apply(self, booking: &mut Booking) -> AppResult<()> {
        if let Some(guest_number) = self.guest_number {
            booking.guest_number = validation::at_least_one("guestNumber", guest_number)?;
        }
        if let Some(order_date) = self.order_date {
            booking.order_date = validation::parse_date("orderDate", &order_date)?;
        }
        if let Some(order_hour) = self.order_hour {
            booking.order_hour = validation::parse_time("orderHour", &order_hour)?;
        }
        if let Some(allergy) = self.allergy {
            booking.allergy = validation::optional_text("allergy", allergy, 255)?;
        }

        booking.updated_at = Some(SqliteRepo::current_timestamp());
        Ok(())
    }
}

async fn find_booking_or_404(repo: &SqliteRepo, id: i64) -> AppResult<Booking> {
    repo.find_booking(id)
        .await?
        .ok_or_else(|| AppError::not_found_id("Booking", id))
}

/// `403` si `user` no es el cliente de la reserva
fn ensure_client(booking: &Booking, user: &User) -> AppResult<()> {
    if booking.client_id != Some(user.id) {
        tracing::warn!(booking_id = booking.id, user_id = user.id, "User is not the booking client");
        return Err(AppError::Forbidden(
            "Solo el cliente de la reserva puede hacer esto".to_string(),
        ));
    }
    Ok(())
}

/// Crea una reserva para el usuario autenticado
///
/// # Errores
///
/// - `400 Bad Request`: Falta `restaurantId`, `guestNumber`, `orderDate` u
///   `orderHour`, o alguno tiene un valor inválido
/// - `401 Unauthorized`: Sin token
/// - `404 Not Found`: El restaurante no existe
#[post("/api/booking")]
#[tracing::instrument(skip_all)]
async fn create_booking(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let user = authenticated_user(&repo, &req).await?;
    let data: BookingPayload = validation::parse_body(&body)?;

    let restaurant_id = data.restaurant_id.ok_or_else(|| missing("restaurantId"))?;
    let restaurant = find_restaurant_or_404(&repo, restaurant_id).await?;
    let new_booking = data.into_new(restaurant.id, user.id)?;

    let mut conn = repo.acquire().await?;
    let booking = SqliteRepo::insert_booking(&mut conn, &new_booking).await?;

    tracing::info!(
        booking_id = booking.id,
        restaurant_id = restaurant.id,
        client_id = user.id,
        "Booking created"
    );

    let location = req
        .url_for("booking_show", [booking.id.to_string()])
        .map_err_internal("building booking location")?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location.to_string()))
        .json(BookingResponse::from(booking)))
}

/// Reservas del usuario autenticado, la más lejana primero
#[get("/api/booking")]
async fn list_bookings(repo: web::Data<SqliteRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    let user = authenticated_user(&repo, &req).await?;

    let bookings = repo.list_bookings_for_client(user.id).await?;
    let results: Vec<BookingResponse> = bookings.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(results))
}

#[get("/api/booking/{id}", name = "booking_show")]
async fn show_booking(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let booking = find_booking_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;
    ensure_client(&booking, &user)?;

    Ok(HttpResponse::Ok().json(BookingResponse::from(booking)))
}

#[route("/api/booking/{id}", method = "PUT", method = "PATCH")]
#[tracing::instrument(skip_all, fields(booking_id = %path))]
async fn edit_booking(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let mut booking = find_booking_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;
    ensure_client(&booking, &user)?;

    let data: BookingPayload = validation::parse_body(&body)?;
    data.apply(&mut booking)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::update_booking(&mut conn, &booking).await?;

    tracing::info!(booking_id = booking.id, "Booking updated");
    Ok(HttpResponse::Ok().json(BookingResponse::from(booking)))
}

#[delete("/api/booking/{id}")]
#[tracing::instrument(skip_all, fields(booking_id = %path))]
async fn delete_booking(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let principal = current_user(&repo, &req).await?;
    let booking = find_booking_or_404(&repo, path.into_inner()).await?;
    let user = require_user(principal)?;
    ensure_client(&booking, &user)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::delete_booking(&mut conn, booking.id).await?;

    tracing::info!(booking_id = booking.id, "Booking cancelled");
    Ok(HttpResponse::NoContent().finish())
}

/// Configura las rutas de reservas
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_booking)
        .service(list_bookings)
        .service(show_booking)
        .service(edit_booking)
        .service(delete_booking);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_required_field_is_checked() {
        for (body, field) in [
            (r#"{"orderDate": "2025-10-12", "orderHour": "19:30"}"#, "guestNumber"),
            (r#"{"guestNumber": 2, "orderHour": "19:30"}"#, "orderDate"),
            (r#"{"guestNumber": 2, "orderDate": "2025-10-12"}"#, "orderHour"),
        ] {
            let payload: BookingPayload = serde_json::from_str(body).unwrap();
            let err = payload.into_new(1, 1).unwrap_err();
            assert!(
                matches!(&err, AppError::ValidationWithField { field: f, .. } if f == field),
                "{body}: {err}"
            );
        }
    }

    #[test]
    fn new_booking_belongs_to_the_client() {
        let payload: BookingPayload = serde_json::from_str(
            r#"{"guestNumber": 4, "orderDate": "2025-10-12", "orderHour": "19:30", "allergy": ""}"#,
        )
        .unwrap();

        let booking = payload.into_new(3, 8).unwrap();

        assert_eq!(booking.client_id, Some(8));
        assert_eq!(booking.restaurant_id, 3);
        assert_eq!(booking.allergy, None);
        assert_eq!(validation::format_time(&booking.order_hour), "19:30:00");
    }

    #[test]
    fn zero_guests_is_rejected() {
        let payload: BookingPayload = serde_json::from_str(
            r#"{"guestNumber": 0, "orderDate": "2025-10-12", "orderHour": "19:30"}"#,
        )
        .unwrap();

        assert!(payload.into_new(1, 1).is_err());
    }
}
