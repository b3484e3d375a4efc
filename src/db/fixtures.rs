//! # Datos de demostración
//!
//! Carga un conjunto determinista de usuarios, restaurantes, carta y
//! reservas. Las asociaciones se construyen primero en memoria con
//! [`ManyToMany`] y [`OneToMany`] y después se vuelcan en una sola
//! transacción.

use chrono::{Duration, NaiveTime};

use super::links::JoinTable;
use super::models::*;
use super::relation::{LinkChanges, ManyToMany, OneToMany};
use super::sqlite::{Result, SqliteRepo};
use crate::api::security::{generate_api_token, hash_password};
use crate::api::AppError;

pub const USER_COUNT: usize = 20;
pub const RESTAURANT_COUNT: usize = 20;
pub const FOOD_COUNT: usize = 30;
pub const MENU_COUNT: usize = 20;
pub const PICTURE_COUNT: usize = 20;
pub const BOOKING_COUNT: usize = 50;

pub const CATEGORY_LABELS: [&str; 8] = [
    "Entrées",
    "Plats",
    "Desserts",
    "Végétarien",
    "Viandes",
    "Poissons",
    "Fromages",
    "Boissons",
];

const FIRST_NAMES: [&str; 10] = [
    "Camille", "Louis", "Chloé", "Hugo", "Léa", "Arthur", "Manon", "Jules", "Inès", "Gabriel",
];
const LAST_NAMES: [&str; 10] = [
    "Martin", "Bernard", "Dubois", "Thomas", "Robert", "Richard", "Petit", "Durand", "Leroy",
    "Moreau",
];
const DISHES: [&str; 10] = [
    "Ravioles aux cèpes",
    "Tartiflette",
    "Diots au vin blanc",
    "Fondue savoyarde",
    "Omble chevalier",
    "Croziflette",
    "Gratin dauphinois",
    "Tarte aux myrtilles",
    "Gâteau de Savoie",
    "Soupe d'ortie",
];
const MENU_NAMES: [&str; 5] = ["du marché", "dégustation", "du midi", "enfant", "du chef"];
const ALLERGIES: [&str; 3] = ["gluten", "lactose", "arachides"];
const HOURS: [u32; 5] = [12, 13, 19, 20, 21];
const MINUTES: [u32; 4] = [0, 15, 30, 45];

/// Contadores de lo que se ha insertado
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FixtureSummary {
    pub users: usize,
    pub restaurants: usize,
    pub categories: usize,
    pub foods: usize,
    pub menus: usize,
    pub pictures: usize,
    pub bookings: usize,
    pub category_food_links: usize,
    pub category_menu_links: usize,
}

/// Carga los datos de demostración en una base de datos vacía
///
/// # Errores
///
/// - `Conflict`: la base de datos ya contiene usuarios
pub async fn load(repo: &SqliteRepo) -> Result<FixtureSummary> {
    if repo.count_users().await? > 0 {
        return Err(AppError::Conflict(
            "La base de datos ya contiene datos, no se cargan fixtures".to_string(),
        ));
    }

    // El hash de argon2 es caro: se calcula antes de abrir la transacción
    let mut new_users = Vec::with_capacity(USER_COUNT);
    for i in 1..=USER_COUNT {
        let guests = (i % 6) as i64;
        new_users.push(NewUser {
            email: format!("email.{i}@studi.fr"),
            roles: Vec::new(),
            password: hash_password(&format!("password{i}"))?,
            api_token: generate_api_token(),
            first_name: Some(FIRST_NAMES[i % FIRST_NAMES.len()].to_string()),
            last_name: Some(LAST_NAMES[(i * 3) % LAST_NAMES.len()].to_string()),
            guest_number: (guests > 0).then_some(guests),
            allergy: None,
        });
    }

    let mut summary = FixtureSummary::default();
    let mut tx = repo.begin().await?;

    let mut user_ids = Vec::with_capacity(USER_COUNT);
    for new_user in &new_users {
        user_ids.push(SqliteRepo::insert_user(&mut tx, new_user).await?.id);
        summary.users += 1;
    }

    let mut restaurants = Vec::with_capacity(RESTAURANT_COUNT);
    for (i, owner_id) in user_ids.iter().enumerate().take(RESTAURANT_COUNT) {
        let n = i + 1;
        let restaurant = SqliteRepo::insert_restaurant(
            &mut tx,
            &NewRestaurant {
                owner_id: *owner_id,
                name: format!("Restaurant n°{n}"),
                description: format!("Description n°{n}"),
                am_opening_time: Vec::new(),
                pm_opening_time: Vec::new(),
                max_guest: 10 + ((n * 7) % 41) as i64,
            },
        )
        .await?;
        restaurants.push(restaurant);
        summary.restaurants += 1;
    }

    let mut category_ids = Vec::with_capacity(CATEGORY_LABELS.len());
    for label in CATEGORY_LABELS {
        category_ids.push(SqliteRepo::insert_category(&mut tx, label).await?.id);
        summary.categories += 1;
    }
    let category_at = |k: usize| category_ids[k % category_ids.len()];

    // Plato ↔ categoría: 1 a 3 categorías por plato
    let mut category_food = ManyToMany::new();
    for i in 1..=FOOD_COUNT {
        let food = SqliteRepo::insert_food(
            &mut tx,
            &NewFood {
                title: format!("{} n°{i}", DISHES[i % DISHES.len()]),
                description: format!("Spécialité maison n°{i}"),
                price: 6 + ((i * 5) % 40) as i64,
            },
        )
        .await?;
        summary.foods += 1;

        for k in 0..(1 + i % 3) {
            category_food.link(category_at(i + k * 3), food.id);
        }
    }

    // Menú ↔ categoría: 1 a 4 categorías por menú
    let mut category_menu = ManyToMany::new();
    for i in 1..=MENU_COUNT {
        let restaurant = &restaurants[(i * 7) % restaurants.len()];
        let menu = SqliteRepo::insert_menu(
            &mut tx,
            &NewMenu {
                restaurant_id: restaurant.id,
                title: format!("Menu {}", MENU_NAMES[i % MENU_NAMES.len()]),
                description: format!("Entrée, plat et dessert n°{i}"),
                price: 15 + ((i * 13) % 81) as i64,
            },
        )
        .await?;
        summary.menus += 1;

        for k in 0..(1 + i % 4) {
            category_menu.link(category_at(i + k * 5), menu.id);
        }
    }

    summary.category_food_links = category_food.len();
    summary.category_menu_links = category_menu.len();
    SqliteRepo::persist_link_changes(&mut tx, JoinTable::CategoryFood, &all_linked(&category_food))
        .await?;
    SqliteRepo::persist_link_changes(&mut tx, JoinTable::CategoryMenu, &all_linked(&category_menu))
        .await?;

    // Restaurante ↔ imágenes / reservas, indexadas por su número de fixture
    let mut pictures = OneToMany::new();
    for i in 1..=PICTURE_COUNT {
        pictures.attach(restaurants[(i * 3) % restaurants.len()].id, i);
    }

    let mut bookings = OneToMany::new();
    for i in 1..=BOOKING_COUNT {
        bookings.attach(restaurants[(i * 11) % restaurants.len()].id, i);
    }

    let today = chrono::Utc::now().date_naive();
    for restaurant in &restaurants {
        for i in pictures.children_of(restaurant.id) {
            SqliteRepo::insert_picture(
                &mut tx,
                &NewPicture {
                    restaurant_id: restaurant.id,
                    title: format!("{} vue n°{i}", restaurant.name),
                    slug: format!("picture-{i}"),
                    file_path: None,
                },
            )
            .await?;
            summary.pictures += 1;
        }

        for i in bookings.children_of(restaurant.id) {
            let order_hour = NaiveTime::from_hms_opt(
                HOURS[i % HOURS.len()],
                MINUTES[(i / HOURS.len()) % MINUTES.len()],
                0,
            )
            .ok_or_else(|| AppError::Internal(format!("Hora de fixture inválida n°{i}")))?;
            let max_guests = restaurant.max_guest.clamp(1, 8);

            SqliteRepo::insert_booking(
                &mut tx,
                &NewBooking {
                    restaurant_id: restaurant.id,
                    // 7 de cada 10 reservas tienen cliente
                    client_id: (i % 10 < 7).then(|| user_ids[(i * 11) % user_ids.len()]),
                    guest_number: 1 + (i as i64 % max_guests),
                    order_date: today + Duration::days(1 + (i % 30) as i64),
                    order_hour,
                    allergy: (i % 5 == 0).then(|| ALLERGIES[i % ALLERGIES.len()].to_string()),
                },
            )
            .await?;
            summary.bookings += 1;
        }
    }

    tx.commit()
        .await
        .map_err(|e| AppError::database("commit_fixtures", e))?;

    tracing::info!(?summary, "Fixtures cargadas");
    Ok(summary)
}

fn all_linked(relation: &ManyToMany<i64, i64>) -> LinkChanges<i64, i64> {
    LinkChanges {
        linked: relation.pairs(),
        unlinked: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn loads_a_consistent_dataset() {
        let repo = SqliteRepo::in_memory().await.unwrap();

        let summary = load(&repo).await.unwrap();

        assert_eq!(summary.users, USER_COUNT);
        assert_eq!(summary.restaurants, RESTAURANT_COUNT);
        assert_eq!(summary.categories, CATEGORY_LABELS.len());
        assert_eq!(summary.pictures, PICTURE_COUNT);
        assert_eq!(summary.bookings, BOOKING_COUNT);

        let category_food = repo.load_links(JoinTable::CategoryFood).await.unwrap();
        assert_eq!(category_food.len(), summary.category_food_links);
        for food in repo.list_foods().await.unwrap() {
            let categories = category_food.lefts_of(food.id);
            assert!((1..=3).contains(&categories.len()), "food {} has {:?}", food.id, categories);
        }

        let user = repo.find_user_by_email("email.1@studi.fr").await.unwrap().unwrap();
        assert!(crate::api::security::verify_password("password1", &user.password));
        assert!(repo.find_restaurant_by_owner(user.id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn refuses_a_non_empty_database() {
        let repo = SqliteRepo::in_memory().await.unwrap();
        load(&repo).await.unwrap();

        let err = load(&repo).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }
}
