//! Persistencia de las tablas de unión muchos-a-muchos.
//!
//! Category es el lado propietario de ambas asociaciones: las filas de
//! `category_food` y `category_menu` se escriben siempre como
//! `(category_id, X_id)`, venga el cambio de donde venga.

use std::collections::BTreeSet;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::relation::{LinkChanges, ManyToMany};
use super::sqlite::{Result, SqliteRepo};
use crate::api::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinTable {
    CategoryFood,
    CategoryMenu,
}

impl JoinTable {
    fn table(self) -> &'static str {
        match self {
            JoinTable::CategoryFood => "category_food",
            JoinTable::CategoryMenu => "category_menu",
        }
    }

    fn inverse_column(self) -> &'static str {
        match self {
            JoinTable::CategoryFood => "food_id",
            JoinTable::CategoryMenu => "menu_id",
        }
    }
}

/// Tablas cuyas ids pueden llegar en listas `categoryIds`, `foodIds`, `menuIds`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityTable {
    Category,
    Food,
    Menu,
}

impl EntityTable {
    fn table(self) -> &'static str {
        match self {
            EntityTable::Category => "category",
            EntityTable::Food => "food",
            EntityTable::Menu => "menu",
        }
    }
}

impl SqliteRepo {
    /// Carga la tabla de unión completa
    pub async fn load_links(&self, join: JoinTable) -> Result<ManyToMany<i64, i64>> {
        let sql = format!(
            "SELECT category_id, {} FROM {}",
            join.inverse_column(),
            join.table()
        );
        let pairs = sqlx::query_as::<_, (i64, i64)>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("load_links", e))?;
        Ok(ManyToMany::from_pairs(pairs))
    }

    /// Filtra las ids que existen de verdad, conservando el orden recibido
    pub async fn existing_ids(&self, entity: EntityTable, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT id FROM {} WHERE id IN (",
            entity.table()
        ));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let found: Vec<i64> = builder
            .build_query_scalar::<i64>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("existing_ids", e))?;

        let mut seen = BTreeSet::new();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| found.contains(id) && seen.insert(*id))
            .collect())
    }

    /// Enlaces de una categoría (lado propietario)
    pub async fn links_of_category(
        conn: &mut SqliteConnection,
        join: JoinTable,
        category_id: i64,
    ) -> Result<ManyToMany<i64, i64>> {
        let sql = format!(
            "SELECT category_id, {col} FROM {table} WHERE category_id = ?",
            col = join.inverse_column(),
            table = join.table()
        );
        let pairs = sqlx::query_as::<_, (i64, i64)>(&sql)
            .bind(category_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::database("links_of_category", e))?;
        Ok(ManyToMany::from_pairs(pairs))
    }

    /// Enlaces de un plato o un menú (lado inverso)
    pub async fn links_of_inverse(
        conn: &mut SqliteConnection,
        join: JoinTable,
        inverse_id: i64,
    ) -> Result<ManyToMany<i64, i64>> {
        let sql = format!(
            "SELECT category_id, {col} FROM {table} WHERE {col} = ?",
            col = join.inverse_column(),
            table = join.table()
        );
        let pairs = sqlx::query_as::<_, (i64, i64)>(&sql)
            .bind(inverse_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::database("links_of_inverse", e))?;
        Ok(ManyToMany::from_pairs(pairs))
    }

    /// Escribe en la tabla de unión los cambios calculados en memoria
    ///
    /// Las inserciones usan `INSERT OR IGNORE`: un par ya presente no
    /// genera una fila duplicada.
    pub async fn persist_link_changes(
        conn: &mut SqliteConnection,
        join: JoinTable,
        changes: &LinkChanges<i64, i64>,
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let insert = format!(
            "INSERT OR IGNORE INTO {} (category_id, {}) VALUES (?, ?)",
            join.table(),
            join.inverse_column()
        );
        for (category_id, inverse_id) in &changes.linked {
            sqlx::query(&insert)
                .bind(category_id)
                .bind(inverse_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::database("link", e))?;
        }

        let delete = format!(
            "DELETE FROM {} WHERE category_id = ? AND {} = ?",
            join.table(),
            join.inverse_column()
        );
        for (category_id, inverse_id) in &changes.unlinked {
            sqlx::query(&delete)
                .bind(category_id)
                .bind(inverse_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::database("unlink", e))?;
        }

        tracing::debug!(
            table = join.table(),
            linked = changes.linked.len(),
            unlinked = changes.unlinked.len(),
            "Join table updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn persisted_links_are_not_duplicated() {
        let repo = SqliteRepo::in_memory().await.unwrap();
        let mut tx = repo.begin().await.unwrap();
        let category = SqliteRepo::insert_category(&mut tx, "Desserts").await.unwrap();
        let food = SqliteRepo::insert_food(
            &mut tx,
            &crate::db::models::NewFood {
                title: "Tarte".to_string(),
                description: "Aux pommes".to_string(),
                price: 9,
            },
        )
        .await
        .unwrap();

        let changes = LinkChanges {
            linked: vec![(category.id, food.id), (category.id, food.id)],
            unlinked: vec![],
        };
        SqliteRepo::persist_link_changes(&mut tx, JoinTable::CategoryFood, &changes)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let links = repo.load_links(JoinTable::CategoryFood).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links.lefts_of(food.id), vec![category.id]);
    }

    #[actix_web::test]
    async fn existing_ids_skips_unknown_and_repeated() {
        let repo = SqliteRepo::in_memory().await.unwrap();
        let mut conn = repo.acquire().await.unwrap();
        let first = SqliteRepo::insert_category(&mut conn, "Entrées").await.unwrap();
        let second = SqliteRepo::insert_category(&mut conn, "Plats").await.unwrap();
        drop(conn);

        let kept = repo
            .existing_ids(EntityTable::Category, &[second.id, 999, second.id, first.id])
            .await
            .unwrap();

        assert_eq!(kept, vec![second.id, first.id]);
    }
}
