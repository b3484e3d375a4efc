// src/db/mod.rs
pub mod fixtures;
pub mod links;
pub mod models;
pub mod relation;
pub mod sqlite;

pub use links::{EntityTable, JoinTable};
pub use models::*;
pub use relation::{LinkChanges, ManyToMany, OneToMany};
pub use sqlite::SqliteRepo;
