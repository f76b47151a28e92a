//! SQLite storage gateway.
//!
//! Two tables keyed by listing id: `properties` holds the normalized fields,
//! `raw_data` the card payload. Rows are only ever inserted or updated.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};
use std::str::FromStr;
use tracing::debug;

use crate::error::StorageError;
use crate::models::{Property, RawPayload};
use crate::storage::Storage;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id TEXT PRIMARY KEY,
    first_photo TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL DEFAULT '',
    condo_fee TEXT NOT NULL DEFAULT '',
    total_price TEXT NOT NULL DEFAULT '',
    street TEXT NOT NULL DEFAULT '',
    neighborhood TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    area_sqm TEXT NOT NULL DEFAULT '',
    bedrooms TEXT NOT NULL DEFAULT '',
    bathrooms TEXT NOT NULL DEFAULT '',
    suites TEXT NOT NULL DEFAULT '',
    parking_spaces TEXT NOT NULL DEFAULT '',
    property_type TEXT NOT NULL DEFAULT '',
    distance_meters INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS raw_data (
    id TEXT PRIMARY KEY REFERENCES properties(id),
    json_data TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// SQLite-backed listing store
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct PropertyRow {
    id: String,
    first_photo: String,
    price: String,
    condo_fee: String,
    total_price: String,
    street: String,
    neighborhood: String,
    city: String,
    area_sqm: String,
    bedrooms: String,
    bathrooms: String,
    suites: String,
    parking_spaces: String,
    property_type: String,
    distance_meters: i64,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Self {
            id: row.id,
            first_photo: row.first_photo,
            price: row.price,
            condo_fee: row.condo_fee,
            total_price: row.total_price,
            street: row.street,
            neighborhood: row.neighborhood,
            city: row.city,
            area_sqm: row.area_sqm,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            suites: row.suites,
            parking_spaces: row.parking_spaces,
            property_type: row.property_type,
            distance_meters: row.distance_meters,
        }
    }
}

impl SqliteStore {
    /// Open (creating if needed) the database at `database_url` and bootstrap the schema.
    ///
    /// Accepts `sqlite://path.db` style URLs or a bare file path.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// In-memory database on a single long-lived connection
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn write_property(
        tx: &mut Transaction<'_, Sqlite>,
        property: &Property,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO properties (
                id, first_photo, price, condo_fee, total_price, street, neighborhood, city,
                area_sqm, bedrooms, bathrooms, suites, parking_spaces, property_type, distance_meters
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                first_photo = excluded.first_photo,
                price = excluded.price,
                condo_fee = excluded.condo_fee,
                total_price = excluded.total_price,
                street = excluded.street,
                neighborhood = excluded.neighborhood,
                city = excluded.city,
                area_sqm = excluded.area_sqm,
                bedrooms = excluded.bedrooms,
                bathrooms = excluded.bathrooms,
                suites = excluded.suites,
                parking_spaces = excluded.parking_spaces,
                property_type = excluded.property_type,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&property.id)
        .bind(&property.first_photo)
        .bind(&property.price)
        .bind(&property.condo_fee)
        .bind(&property.total_price)
        .bind(&property.street)
        .bind(&property.neighborhood)
        .bind(&property.city)
        .bind(&property.area_sqm)
        .bind(&property.bedrooms)
        .bind(&property.bathrooms)
        .bind(&property.suites)
        .bind(&property.parking_spaces)
        .bind(&property.property_type)
        .bind(property.distance_meters)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn write_raw(
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        raw: &RawPayload,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO raw_data (id, json_data)
            VALUES (?, ?)
            ON CONFLICT (id) DO UPDATE SET
                json_data = excluded.json_data,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(id)
        .bind(raw.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    #[cfg(test)]
    pub async fn raw_payload(&self, id: &str) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT json_data FROM raw_data WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(json,)| json))
    }
}

#[async_trait]
impl Storage for SqliteStore {
    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn get(&self, id: &str) -> Result<Property, StorageError> {
        let row: Option<PropertyRow> = sqlx::query_as(
            r#"
            SELECT id, first_photo, price, condo_fee, total_price, street, neighborhood, city,
                   area_sqm, bedrooms, bathrooms, suites, parking_spaces, property_type, distance_meters
            FROM properties WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Property::from).ok_or_else(|| StorageError::NotFound { id: id.to_string() })
    }

    async fn upsert(&self, property: &Property, raw: &RawPayload) -> Result<(), StorageError> {
        // Dropping `tx` on any early return rolls it back
        let mut tx = self.pool.begin().await?;
        Self::write_property(&mut tx, property).await?;
        Self::write_raw(&mut tx, &property.id, raw).await?;
        tx.commit().await?;

        debug!(id = %property.id, "Upserted property");
        Ok(())
    }
}
