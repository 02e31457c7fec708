//! Postgres-backed inventory store.
//!
//! This is the networked database backend; it takes the place a document
//! database would otherwise hold. Rows map one-to-one onto the JSON documents
//! the other backends keep, so the wire shapes are identical.
//!
//! ## Schema
//!
//! Two tables, created idempotently by [`PostgresStore::migrate`]:
//! `locations(id BIGSERIAL, name, modified)` and
//! `items(id BIGSERIAL, name, location_id -> locations ON DELETE RESTRICT, price, number, modified)`.
//! `BIGSERIAL` sequences never hand out a value twice, which gives the
//! never-reuse guarantee for ids.
//!
//! ## Consistency
//!
//! Every mutation runs in a single transaction. Location existence is checked
//! under `FOR SHARE` so a concurrent delete cannot slip in between the check
//! and the insert; location deletion locks the row `FOR UPDATE` before
//! counting referencing items. The foreign key backs both checks.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | Database, foreign key violation (`23503`) | `Domain(InvalidReference / InUse)` |
//! | Database, check violation (`23514`) | `Domain(Validation)` |
//! | anything else | `Persistence` |

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use labinv_core::{DomainError, ItemId, LocationId};
use labinv_inventory::{
    Item, ItemWithLocation, Limits, Location, NewItem, NewLocation,
};

use super::r#trait::{InventoryStore, StoreError};
use crate::config::PostgresConfig;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id       BIGSERIAL PRIMARY KEY,
        name     TEXT NOT NULL CHECK (length(btrim(name)) > 0),
        modified TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id          BIGSERIAL PRIMARY KEY,
        name        TEXT NOT NULL CHECK (length(btrim(name)) > 0),
        location_id BIGINT NOT NULL REFERENCES locations (id) ON DELETE RESTRICT,
        price       DOUBLE PRECISION NOT NULL CHECK (price >= 0),
        number      BIGINT CHECK (number >= 0),
        modified    TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS items_location_id_idx ON items (location_id)",
];

const ITEM_COLUMNS: &str = "id, name, location_id, price, number, modified";

/// Postgres-backed store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; the store itself
/// holds no in-process state beyond the pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    limits: Limits,
}

impl PostgresStore {
    /// Connect, verify the server answers, and ensure the schema exists.
    ///
    /// Any failure here is a `Connection` error: the process cannot serve
    /// without its database.
    pub async fn connect(options: &PostgresConfig, limits: Limits) -> Result<Self, StoreError> {
        tracing::info!(timeout_secs = options.connect_timeout.as_secs(), "connecting to postgres");

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.connect_timeout)
            .connect(&options.url)
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| StoreError::connection(format!("ping failed: {e}")))?;

        let store = Self::from_pool(pool, limits);
        store
            .migrate()
            .await
            .map_err(|e| StoreError::connection(format!("schema setup failed: {e}")))?;

        tracing::info!("postgres store ready");
        Ok(store)
    }

    /// Wrap an existing pool; the schema is assumed to exist.
    pub fn from_pool(pool: PgPool, limits: Limits) -> Self {
        Self { pool, limits }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Ids beyond `i64::MAX` cannot exist in the database.
fn db_key(value: u64) -> Option<i64> {
    i64::try_from(value).ok()
}

fn from_db_key(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::persistence(format!("negative {column}: {value}")))
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    let number: Option<i64> = row.try_get("number").map_err(|e| map_sqlx_error("decode", e))?;
    let number = number
        .map(u32::try_from)
        .transpose()
        .map_err(|_| StoreError::persistence("number out of range"))?;

    Ok(Item {
        id: ItemId::new(from_db_key(get(row, "id")?, "id")?),
        name: get(row, "name")?,
        location_id: LocationId::new(from_db_key(get(row, "location_id")?, "location_id")?),
        price: get(row, "price")?,
        number,
        modified: get(row, "modified")?,
    })
}

fn location_from_row(row: &PgRow) -> Result<Location, StoreError> {
    Ok(Location {
        id: LocationId::new(from_db_key(get(row, "id")?, "id")?),
        name: get(row, "name")?,
        modified: get(row, "modified")?,
    })
}

fn joined_from_row(row: &PgRow) -> Result<ItemWithLocation, StoreError> {
    let item = item_from_row(row)?;
    let location: Option<String> = get(row, "location")?;
    Ok(item.with_location(location.as_deref()))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(|e| map_sqlx_error("decode", e))
}

/// Escape `%`, `_` and `\` so the query is matched literally by `ILIKE`.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn number_to_db(number: Option<u32>) -> Option<i64> {
    number.map(i64::from)
}

fn map_sqlx_error(op: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23503") => {
                let msg = db.message().to_string();
                let domain = if msg.starts_with("update or delete") {
                    DomainError::in_use("location is still referenced by items")
                } else {
                    DomainError::invalid_reference("location does not exist")
                };
                return domain.into();
            }
            Some("23514") => return DomainError::validation(db.message().to_string()).into(),
            _ => {}
        }
    }
    tracing::error!(op, error = %err, "postgres operation failed");
    StoreError::persistence(format!("{op}: {err}"))
}

#[async_trait]
impl InventoryStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let rows = sqlx::query("SELECT id, name, modified FROM locations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_locations", e))?;
        rows.iter().map(location_from_row).collect()
    }

    async fn get_item(&self, id: ItemId) -> Result<Item, StoreError> {
        let key = db_key(id.get()).ok_or(DomainError::not_found("item"))?;
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        match row {
            Some(row) => item_from_row(&row),
            None => Err(DomainError::not_found("item").into()),
        }
    }

    async fn get_location(&self, id: LocationId) -> Result<Location, StoreError> {
        let key = db_key(id.get()).ok_or(DomainError::not_found("location"))?;
        let row = sqlx::query("SELECT id, name, modified FROM locations WHERE id = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_location", e))?;
        match row {
            Some(row) => location_from_row(&row),
            None => Err(DomainError::not_found("location").into()),
        }
    }

    #[instrument(skip(self, new), fields(location_id = %new.location_id), err)]
    async fn create_item(&self, new: NewItem) -> Result<Item, StoreError> {
        let new = new.validated(&self.limits)?;
        let location_key = db_key(new.location_id.get()).ok_or_else(|| {
            DomainError::invalid_reference(format!("location {} does not exist", new.location_id))
        })?;

        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;

        let exists = sqlx::query("SELECT id FROM locations WHERE id = $1 FOR SHARE")
            .bind(location_key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_item", e))?;
        if exists.is_none() {
            return Err(DomainError::invalid_reference(format!(
                "location {} does not exist",
                new.location_id
            ))
            .into());
        }

        let row = sqlx::query(&format!(
            "INSERT INTO items (name, location_id, price, number, modified) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(location_key)
        .bind(new.price)
        .bind(number_to_db(new.number))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_item", e))?;
        let item = item_from_row(&row)?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        tracing::info!(item_id = %item.id, "item created");
        Ok(item)
    }

    #[instrument(skip(self, new), err)]
    async fn create_location(&self, new: NewLocation) -> Result<Location, StoreError> {
        let new = new.validated(&self.limits)?;
        let row = sqlx::query(
            "INSERT INTO locations (name, modified) VALUES ($1, $2) RETURNING id, name, modified",
        )
        .bind(&new.name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_location", e))?;

        let location = location_from_row(&row)?;
        tracing::info!(location_id = %location.id, "location created");
        Ok(location)
    }

    #[instrument(skip(self, update), fields(item_id = %id), err)]
    async fn update_item(&self, id: ItemId, update: NewItem) -> Result<Item, StoreError> {
        let key = db_key(id.get()).ok_or(DomainError::not_found("item"))?;

        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;

        let current = sqlx::query("SELECT id FROM items WHERE id = $1 FOR UPDATE")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?;
        if current.is_none() {
            return Err(DomainError::not_found("item").into());
        }

        // Only an existing item gets its payload checked.
        let update = update.validated(&self.limits)?;
        let location_key = db_key(update.location_id.get()).ok_or_else(|| {
            DomainError::invalid_reference(format!("location {} does not exist", update.location_id))
        })?;

        let exists = sqlx::query("SELECT id FROM locations WHERE id = $1 FOR SHARE")
            .bind(location_key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?;
        if exists.is_none() {
            return Err(DomainError::invalid_reference(format!(
                "location {} does not exist",
                update.location_id
            ))
            .into());
        }

        let row = sqlx::query(&format!(
            "UPDATE items SET name = $2, location_id = $3, price = $4, number = $5, modified = $6 \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(key)
        .bind(&update.name)
        .bind(location_key)
        .bind(update.price)
        .bind(number_to_db(update.number))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;
        let item = item_from_row(&row)?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        tracing::info!(item_id = %item.id, "item updated");
        Ok(item)
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        let key = db_key(id.get()).ok_or(DomainError::not_found("item"))?;
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("item").into());
        }
        tracing::info!(item_id = %id, "item deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError> {
        let key = db_key(id.get()).ok_or(DomainError::not_found("location"))?;
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;

        let current = sqlx::query("SELECT id FROM locations WHERE id = $1 FOR UPDATE")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_location", e))?;
        if current.is_none() {
            return Err(DomainError::not_found("location").into());
        }

        let in_use: i64 = sqlx::query("SELECT COUNT(*) AS n FROM items WHERE location_id = $1")
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("n"))
            .map_err(|e| map_sqlx_error("delete_location", e))?;
        if in_use > 0 {
            return Err(DomainError::in_use(format!(
                "location {id} is still referenced by {in_use} item(s)"
            ))
            .into());
        }

        sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_location", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        tracing::info!(location_id = %id, "location deleted");
        Ok(())
    }

    async fn search_items(&self, query: &str) -> Result<Vec<Item>, StoreError> {
        if query.is_empty() {
            return self.list_items().await;
        }

        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE name ILIKE $1 ESCAPE '\\' ORDER BY id"
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn items_with_locations(&self) -> Result<Vec<ItemWithLocation>, StoreError> {
        let rows = sqlx::query(
            "SELECT i.id, i.name, i.location_id, i.price, i.number, i.modified, l.name AS location \
             FROM items i LEFT JOIN locations l ON l.id = i.location_id ORDER BY i.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("items_with_locations", e))?;

        rows.iter().map(joined_from_row).collect()
    }
}
