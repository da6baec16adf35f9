//! # Tickref Warehouse
//!
//! DuckDB-backed store for the tickref reference catalog.
//!
//! ## Overview
//!
//! The warehouse keeps tags and their associations next to the name
//! universes they resolve against. Catalogs are written in bulk from a
//! [`CatalogDocument`] and read back as one consistent set of
//! [`CatalogRows`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tickref_warehouse::{CatalogDocument, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!
//!     let document = CatalogDocument::from_json(r#"{"eod_spreads": ["ED1_2"]}"#)?;
//!     let report = warehouse.import_document(&document)?;
//!     println!("wrote {} rows", report.total());
//!
//!     let rows = warehouse.load_rows()?;
//!     println!("{} strategy names", rows.strategy_names.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `tags` | Tag names and descriptions |
//! | `tag_products` | Tag → (product, product type) links |
//! | `tag_instruments` | Tag → instrument links |
//! | `tag_strategy_filters` | Tag → strategy name patterns |
//! | `tag_custom_filters` | Tag → custom index name patterns |
//! | `products` | Product reference data |
//! | `instruments` | Instruments and their product |
//! | `eod_strategies`, `intraday_spreads`, `eod_spreads` | Strategy series catalogs |
//! | `custom_indices` | Custom index names |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_strategy_names` | Distinct union of the strategy series |
//! | `vw_product_instruments` | Instrument membership per product |

pub mod document;
pub mod duckdb;
pub mod migrations;
pub mod views;

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use document::{
    CatalogDocument, ImportReport, InstrumentRecord, ProductLink, ProductRecord, TagRecord,
};
pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catalog document could not be parsed.
    #[error("invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog document was rejected before any write.
    #[error("catalog document rejected: {0}")]
    InvalidDocument(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for tickref data.
    pub tickref_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::at_home(resolve_tickref_home())
    }
}

impl WarehouseConfig {
    /// Configuration rooted at `tickref_home` with the default file layout.
    pub fn at_home(tickref_home: impl Into<PathBuf>) -> Self {
        let tickref_home = tickref_home.into();
        let db_path = tickref_home.join("catalog").join("catalog.duckdb");
        Self {
            tickref_home,
            db_path,
            max_pool_size: 4,
        }
    }

    /// Configuration for an explicit database file.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

/// Tag → product link row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagProductRow {
    pub tag: String,
    pub product: String,
    pub product_type: String,
}

/// Tag → instrument link row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInstrumentRow {
    pub tag: String,
    pub instrument: String,
}

/// Tag → filter pattern row, for either filter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagFilterRow {
    pub tag: String,
    pub filter: String,
}

/// Product membership row from `vw_product_instruments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInstrumentRow {
    pub product: String,
    pub product_type: String,
    pub instrument: String,
}

/// Every catalog the tag resolver reads, taken from one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogRows {
    pub tags: Vec<String>,
    pub tag_products: Vec<TagProductRow>,
    pub tag_instruments: Vec<TagInstrumentRow>,
    pub tag_strategy_filters: Vec<TagFilterRow>,
    pub tag_custom_filters: Vec<TagFilterRow>,
    /// Distinct union of end-of-day strategies, intraday spreads and end-of-day spreads.
    pub strategy_names: Vec<String>,
    pub custom_indices: Vec<String>,
    pub product_instruments: Vec<ProductInstrumentRow>,
}

/// The catalog warehouse.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize database schema and views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Write `document` in one transaction.
    ///
    /// Existing rows are kept, so importing the same document twice is a
    /// no-op. Descriptions present in the document overwrite stored ones.
    pub fn import_document(&self, document: &CatalogDocument) -> Result<ImportReport, WarehouseError> {
        document.validate()?;

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<ImportReport, WarehouseError> {
            let mut report = ImportReport::default();

            for product in &document.products {
                let params: [&dyn ToSql; 2] = [&product.product, &product.product_type];
                report.products += connection.execute(
                    "INSERT OR IGNORE INTO products (product, product_type) VALUES (?, ?)",
                    params.as_slice(),
                )?;
                if let Some(description) = &product.description {
                    let params: [&dyn ToSql; 3] =
                        [description, &product.product, &product.product_type];
                    connection.execute(
                        "UPDATE products SET description = ? WHERE product = ? AND product_type = ?",
                        params.as_slice(),
                    )?;
                }
            }

            for instrument in &document.instruments {
                let params: [&dyn ToSql; 3] = [
                    &instrument.instrument,
                    &instrument.product,
                    &instrument.product_type,
                ];
                report.instruments += connection.execute(
                    "INSERT OR IGNORE INTO instruments (instrument, product, product_type) VALUES (?, ?, ?)",
                    params.as_slice(),
                )?;
            }

            for (table, names) in [
                ("eod_strategies", &document.eod_strategies),
                ("intraday_spreads", &document.intraday_spreads),
                ("eod_spreads", &document.eod_spreads),
            ] {
                // Table names come from the fixed list above.
                let insert_sql = format!("INSERT OR IGNORE INTO {table} (name) VALUES (?)");
                for name in names {
                    report.strategy_names += connection.execute(insert_sql.as_str(), [name])?;
                }
            }

            for name in &document.custom_indices {
                report.custom_indices += connection.execute(
                    "INSERT OR IGNORE INTO custom_indices (name) VALUES (?)",
                    [name],
                )?;
            }

            for record in &document.tags {
                report.tags += connection.execute(
                    "INSERT OR IGNORE INTO tags (tag) VALUES (?)",
                    [&record.tag],
                )?;
                if let Some(description) = &record.description {
                    let params: [&dyn ToSql; 2] = [description, &record.tag];
                    connection.execute(
                        "UPDATE tags SET description = ? WHERE tag = ?",
                        params.as_slice(),
                    )?;
                }

                for link in &record.products {
                    let params: [&dyn ToSql; 3] = [&record.tag, &link.product, &link.product_type];
                    report.product_links += connection.execute(
                        "INSERT OR IGNORE INTO tag_products (tag, product, product_type) VALUES (?, ?, ?)",
                        params.as_slice(),
                    )?;
                }
                for instrument in &record.instruments {
                    let params: [&dyn ToSql; 2] = [&record.tag, instrument];
                    report.instrument_links += connection.execute(
                        "INSERT OR IGNORE INTO tag_instruments (tag, instrument) VALUES (?, ?)",
                        params.as_slice(),
                    )?;
                }
                for pattern in &record.strategy_filters {
                    let params: [&dyn ToSql; 2] = [&record.tag, pattern];
                    report.strategy_filters += connection.execute(
                        "INSERT OR IGNORE INTO tag_strategy_filters (tag, pattern) VALUES (?, ?)",
                        params.as_slice(),
                    )?;
                }
                for pattern in &record.custom_instrument_filters {
                    let params: [&dyn ToSql; 2] = [&record.tag, pattern];
                    report.custom_filters += connection.execute(
                        "INSERT OR IGNORE INTO tag_custom_filters (tag, pattern) VALUES (?, ?)",
                        params.as_slice(),
                    )?;
                }
            }

            Ok(report)
        })();

        let report = finalize_transaction(&connection, result)?;
        debug!(rows = report.total(), "imported catalog document");
        Ok(report)
    }

    /// Read every catalog inside a single transaction.
    pub fn load_rows(&self) -> Result<CatalogRows, WarehouseError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<CatalogRows, WarehouseError> {
            Ok(CatalogRows {
                tags: query_names(&connection, "SELECT tag FROM tags ORDER BY tag")?,
                tag_products: query_all(
                    &connection,
                    "SELECT tag, product, product_type FROM tag_products ORDER BY tag, product, product_type",
                    |row| {
                        Ok(TagProductRow {
                            tag: row.get(0)?,
                            product: row.get(1)?,
                            product_type: row.get(2)?,
                        })
                    },
                )?,
                tag_instruments: query_all(
                    &connection,
                    "SELECT tag, instrument FROM tag_instruments ORDER BY tag, instrument",
                    |row| {
                        Ok(TagInstrumentRow {
                            tag: row.get(0)?,
                            instrument: row.get(1)?,
                        })
                    },
                )?,
                tag_strategy_filters: query_filters(&connection, "tag_strategy_filters")?,
                tag_custom_filters: query_filters(&connection, "tag_custom_filters")?,
                strategy_names: query_names(
                    &connection,
                    "SELECT name FROM vw_strategy_names ORDER BY name",
                )?,
                custom_indices: query_names(
                    &connection,
                    "SELECT name FROM custom_indices ORDER BY name",
                )?,
                product_instruments: query_all(
                    &connection,
                    "SELECT product, product_type, instrument FROM vw_product_instruments \
                     ORDER BY product, product_type, instrument",
                    |row| {
                        Ok(ProductInstrumentRow {
                            product: row.get(0)?,
                            product_type: row.get(1)?,
                            instrument: row.get(2)?,
                        })
                    },
                )?,
            })
        })();

        let rows = finalize_transaction(&connection, result)?;
        debug!(
            tags = rows.tags.len(),
            strategies = rows.strategy_names.len(),
            custom_indices = rows.custom_indices.len(),
            "loaded catalog rows"
        );
        Ok(rows)
    }

    /// Dump the stored catalog as a document that [`Self::import_document`] accepts.
    pub fn export_document(&self) -> Result<CatalogDocument, WarehouseError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<CatalogDocument, WarehouseError> {
            let mut tags: BTreeMap<String, TagRecord> = BTreeMap::new();
            for (tag, description) in query_all(
                &connection,
                "SELECT tag, description FROM tags ORDER BY tag",
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )? {
                tags.insert(
                    tag.clone(),
                    TagRecord {
                        tag,
                        description,
                        ..TagRecord::default()
                    },
                );
            }

            for row in query_all(
                &connection,
                "SELECT tag, product, product_type FROM tag_products ORDER BY tag, product, product_type",
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )? {
                let (tag, product, product_type) = row;
                tag_record(&mut tags, tag)
                    .products
                    .push(ProductLink { product, product_type });
            }
            for (tag, instrument) in query_pairs(
                &connection,
                "SELECT tag, instrument FROM tag_instruments ORDER BY tag, instrument",
            )? {
                tag_record(&mut tags, tag).instruments.push(instrument);
            }
            for row in query_filters(&connection, "tag_strategy_filters")? {
                tag_record(&mut tags, row.tag).strategy_filters.push(row.filter);
            }
            for row in query_filters(&connection, "tag_custom_filters")? {
                tag_record(&mut tags, row.tag)
                    .custom_instrument_filters
                    .push(row.filter);
            }

            Ok(CatalogDocument {
                tags: tags.into_values().collect(),
                products: query_all(
                    &connection,
                    "SELECT product, product_type, description FROM products ORDER BY product, product_type",
                    |row| {
                        Ok(ProductRecord {
                            product: row.get(0)?,
                            product_type: row.get(1)?,
                            description: row.get(2)?,
                        })
                    },
                )?,
                instruments: query_all(
                    &connection,
                    "SELECT instrument, product, product_type FROM instruments ORDER BY instrument",
                    |row| {
                        Ok(InstrumentRecord {
                            instrument: row.get(0)?,
                            product: row.get(1)?,
                            product_type: row.get(2)?,
                        })
                    },
                )?,
                eod_strategies: query_names(&connection, "SELECT name FROM eod_strategies ORDER BY name")?,
                intraday_spreads: query_names(
                    &connection,
                    "SELECT name FROM intraday_spreads ORDER BY name",
                )?,
                eod_spreads: query_names(&connection, "SELECT name FROM eod_spreads ORDER BY name")?,
                custom_indices: query_names(&connection, "SELECT name FROM custom_indices ORDER BY name")?,
            })
        })();

        finalize_transaction(&connection, result)
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn query_all<T, F>(connection: &Connection, sql: &str, map: F) -> Result<Vec<T>, WarehouseError>
where
    F: FnMut(&::duckdb::Row<'_>) -> Result<T, ::duckdb::Error>,
{
    let mut statement = connection.prepare(sql)?;
    let rows = statement.query_map([], map)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn query_names(connection: &Connection, sql: &str) -> Result<Vec<String>, WarehouseError> {
    query_all(connection, sql, |row| row.get(0))
}

fn query_pairs(connection: &Connection, sql: &str) -> Result<Vec<(String, String)>, WarehouseError> {
    query_all(connection, sql, |row| Ok((row.get(0)?, row.get(1)?)))
}

fn query_filters(connection: &Connection, table: &str) -> Result<Vec<TagFilterRow>, WarehouseError> {
    let sql = format!("SELECT tag, pattern FROM {table} ORDER BY tag, pattern");
    Ok(query_pairs(connection, sql.as_str())?
        .into_iter()
        .map(|(tag, filter)| TagFilterRow { tag, filter })
        .collect())
}

fn tag_record(tags: &mut BTreeMap<String, TagRecord>, tag: String) -> &mut TagRecord {
    tags.entry(tag.clone()).or_insert_with(|| TagRecord {
        tag,
        ..TagRecord::default()
    })
}

/// Resolve the tickref home directory from environment or default.
fn resolve_tickref_home() -> PathBuf {
    if let Some(path) = env::var_os("TICKREF_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickref");
    }

    PathBuf::from(".tickref")
}
