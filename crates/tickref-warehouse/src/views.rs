//! Database views the catalog snapshot reads from.

use ::duckdb::Connection;

/// Create database views over the reference tables.
///
/// Creates the following views:
/// - `vw_strategy_names`: distinct union of every strategy and spread series
/// - `vw_product_instruments`: instrument membership per product
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_strategy_names AS
SELECT name FROM eod_strategies
UNION
SELECT name FROM intraday_spreads
UNION
SELECT name FROM eod_spreads;

CREATE OR REPLACE VIEW vw_product_instruments AS
SELECT DISTINCT
    product,
    product_type,
    instrument
FROM instruments;
",
    )?;

    Ok(())
}
