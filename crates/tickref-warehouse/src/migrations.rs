use ::duckdb::Connection;
use tracing::debug;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_reference_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS products (
    product TEXT NOT NULL,
    product_type TEXT NOT NULL,
    description TEXT,
    PRIMARY KEY(product, product_type)
);

CREATE TABLE IF NOT EXISTS instruments (
    instrument TEXT PRIMARY KEY,
    product TEXT NOT NULL,
    product_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS eod_strategies (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS intraday_spreads (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS eod_spreads (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS custom_indices (
    name TEXT PRIMARY KEY
);
"#,
    },
    Migration {
        version: "0002_tag_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS tags (
    tag TEXT PRIMARY KEY,
    description TEXT
);

CREATE TABLE IF NOT EXISTS tag_products (
    tag TEXT NOT NULL,
    product TEXT NOT NULL,
    product_type TEXT NOT NULL,
    PRIMARY KEY(tag, product, product_type)
);

CREATE TABLE IF NOT EXISTS tag_instruments (
    tag TEXT NOT NULL,
    instrument TEXT NOT NULL,
    PRIMARY KEY(tag, instrument)
);

CREATE TABLE IF NOT EXISTS tag_strategy_filters (
    tag TEXT NOT NULL,
    pattern TEXT NOT NULL,
    PRIMARY KEY(tag, pattern)
);

CREATE TABLE IF NOT EXISTS tag_custom_filters (
    tag TEXT NOT NULL,
    pattern TEXT NOT NULL,
    PRIMARY KEY(tag, pattern)
);
"#,
    },
    Migration {
        version: "0003_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_instruments_product ON instruments(product, product_type);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
            debug!(version = migration.version, "applied catalog migration");
        }
    }

    Ok(())
}
