use ::duckdb::Connection;
use tracing::info;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Columns of the conflict key must stay out of any secondary index: DuckDB
// rejects ON CONFLICT DO UPDATE on indexed columns.
const MIGRATIONS: &[Migration] = &[Migration {
    version: "0001_stock_prices",
    sql: r#"
CREATE TABLE IF NOT EXISTS stock_prices (
    symbol VARCHAR NOT NULL,
    price DECIMAL(18, 4) NOT NULL,
    open_price DECIMAL(18, 4) NOT NULL,
    high_price DECIMAL(18, 4) NOT NULL,
    low_price DECIMAL(18, 4) NOT NULL,
    close_price DECIMAL(18, 4) NOT NULL,
    volume UBIGINT NOT NULL,
    api_timestamp TIMESTAMP NOT NULL,
    source VARCHAR NOT NULL,
    raw_payload VARCHAR NOT NULL,
    fetched_at TIMESTAMP NOT NULL,
    PRIMARY KEY(symbol, api_timestamp)
);
"#,
}];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR PRIMARY KEY,
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
            info!(version = migration.version, "applied warehouse migration");
        }
    }

    Ok(())
}
