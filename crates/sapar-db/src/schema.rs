//! SQL schema definitions.

/// Complete schema for Sapar v1 database.
///
/// `orders.driver_id` is a back-reference into `drivers`, not a foreign key:
/// a claim writes the driver identity first and the registry row is created
/// immediately after, so enforcement would reject the claim ordering.
/// Drivers are never deleted, which keeps the back-reference valid.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    price INTEGER NOT NULL,
    phone TEXT NOT NULL,
    passenger_id INTEGER NOT NULL,
    category TEXT NOT NULL DEFAULT 'local',
    status TEXT NOT NULL DEFAULT 'new',
    driver_id INTEGER,
    broadcast_handle INTEGER,
    rating INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_open ON orders(status) WHERE status = 'new';
CREATE INDEX IF NOT EXISTS idx_orders_driver ON orders(driver_id);

CREATE TABLE IF NOT EXISTS drivers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    rating REAL NOT NULL DEFAULT 0,
    rating_count INTEGER NOT NULL DEFAULT 0
);
"#;
