//! Database schema definitions

/// Name of the one table the catalog manages
pub const PRODUCTS_TABLE: &str = "products";

/// SQL to create the products table
///
/// Timestamps are produced by the engine with millisecond precision so that
/// ordering by creation time is meaningful for rows created in quick succession.
///
/// The CHECK clauses hold every row to the types `Product` reads back, so an
/// imported statement with a bad value fails on its own instead of leaving a
/// row that breaks later reads.
pub const CREATE_PRODUCTS_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    barcode TEXT UNIQUE CHECK (typeof(barcode) IN ('text', 'null')),
    name TEXT NOT NULL CHECK (typeof(name) = 'text' AND length(trim(name)) > 0),
    price REAL CHECK (typeof(price) IN ('integer', 'real', 'null')),
    description TEXT CHECK (typeof(description) IN ('text', 'null')),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        CHECK (typeof(created_at) = 'text'),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        CHECK (typeof(updated_at) = 'text')
)"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)",
    "CREATE INDEX IF NOT EXISTS idx_products_created ON products(created_at)",
];

/// Engine expression for "now" in the stored timestamp format
pub const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// Column list shared by every product SELECT
pub const PRODUCT_COLUMNS: &str = "id, barcode, name, price, description, created_at, updated_at";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_PRODUCTS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
