//! Bulk interchange - SQL script export and import
//!
//! Export writes the whole product table as one idempotent schema statement
//! followed by a single multi-row INSERT built from escaped literals.
//!
//! Import accepts arbitrary SQL text but only ever executes row insertions
//! into the product table. Everything else (DDL, other tables, pragmas) is
//! dropped without being run. Each insert runs on its own, and failures are
//! counted instead of aborting the batch.
//!
//! Identifiers are preserved: statements are executed as written, so an
//! exported script restores the original ids and timestamps.

use std::sync::OnceLock;
use regex::Regex;
use serde::Serialize;
use crate::product::Product;
use crate::storage::schema::{CREATE_PRODUCTS_TABLE, PRODUCTS_TABLE, PRODUCT_COLUMNS};
use crate::storage::ProductStore;
use crate::{Error, Result};

/// How an import treats the rows already in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Keep existing rows and add the imported ones
    #[default]
    Merge,
    /// Delete every existing row first
    Replace,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Merge => "merge",
            ImportMode::Replace => "replace",
        }
    }
}

impl std::str::FromStr for ImportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "merge" | "append" => Ok(ImportMode::Merge),
            "replace" | "overwrite" => Ok(ImportMode::Replace),
            _ => Err(Error::Validation(format!("Unknown import mode: {}", s))),
        }
    }
}

impl std::fmt::Display for ImportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Insert statements that succeeded
    pub imported: usize,
    /// Insert statements the engine rejected
    pub failed: usize,
    /// Statements skipped because they are not inserts into the product table
    pub ignored: usize,
    /// Rows added by the successful statements
    pub rows: usize,
    /// Rows removed before importing (replace mode only)
    pub replaced: usize,
    /// True when a replace import was rolled back because nothing succeeded
    pub rolled_back: bool,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Import Summary:")?;
        writeln!(f, "  Statements imported: {}", self.imported)?;
        writeln!(f, "  Statements failed: {}", self.failed)?;
        writeln!(f, "  Statements ignored: {}", self.ignored)?;
        write!(f, "  Rows added: {}", self.rows)?;
        if self.rolled_back {
            write!(f, "\n  Replace rolled back: existing rows kept")?;
        }
        Ok(())
    }
}

// ========== Export ==========

/// Render the whole product table as a SQL script
pub fn export_sql(store: &ProductStore) -> Result<String> {
    let products = store.all_by_id()?;

    let mut out = String::new();
    out.push_str(&format!("-- stockroom export: {} products\n", products.len()));
    out.push_str(CREATE_PRODUCTS_TABLE);
    out.push_str(";\n");

    if products.is_empty() {
        return Ok(out);
    }

    out.push_str(&format!("INSERT INTO {} ({}) VALUES\n", PRODUCTS_TABLE, PRODUCT_COLUMNS));
    let tuples: Vec<String> = products.iter().map(value_tuple).collect();
    out.push_str(&tuples.join(",\n"));
    out.push_str(";\n");

    Ok(out)
}

fn value_tuple(product: &Product) -> String {
    format!(
        "({}, {}, {}, {}, {}, {}, {})",
        product.id,
        optional_text(product.barcode.as_deref()),
        quote_literal(&product.name),
        product.price.map_or_else(|| "NULL".to_string(), number_literal),
        optional_text(product.description.as_deref()),
        quote_literal(&product.created_at),
        quote_literal(&product.updated_at),
    )
}

/// Quote a text literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn optional_text(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), quote_literal)
}

fn number_literal(value: f64) -> String {
    // Display gives the shortest text that parses back to the same f64
    if value.is_finite() {
        value.to_string()
    } else {
        "NULL".to_string()
    }
}

// ========== Import ==========

/// Apply an import script to the store.
///
/// The whole run is one engine transaction. In replace mode the existing
/// rows are deleted inside it, and the transaction is rolled back when no
/// insert succeeds so a bad document never leaves the catalog empty.
pub fn import_sql(store: &mut ProductStore, text: &str, mode: ImportMode) -> Result<ImportSummary> {
    let statements = split_statements(text);
    let mut summary = ImportSummary::default();

    let tx = store.connection_mut().transaction()?;

    if mode == ImportMode::Replace {
        summary.replaced = tx.execute("DELETE FROM products", [])?;
        tracing::debug!("Replace import cleared {} products", summary.replaced);
    }

    for stmt in &statements {
        if !is_product_insert(stmt) {
            summary.ignored += 1;
            tracing::debug!("Ignoring statement: {}", preview(stmt));
            continue;
        }

        match tx.execute(stmt, []) {
            Ok(rows) => {
                summary.imported += 1;
                summary.rows += rows;
            }
            Err(e) => {
                summary.failed += 1;
                tracing::debug!("Import statement failed ({}): {}", e, preview(stmt));
            }
        }
    }

    if mode == ImportMode::Replace && summary.imported == 0 {
        tx.rollback()?;
        summary.rolled_back = true;
        summary.rows = 0;
        tracing::warn!(
            "Replace import had no successful inserts; keeping the {} existing products",
            summary.replaced
        );
    } else {
        tx.commit()?;
    }

    tracing::info!(
        "Import ({}) finished: {} imported, {} failed, {} ignored, {} rows",
        mode, summary.imported, summary.failed, summary.ignored, summary.rows
    );
    Ok(summary)
}

fn insert_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?is)^insert\s+(?:or\s+(?:ignore|replace)\s+)?into\s+(?:products|"products"|`products`|\[products\])(?:\s|\(|$)"#,
        )
        .expect("insert pattern is a valid regex")
    })
}

/// Whether a statement is a row insertion into the product table
pub fn is_product_insert(stmt: &str) -> bool {
    insert_pattern().is_match(stmt.trim_start())
}

/// Split SQL text into statements on `;`.
///
/// Terminators inside quoted text do not split, doubled quotes are kept as
/// escapes, and `--` / `/* */` comments are removed. Blank statements are
/// dropped.
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                current.push(c);
                while let Some(q) = chars.next() {
                    current.push(q);
                    if q == c {
                        if chars.peek() == Some(&c) {
                            current.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
                current.push('\n');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                current.push(' ');
            }
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let stmt = raw.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
}

fn preview(stmt: &str) -> String {
    let flat: String = stmt.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > 80 {
        format!("{}...", flat.chars().take(77).collect::<String>())
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductFields;

    fn store_with(names: &[&str]) -> ProductStore {
        let store = ProductStore::open_in_memory().unwrap();
        for name in names {
            store.create(ProductFields::new(*name)).unwrap();
        }
        store
    }

    #[test]
    fn test_split_respects_quotes_and_comments() {
        let sql = r#"
            -- header; with a terminator
            INSERT INTO products (name) VALUES ('a;b');
            /* block; comment */ INSERT INTO products (name) VALUES ('it''s');
            SELECT "x;y";
        "#;
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0], "INSERT INTO products (name) VALUES ('a;b')");
        assert_eq!(stmts[1], "INSERT INTO products (name) VALUES ('it''s')");
        assert_eq!(stmts[2], r#"SELECT "x;y""#);
    }

    #[test]
    fn test_only_product_inserts_are_candidates() {
        assert!(is_product_insert("INSERT INTO products (name) VALUES ('a')"));
        assert!(is_product_insert("insert into PRODUCTS(name) values ('a')"));
        assert!(is_product_insert("Insert Or Ignore Into \"products\" (name) VALUES ('a')"));
        assert!(is_product_insert("INSERT\n INTO\n products\nVALUES (1, NULL, 'a', NULL, NULL, 'x', 'y')"));

        assert!(!is_product_insert("INSERT INTO products_archive (name) VALUES ('a')"));
        assert!(!is_product_insert("INSERT INTO other (name) VALUES ('a')"));
        assert!(!is_product_insert("DROP TABLE products"));
        assert!(!is_product_insert("CREATE TABLE IF NOT EXISTS products (id INTEGER)"));
        assert!(!is_product_insert("DELETE FROM products"));
        assert!(!is_product_insert("UPDATE products SET name = 'x'"));
        assert!(!is_product_insert("INSERT OR ROLLBACK INTO products (name) VALUES ('a')"));
    }

    #[test]
    fn test_partial_import() {
        let mut store = ProductStore::open_in_memory().unwrap();
        let sql = "
            INSERT INTO products (name, barcode) VALUES ('One', '1');
            INSERT INTO products (name, barcode) VALUES ('Two', '2');
            INSERT INTO products (name, barcode) VALUES ('Three', '3');
            INSERT INTO products (name, barcode) VALUES ('Four', '4');
            INSERT INTO products (name, barcode) VALUES ('Five', '5');
            INSERT INTO products (name barcode) VALUES ('Broken');
            INSERT INTO products (name, barcode) VALUES ('Dup', '1');
            INSERT INTO suppliers (name) VALUES ('Acme');
        ";

        let summary = import_sql(&mut store, sql, ImportMode::Merge).unwrap();
        assert_eq!(summary.imported, 5);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.rows, 5);
        assert_eq!(store.count().unwrap(), 5);
    }

    #[test]
    fn test_non_insert_statements_never_run() {
        let mut store = store_with(&["Keep"]);
        let sql = "
            DROP TABLE products;
            DELETE FROM products;
            UPDATE products SET name = 'hijacked';
            CREATE TABLE evil (x);
            INSERT INTO products (name) VALUES ('New');
        ";

        let summary = import_sql(&mut store, sql, ImportMode::Merge).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.ignored, 4);

        let names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["New", "Keep"]);

        let evil: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE name = 'evil'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(evil, 0);
    }

    #[test]
    fn test_replace_import() {
        let mut store = store_with(&["Old A", "Old B", "Old C"]);
        let sql = "
            INSERT INTO products (name) VALUES ('New A');
            INSERT INTO products (name) VALUES ('New B');
        ";

        let summary = import_sql(&mut store, sql, ImportMode::Replace).unwrap();
        assert_eq!(summary.replaced, 3);
        assert_eq!(summary.imported, 2);
        assert!(!summary.rolled_back);

        let mut names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        names.sort();
        assert_eq!(names, vec!["New A", "New B"]);
    }

    #[test]
    fn test_replace_import_with_nothing_valid_rolls_back() {
        let mut store = store_with(&["Old A", "Old B"]);
        let sql = "INSERT INTO products (nope) VALUES (1); CREATE TABLE x (y);";

        let summary = import_sql(&mut store, sql, ImportMode::Replace).unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.failed, 1);
        assert!(summary.rolled_back);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_mistyped_rows_fail_and_reads_keep_working() {
        let mut store = store_with(&["Good"]);
        let sql = "
            INSERT INTO products (name, price) VALUES ('Bad price', 'cheap');
            INSERT INTO products (name) VALUES ('');
            INSERT INTO products (name) VALUES ('   ');
            INSERT INTO products (name, barcode) VALUES ('Blob code', x'00ff');
            INSERT INTO products (name, description) VALUES ('Blob text', x'01');
            INSERT INTO products (name, created_at) VALUES ('Blob time', x'02');
            INSERT INTO products (name, price) VALUES ('Fine', 7);
        ";

        let summary = import_sql(&mut store, sql, ImportMode::Merge).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failed, 6);

        let names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Fine", "Good"]);
        assert_eq!(store.list().unwrap()[0].price, Some(7.0));
        assert!(export_sql(&store).unwrap().contains("'Fine'"));
    }

    #[test]
    fn test_export_format() {
        let store = ProductStore::open_in_memory().unwrap();
        assert!(!export_sql(&store).unwrap().contains("INSERT"));

        store
            .create(ProductFields::new("O'Brien's \"best\"").with_barcode("42").with_price(3.0))
            .unwrap();
        store.create(ProductFields::new("Plain").with_description("a; b")).unwrap();

        let sql = export_sql(&store).unwrap();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS products"));
        assert_eq!(sql.matches("INSERT INTO").count(), 1);
        assert!(sql.contains("'O''Brien''s \"best\"'"));
        assert!(sql.contains("'42', 'O''Brien''s \"best\"', 3, NULL"));
        assert!(sql.contains("NULL, 'Plain', NULL, 'a; b'"));
    }

    #[test]
    fn test_export_then_import_preserves_every_field() {
        let source = ProductStore::open_in_memory().unwrap();
        source
            .create(ProductFields::new("Tea").with_barcode("T-1").with_price(4.25).with_description("loose; leaf"))
            .unwrap();
        let dropped = source.create(ProductFields::new("Gone")).unwrap();
        source.create(ProductFields::new("It's").with_price(12.5)).unwrap();
        source.delete(dropped.id).unwrap();

        let sql = export_sql(&source).unwrap();

        let mut target = ProductStore::open_in_memory().unwrap();
        let summary = import_sql(&mut target, &sql, ImportMode::Merge).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.rows, 2);

        assert_eq!(target.all_by_id().unwrap(), source.all_by_id().unwrap());
    }

    #[test]
    fn test_merge_import_with_colliding_ids_fails_statement() {
        let source = store_with(&["A", "B"]);
        let sql = export_sql(&source).unwrap();

        let mut target = store_with(&["Existing"]);
        let summary = import_sql(&mut target, &sql, ImportMode::Merge).unwrap();

        // The single multi-row insert collides on id 1 and is rejected as a whole
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(target.count().unwrap(), 1);
    }

    #[test]
    fn test_import_mode_parse() {
        assert_eq!("merge".parse::<ImportMode>().unwrap(), ImportMode::Merge);
        assert_eq!("REPLACE".parse::<ImportMode>().unwrap(), ImportMode::Replace);
        assert!("upsert".parse::<ImportMode>().is_err());
    }
}
