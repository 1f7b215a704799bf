//! SQLite product repository

use rusqlite::{Connection, params, OptionalExtension};
use crate::{Result, Error};
use crate::product::{Product, ProductFields};
use super::schema::{self, PRODUCT_COLUMNS};

/// Injection-safe CRUD and search over the products table.
///
/// Every value reaches the engine through parameter binding; no field is
/// ever formatted into SQL text here.
pub struct ProductStore {
    conn: Connection,
}

impl ProductStore {
    /// Open a fresh in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection (e.g. one restored from a saved image).
    ///
    /// The schema is created if the image predates it.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ========== Product Operations ==========

    /// Insert a new product and return it with its engine-assigned fields
    pub fn create(&self, fields: ProductFields) -> Result<Product> {
        let fields = fields.prepare()?;
        self.conn.execute(
            r#"
            INSERT INTO products (barcode, name, price, description)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![fields.barcode, fields.name, fields.price, fields.description],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Created product {} ({})", id, fields.name);
        self.get(id)?.ok_or(Error::NotFound(id))
    }

    /// Get a product by id
    pub fn get(&self, id: i64) -> Result<Option<Product>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
                [id],
                row_to_product,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Replace the editable fields of a product and stamp `updated_at`
    pub fn update(&self, id: i64, fields: ProductFields) -> Result<Product> {
        let fields = fields.prepare()?;
        let changed = self.conn.execute(
            &format!(
                r#"
                UPDATE products
                SET barcode = ?1, name = ?2, price = ?3, description = ?4, updated_at = {}
                WHERE id = ?5
                "#,
                schema::NOW
            ),
            params![fields.barcode, fields.name, fields.price, fields.description, id],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        tracing::debug!("Updated product {}", id);
        self.get(id)?.ok_or(Error::NotFound(id))
    }

    /// Delete a product by id
    pub fn delete(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        tracing::debug!("Deleted product {}", id);
        Ok(())
    }

    /// All products, newest first
    pub fn list(&self) -> Result<Vec<Product>> {
        self.search(None)
    }

    /// Search products whose name or barcode contains `term`.
    ///
    /// `None` or a blank term returns every product. Results are ordered by
    /// creation time descending, ties broken by id descending.
    pub fn search(&self, term: Option<&str>) -> Result<Vec<Product>> {
        let term = term.map(str::trim).filter(|t| !t.is_empty());

        let products = match term {
            Some(term) => {
                let pattern = format!("%{}%", escape_like(term));
                let mut stmt = self.conn.prepare(&format!(
                    r#"
                    SELECT {} FROM products
                    WHERE name LIKE ?1 ESCAPE '\' OR barcode LIKE ?1 ESCAPE '\'
                    ORDER BY created_at DESC, id DESC
                    "#,
                    PRODUCT_COLUMNS
                ))?;
                stmt.query_map([pattern], row_to_product)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM products ORDER BY created_at DESC, id DESC",
                    PRODUCT_COLUMNS
                ))?;
                stmt.query_map([], row_to_product)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(products)
    }

    /// All products in ascending id order (the export order)
    pub fn all_by_id(&self) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM products ORDER BY id",
            PRODUCT_COLUMNS
        ))?;
        let products = stmt
            .query_map([], row_to_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    /// Count all products
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete all products
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM products", [])?;
        Ok(removed)
    }

    /// Get catalog statistics
    pub fn stats(&self) -> Result<CatalogStats> {
        let (products, with_barcode, with_price): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(barcode), COUNT(price) FROM products",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let image_bytes = super::persist::snapshot(&self.conn)?.len();

        Ok(CatalogStats {
            products: products as usize,
            with_barcode: with_barcode as usize,
            with_price: with_price as usize,
            image_bytes,
        })
    }
}

/// Helper to convert a row to a Product
fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        barcode: row.get(1)?,
        name: row.get(2)?,
        price: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Escape LIKE wildcards so the term only ever matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Catalog statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogStats {
    pub products: usize,
    pub with_barcode: usize,
    pub with_price: usize,
    /// Size of the serialized database image
    pub image_bytes: usize,
}

impl std::fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Catalog Statistics:")?;
        writeln!(f, "  Products: {}", self.products)?;
        writeln!(f, "  With barcode: {}", self.with_barcode)?;
        writeln!(f, "  With price: {}", self.with_price)?;
        writeln!(f, "  Image size: {} bytes", self.image_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_product_crud() {
        let store = ProductStore::open_in_memory().unwrap();

        let created = store
            .create(ProductFields::new("Widget").with_barcode("123").with_price(9.99))
            .unwrap();
        assert!(created.id > 0);
        assert_eq!(created.barcode.as_deref(), Some("123"));
        assert_eq!(created.description, None);
        assert_eq!(created.created_at, created.updated_at);

        let retrieved = store.get(created.id).unwrap().unwrap();
        assert_eq!(retrieved, created);

        let updated = store
            .update(created.id, ProductFields::new("Gadget").with_description("shiny"))
            .unwrap();
        assert_eq!(updated.name, "Gadget");
        assert_eq!(updated.barcode, None);
        assert_eq!(updated.price, None);
        assert_eq!(updated.created_at, created.created_at);

        store.delete(created.id).unwrap();
        assert!(store.get(created.id).unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let store = ProductStore::open_in_memory().unwrap();
        let created = store.create(ProductFields::new("Widget")).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let updated = store.update(created.id, ProductFields::new("Widget v2")).unwrap();

        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[test]
    fn test_validation_happens_before_engine() {
        let store = ProductStore::open_in_memory().unwrap();
        let err = store.create(ProductFields::new("")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.count().unwrap(), 0);

        let created = store.create(ProductFields::new("Widget")).unwrap();
        let err = store.update(created.id, ProductFields::new(" ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.get(created.id).unwrap().unwrap().name, "Widget");
    }

    #[test]
    fn test_barcode_uniqueness() {
        let store = ProductStore::open_in_memory().unwrap();

        store.create(ProductFields::new("A").with_barcode("dup")).unwrap();
        let err = store.create(ProductFields::new("B").with_barcode("dup")).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));

        // Absent barcodes never collide
        store.create(ProductFields::new("C")).unwrap();
        store.create(ProductFields::new("D").with_barcode("")).unwrap();
        assert_eq!(store.count().unwrap(), 3);

        let other = store.create(ProductFields::new("E").with_barcode("other")).unwrap();
        let err = store
            .update(other.id, ProductFields::new("E").with_barcode("dup"))
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
    }

    #[test]
    fn test_engine_rejects_empty_names() {
        let store = ProductStore::open_in_memory().unwrap();
        let err: Error = store
            .connection()
            .execute("INSERT INTO products (name) VALUES ('')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        let store = ProductStore::open_in_memory().unwrap();
        assert!(matches!(store.delete(42), Err(Error::NotFound(42))));
        assert!(matches!(
            store.update(42, ProductFields::new("X")),
            Err(Error::NotFound(42))
        ));
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_search_ordering() {
        let store = ProductStore::open_in_memory().unwrap();
        store.create(ProductFields::new("Apple").with_barcode("111")).unwrap();
        store.create(ProductFields::new("Banana").with_barcode("222")).unwrap();
        store.create(ProductFields::new("Cherry").with_barcode("333")).unwrap();

        assert_eq!(names(&store.search(None).unwrap()), vec!["Cherry", "Banana", "Apple"]);
        assert_eq!(names(&store.search(Some("")).unwrap()), vec!["Cherry", "Banana", "Apple"]);
        assert_eq!(names(&store.list().unwrap()), vec!["Cherry", "Banana", "Apple"]);

        assert_eq!(names(&store.search(Some("222")).unwrap()), vec!["Banana"]);
        // LIKE is case-insensitive for ASCII and matches either column
        assert_eq!(names(&store.search(Some("an")).unwrap()), vec!["Banana"]);
        assert_eq!(names(&store.search(Some("APP")).unwrap()), vec!["Apple"]);
        assert!(store.search(Some("zzz")).unwrap().is_empty());
    }

    #[test]
    fn test_search_ties_broken_by_id() {
        let store = ProductStore::open_in_memory().unwrap();
        for name in ["A", "B", "C"] {
            store.create(ProductFields::new(name)).unwrap();
        }
        store
            .connection()
            .execute("UPDATE products SET created_at = '2024-01-01 00:00:00.000'", [])
            .unwrap();

        assert_eq!(names(&store.search(None).unwrap()), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let store = ProductStore::open_in_memory().unwrap();
        store.create(ProductFields::new("100% cotton")).unwrap();
        store.create(ProductFields::new("1000 pieces")).unwrap();
        store.create(ProductFields::new("snake_case")).unwrap();

        assert_eq!(names(&store.search(Some("100%")).unwrap()), vec!["100% cotton"]);
        assert_eq!(names(&store.search(Some("e_c")).unwrap()), vec!["snake_case"]);
        assert_eq!(store.search(Some("%")).unwrap().len(), 1);
    }

    #[test]
    fn test_search_term_is_bound_not_spliced() {
        let store = ProductStore::open_in_memory().unwrap();
        store.create(ProductFields::new("Widget")).unwrap();

        let results = store.search(Some("'; DROP TABLE products; --")).unwrap();
        assert!(results.is_empty());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_stats() {
        let store = ProductStore::open_in_memory().unwrap();
        store.create(ProductFields::new("A").with_barcode("1").with_price(1.0)).unwrap();
        store.create(ProductFields::new("B").with_price(2.0)).unwrap();
        store.create(ProductFields::new("C")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.products, 3);
        assert_eq!(stats.with_barcode, 1);
        assert_eq!(stats.with_price, 2);
        assert!(stats.image_bytes > 0);
    }
}
