use tabled::{settings::Style, Table, Tabled};
use crate::product::Product;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Barcode")]
    barcode: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

const DESCRIPTION_WIDTH: usize = 40;

impl From<&Product> for ProductRow {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            barcode: p.barcode.clone().unwrap_or_else(|| "-".to_string()),
            name: p.name.clone(),
            price: p.price.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string()),
            description: p
                .description
                .as_deref()
                .map(|d| truncate(d, DESCRIPTION_WIDTH))
                .unwrap_or_default(),
            updated_at: p.updated_at.clone(),
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        flat
    } else {
        format!("{}…", flat.chars().take(width - 1).collect::<String>())
    }
}

/// Render products as a rounded table; empty input gives an empty string
pub fn product_table(products: &[Product]) -> String {
    if products.is_empty() {
        return String::new();
    }
    let rows: Vec<ProductRow> = products.iter().map(ProductRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(description: Option<&str>) -> Product {
        Product {
            id: 7,
            barcode: None,
            name: "Widget".to_string(),
            price: Some(2.5),
            description: description.map(str::to_string),
            created_at: "2024-01-01 00:00:00.000".to_string(),
            updated_at: "2024-01-02 00:00:00.000".to_string(),
        }
    }

    #[test]
    fn test_product_table() {
        let table = product_table(&[product(Some("a\nb"))]);
        assert!(table.contains("Widget"));
        assert!(table.contains("2.50"));
        assert!(table.contains("a b"));
        assert!(product_table(&[]).is_empty());
    }

    #[test]
    fn test_long_descriptions_are_truncated() {
        let long = "x".repeat(100);
        let row = ProductRow::from(&product(Some(&long)));
        assert_eq!(row.description.chars().count(), DESCRIPTION_WIDTH);
        assert!(row.description.ends_with('…'));
    }
}
