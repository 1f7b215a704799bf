//! Product types
//!
//! A `Product` is one catalog row as stored by the engine. `ProductFields`
//! is the editable subset a caller supplies on create and update.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A product record.
///
/// `id`, `created_at` and `updated_at` are assigned by the engine; callers
/// never set them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Engine-assigned identifier, immutable once created
    pub id: i64,
    /// Optional barcode, unique across all products when present
    pub barcode: Option<String>,
    /// Display name, never empty
    pub name: String,
    /// Optional unit price
    pub price: Option<f64>,
    /// Free-form description
    pub description: Option<String>,
    /// UTC insert time, `YYYY-MM-DD HH:MM:SS.SSS`
    pub created_at: String,
    /// UTC time of the last create or update
    pub updated_at: String,
}

/// Editable product fields, as submitted by a form or command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFields {
    pub barcode: Option<String>,
    pub name: String,
    pub price: Option<f64>,
    pub description: Option<String>,
}

impl ProductFields {
    /// Create fields with just the required name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trim text fields and turn blank optionals into `None`.
    ///
    /// A blank barcode must become NULL, otherwise two products saved with
    /// an empty barcode field would collide on the UNIQUE constraint.
    pub fn normalized(self) -> Self {
        Self {
            barcode: blank_to_none(self.barcode),
            name: self.name.trim().to_string(),
            price: self.price,
            description: blank_to_none(self.description),
        }
    }

    /// Check the rules that are enforced before any engine call
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        if let Some(price) = self.price {
            if !price.is_finite() {
                return Err(Error::Validation(format!("price must be a finite number, got {}", price)));
            }
        }
        Ok(())
    }

    /// Normalize then validate, returning the fields ready for binding
    pub fn prepare(self) -> Result<Self> {
        let fields = self.normalized();
        fields.validate()?;
        Ok(fields)
    }
}

impl From<&Product> for ProductFields {
    fn from(product: &Product) -> Self {
        Self {
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            price: product.price,
            description: product.description.clone(),
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
