//! Inventory material and case-consumption models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An inventory item consumed by cases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    /// Local UUID
    pub id: String,
    /// Display name
    pub name: String,
    /// Stock Keeping Unit
    pub sku: String,
    /// Category (e.g. "Ceramics", "Alloys")
    pub category: String,
    /// Unit of measure (e.g. "g", "pcs", "blocks")
    pub unit: String,
    /// Quantity on hand; may go negative under the permissive stock policy
    pub quantity: Decimal,
    /// Low-stock threshold; zero disables the warning
    pub reorder_level: Decimal,
    /// Cost per unit
    pub unit_cost: Decimal,
    /// Supplier name
    pub supplier: String,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Material {
    /// Create a new material with required fields and empty stock.
    pub fn new(name: String, unit: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            sku: String::new(),
            category: String::new(),
            unit,
            quantity: Decimal::ZERO,
            reorder_level: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            supplier: String::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// At or below the reorder level (when one is set).
    pub fn is_low_stock(&self) -> bool {
        self.reorder_level > Decimal::ZERO && self.quantity <= self.reorder_level
    }

    /// Value of stock on hand.
    pub fn stock_value(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

/// Total value of a set of materials.
pub fn inventory_value(materials: &[Material]) -> Decimal {
    materials.iter().map(Material::stock_value).sum()
}

/// A quantity of material consumed by a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseMaterial {
    /// Local UUID
    pub id: String,
    /// Consuming case
    pub case_id: String,
    /// Consumed material
    pub material_id: String,
    /// Quantity taken from stock
    pub quantity_used: Decimal,
    /// Material name (joined on read)
    pub material_name: Option<String>,
    /// Material unit (joined on read)
    pub material_unit: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock() {
        let mut material = Material::new("Zirconia Disc".into(), "pcs".into());
        assert!(!material.is_low_stock());

        material.reorder_level = Decimal::new(5, 0);
        material.quantity = Decimal::new(5, 0);
        assert!(material.is_low_stock());

        material.quantity = Decimal::new(6, 0);
        assert!(!material.is_low_stock());
    }

    #[test]
    fn test_inventory_value() {
        let mut a = Material::new("E.max Ingot".into(), "pcs".into());
        a.quantity = Decimal::new(10, 0);
        a.unit_cost = Decimal::new(1250, 2);

        let mut b = Material::new("Gold Alloy".into(), "g".into());
        b.quantity = Decimal::new(25, 1);
        b.unit_cost = Decimal::new(60, 0);

        assert_eq!(inventory_value(&[a, b]), Decimal::new(27500, 2));
    }
}
