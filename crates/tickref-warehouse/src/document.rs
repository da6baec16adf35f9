//! JSON catalog documents used for bulk import and export.

use serde::{Deserialize, Serialize};

use crate::WarehouseError;

/// A whole reference catalog: tags with their associations plus the name
/// universes tag filters are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
    #[serde(default)]
    pub instruments: Vec<InstrumentRecord>,
    #[serde(default)]
    pub eod_strategies: Vec<String>,
    #[serde(default)]
    pub intraday_spreads: Vec<String>,
    #[serde(default)]
    pub eod_spreads: Vec<String>,
    #[serde(default)]
    pub custom_indices: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductLink>,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub strategy_filters: Vec<String>,
    #[serde(default)]
    pub custom_instrument_filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductLink {
    pub product: String,
    pub product_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product: String,
    pub product_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An instrument and the product it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub instrument: String,
    pub product: String,
    pub product_type: String,
}

/// Rows written by one import. Rows that already existed are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub tags: usize,
    pub product_links: usize,
    pub instrument_links: usize,
    pub strategy_filters: usize,
    pub custom_filters: usize,
    pub products: usize,
    pub instruments: usize,
    pub strategy_names: usize,
    pub custom_indices: usize,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.tags
            + self.product_links
            + self.instrument_links
            + self.strategy_filters
            + self.custom_filters
            + self.products
            + self.instruments
            + self.strategy_names
            + self.custom_indices
    }
}

impl CatalogDocument {
    pub fn from_json(input: &str) -> Result<Self, WarehouseError> {
        let document: Self = serde_json::from_str(input)?;
        document.validate()?;
        Ok(document)
    }

    /// Reject documents with blank keys before anything is written.
    pub fn validate(&self) -> Result<(), WarehouseError> {
        for record in &self.tags {
            require("tag", &record.tag)?;
            for link in &record.products {
                require("product", &link.product)?;
                require("product_type", &link.product_type)?;
            }
            for instrument in &record.instruments {
                require("instrument", instrument)?;
            }
        }
        for product in &self.products {
            require("product", &product.product)?;
            require("product_type", &product.product_type)?;
        }
        for instrument in &self.instruments {
            require("instrument", &instrument.instrument)?;
            require("product", &instrument.product)?;
            require("product_type", &instrument.product_type)?;
        }
        for name in self
            .eod_strategies
            .iter()
            .chain(&self.intraday_spreads)
            .chain(&self.eod_spreads)
        {
            require("strategy name", name)?;
        }
        for name in &self.custom_indices {
            require("custom index", name)?;
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), WarehouseError> {
    if value.trim().is_empty() {
        return Err(WarehouseError::InvalidDocument(format!(
            "{field} must not be blank"
        )));
    }
    Ok(())
}
