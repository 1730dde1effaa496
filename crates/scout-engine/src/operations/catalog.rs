//! In-memory product catalog backing the lookup operations.

use std::path::Path;

use serde::{Deserialize, Serialize};

const BUNDLED: &str = include_str!("../../data/catalog.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate product name: {0}")]
    DuplicateProduct(String),
    #[error("product {0} has no variants")]
    NoVariants(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price_tier: String,
    pub design_style: String,
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub addons: Vec<Addon>,
    #[serde(default)]
    pub colors: Vec<Color>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub size_guide: Option<SizeGuide>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub base_price: f64,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Addon {
    pub name: String,
    pub category: String,
    pub price: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub name: String,
    #[serde(default)]
    pub applies_to: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub component: String,
    pub material: String,
    #[serde(default)]
    pub is_sustainable: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Measurement thresholds for products sold in several sizes.
///
/// Below either minimum selects `small`, above either maximum selects
/// `large`, everything else `medium`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeGuide {
    pub min_height_in: f64,
    pub min_weight_lb: f64,
    pub max_height_in: f64,
    pub max_weight_lb: f64,
    pub small: SizeBand,
    pub medium: SizeBand,
    pub large: SizeBand,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeBand {
    pub label: String,
    pub explanation: String,
}

impl SizeGuide {
    pub fn recommend(&self, height_in: f64, weight_lb: f64) -> &SizeBand {
        if height_in < self.min_height_in || weight_lb < self.min_weight_lb {
            &self.small
        } else if height_in > self.max_height_in || weight_lb > self.max_weight_lb {
            &self.large
        } else {
            &self.medium
        }
    }
}

impl Product {
    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    pub fn addon(&self, name: &str) -> Option<&Addon> {
        self.addons.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

impl Catalog {
    /// The catalog shipped with the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let catalog = Self { products };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (i, p) in self.products.iter().enumerate() {
            if p.variants.is_empty() {
                return Err(CatalogError::NoVariants(p.name.clone()));
            }
            if self.products[..i].iter().any(|q| q.name.eq_ignore_ascii_case(&p.name)) {
                return Err(CatalogError::DuplicateProduct(p.name.clone()));
            }
        }
        Ok(())
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn names(&self) -> Vec<String> {
        self.products.iter().map(|p| p.name.clone()).collect()
    }

    /// Exact name match, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Product> {
        let name = name.trim();
        self.products.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Dollar amount with two decimals.
pub(crate) fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
pub(crate) fn test_catalog() -> std::sync::Arc<Catalog> {
    std::sync::Arc::new(Catalog::bundled().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_loads() {
        let c = Catalog::bundled().unwrap();
        assert_eq!(
            c.names(),
            ["Aeron Chair", "Lino Chair", "Cosm Chair", "Eames Aluminum Group Chair"]
        );
    }

    #[test]
    fn find_is_case_insensitive_and_exact() {
        let c = Catalog::bundled().unwrap();
        assert_eq!(c.find("aeron chair").unwrap().name, "Aeron Chair");
        assert_eq!(c.find(" AERON CHAIR ").unwrap().name, "Aeron Chair");
        assert!(c.find("Aeron").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let json = r#"{"products": [
            {"name": "A", "price_tier": "x", "design_style": "y", "variants": [{"name": "v", "base_price": 1.0}]},
            {"name": "a", "price_tier": "x", "design_style": "y", "variants": [{"name": "v", "base_price": 1.0}]}
        ]}"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::DuplicateProduct(_))));
    }

    #[test]
    fn product_without_variants_rejected() {
        let json = r#"{"products": [{"name": "A", "price_tier": "x", "design_style": "y", "variants": []}]}"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::NoVariants(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Catalog::from_path(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/catalog.json"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, BUNDLED).unwrap();
        assert_eq!(Catalog::from_path(&path).unwrap().products().len(), 4);
    }

    #[test]
    fn size_bands() {
        let c = Catalog::bundled().unwrap();
        let guide = c.find("Aeron Chair").unwrap().size_guide.as_ref().unwrap();
        assert_eq!(guide.recommend(62.0, 150.0).label, "Size A");
        assert_eq!(guide.recommend(70.0, 120.0).label, "Size A");
        assert_eq!(guide.recommend(70.0, 170.0).label, "Size B");
        assert_eq!(guide.recommend(80.0, 170.0).label, "Size C");
        assert_eq!(guide.recommend(70.0, 250.0).label, "Size C");
    }

    #[test]
    fn money_format() {
        assert_eq!(money(1495.0), "$1495.00");
        assert_eq!(money(85.5), "$85.50");
    }
}
