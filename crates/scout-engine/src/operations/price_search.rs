use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use super::catalog::{money, Catalog, Product, Variant};
use super::optional_f64;

pub struct PriceSearch {
    catalog: Arc<Catalog>,
}

impl PriceSearch {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Operation for PriceSearch {
    fn name(&self) -> &str {
        "search_products_by_price"
    }

    fn description(&self) -> &str {
        "Find chair variants whose base price falls within a range. Either bound may be omitted."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "min_price": {"type": "number", "description": "Minimum price in dollars"},
                "max_price": {"type": "number", "description": "Maximum price in dollars"}
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let min = optional_f64(&args, "min_price")?;
        let max = optional_f64(&args, "max_price")?;
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(OperationError::InvalidArguments(format!(
                    "min_price ({lo}) is greater than max_price ({hi})"
                )));
            }
        }
        let lo = min.unwrap_or(0.0);
        let hi = max.unwrap_or(f64::INFINITY);

        // Products ordered by their cheapest matching variant.
        let mut groups: Vec<(&Product, Vec<&Variant>)> = self
            .catalog
            .products()
            .iter()
            .filter_map(|p| {
                let mut hits: Vec<&Variant> = p
                    .variants
                    .iter()
                    .filter(|v| v.base_price >= lo && v.base_price <= hi)
                    .collect();
                hits.sort_by(|a, b| a.base_price.total_cmp(&b.base_price));
                (!hits.is_empty()).then_some((p, hits))
            })
            .collect();
        groups.sort_by(|a, b| a.1[0].base_price.total_cmp(&b.1[0].base_price));

        let range = describe_range(min, max);
        if groups.is_empty() {
            return Ok(format!("No products found {range}."));
        }

        let mut out = format!("Products available {range}:\n");
        for (product, variants) in groups {
            let _ = write!(out, "\n**{}**\n  Tier: {}\n", product.name, product.price_tier);
            for v in variants {
                let _ = writeln!(out, "  - {}: {}", v.name, money(v.base_price));
            }
        }
        Ok(out.trim_end().to_string())
    }
}

fn describe_range(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("between {} and {}", money(lo), money(hi)),
        (Some(lo), None) => format!("from {}", money(lo)),
        (None, Some(hi)) => format!("up to {}", money(hi)),
        (None, None) => "at any price".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::catalog::test_catalog;

    async fn search(args: Value) -> Result<String, OperationError> {
        PriceSearch::new(test_catalog()).invoke(args).await
    }

    #[tokio::test]
    async fn range_groups_by_product() {
        let out = search(json!({"min_price": 1400.0, "max_price": 1600.0})).await.unwrap();
        assert!(out.starts_with("Products available between $1400.00 and $1600.00:\n"));
        assert!(out.contains("**Aeron Chair**\n  Tier: premium\n  - Size B: $1495.00\n  - Size C: $1595.00"));
        assert!(out.contains("**Cosm Chair**\n  Tier: mid-range\n  - High Back: $1495.00"));
        assert!(!out.contains("Size A"));
        assert!(!out.contains("Lino"));
    }

    #[tokio::test]
    async fn cheapest_product_first() {
        let out = search(json!({"max_price": 1300})).await.unwrap();
        let lino = out.find("Lino Chair").unwrap();
        let cosm = out.find("Cosm Chair").unwrap();
        assert!(lino < cosm);
        assert!(out.starts_with("Products available up to $1300.00:"));
    }

    #[tokio::test]
    async fn open_range_lists_everything() {
        let out = search(json!({})).await.unwrap();
        assert_eq!(out.matches("Tier:").count(), 4);
    }

    #[tokio::test]
    async fn empty_range() {
        let out = search(json!({"min_price": 10, "max_price": 20})).await.unwrap();
        assert_eq!(out, "No products found between $10.00 and $20.00.");
    }

    #[tokio::test]
    async fn inverted_range_rejected() {
        let err = search(json!({"min_price": 2000, "max_price": 100})).await.unwrap_err();
        assert!(matches!(err, OperationError::InvalidArguments(_)));
    }
}
