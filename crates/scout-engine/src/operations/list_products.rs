use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use super::catalog::Catalog;

pub struct ListProducts {
    catalog: Arc<Catalog>,
}

impl ListProducts {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Operation for ListProducts {
    fn name(&self) -> &str {
        "list_all_products"
    }

    fn description(&self) -> &str {
        "List every chair in the catalog with its price tier. Use when the user wants to browse."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _args: Value) -> Result<String, OperationError> {
        let products = self.catalog.products();
        if products.is_empty() {
            return Ok("No products found in catalog.".into());
        }
        let mut out = String::from("**Herman Miller Office Chairs:**\n\n");
        for p in products {
            out.push_str(&format!("**{}** ({})\n", p.name, p.price_tier));
        }
        out.push_str(&format!("\nTotal: {} chairs available", products.len()));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::catalog::test_catalog;

    #[tokio::test]
    async fn lists_every_product() {
        let out = ListProducts::new(test_catalog()).invoke(json!({})).await.unwrap();
        assert!(out.starts_with("**Herman Miller Office Chairs:**\n\n**Aeron Chair** (premium)\n"));
        assert!(out.contains("**Eames Aluminum Group Chair** (luxury)"));
        assert!(out.ends_with("Total: 4 chairs available"));
    }

    #[tokio::test]
    async fn empty_catalog() {
        let op = ListProducts::new(Arc::new(Catalog::default()));
        assert_eq!(op.invoke(json!({})).await.unwrap(), "No products found in catalog.");
    }
}
