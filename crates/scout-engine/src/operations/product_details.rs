use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use super::catalog::{money, Catalog};
use super::required_str;

const MAX_LISTED: usize = 5;

pub struct ProductDetails {
    catalog: Arc<Catalog>,
}

impl ProductDetails {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Operation for ProductDetails {
    fn name(&self) -> &str {
        "get_product_details"
    }

    fn description(&self) -> &str {
        "Get details about one chair by name: price tier, design style, variants with \
         prices, colors and materials."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["product_name"],
            "properties": {
                "product_name": {
                    "type": "string",
                    "description": "Exact product name, e.g. \"Aeron Chair\""
                }
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let name = required_str(&args, "product_name")?;
        let Some(p) = self.catalog.find(name) else {
            return Ok(format!("Product '{name}' not found in catalog."));
        };

        let mut out = format!("**{}**\n\n", p.name);
        let _ = writeln!(out, "Price Tier: {}", p.price_tier);
        let _ = writeln!(out, "Design Style: {}", p.design_style);

        out.push_str("\n**Available Variants:**\n");
        for v in &p.variants {
            let marker = if v.is_default { " (default)" } else { "" };
            let _ = writeln!(out, "- {}: {}{marker}", v.name, money(v.base_price));
        }

        if !p.colors.is_empty() {
            out.push_str("\n**Colors:**\n");
            for c in p.colors.iter().take(MAX_LISTED) {
                if c.applies_to.is_empty() {
                    let _ = writeln!(out, "- {}", c.name);
                } else {
                    let _ = writeln!(out, "- {} (applies to: {})", c.name, c.applies_to.join(", "));
                }
            }
        }

        if !p.materials.is_empty() {
            out.push_str("\n**Materials:**\n");
            for m in p.materials.iter().take(MAX_LISTED) {
                let marker = if m.is_sustainable { " (sustainable)" } else { "" };
                let _ = writeln!(out, "- {}: {}{marker}", m.component, m.material);
            }
        }

        Ok(out.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::catalog::test_catalog;

    async fn details(name: &str) -> String {
        ProductDetails::new(test_catalog())
            .invoke(json!({"product_name": name}))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn aeron_details() {
        let out = details("aeron chair").await;
        assert!(out.starts_with("**Aeron Chair**\n\nPrice Tier: premium\nDesign Style: modern-ergonomic\n"));
        assert!(out.contains("- Size B: $1495.00 (default)"));
        assert!(out.contains("- Size A: $1395.00\n"));
        assert!(out.contains("- Carbon (applies to: mesh, frame)"));
        assert!(out.contains("- Mesh: 8Z Pellicle (sustainable)"));
        assert!(out.contains("- Arms: Glass-filled Nylon"));
    }

    #[tokio::test]
    async fn colors_capped_at_five() {
        let out = details("Aeron Chair").await;
        assert!(out.contains("- Glacier"));
        assert!(!out.contains("Nightfall"));
    }

    #[tokio::test]
    async fn unknown_product_is_text() {
        assert_eq!(details("Embody").await, "Product 'Embody' not found in catalog.");
    }

    #[tokio::test]
    async fn missing_name_is_invalid() {
        let err = ProductDetails::new(test_catalog()).invoke(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("product_name is required"));
    }
}
