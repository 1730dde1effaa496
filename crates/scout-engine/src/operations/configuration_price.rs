use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use super::catalog::{money, Catalog};
use super::required_str;

pub struct ConfigurationPrice {
    catalog: Arc<Catalog>,
}

impl ConfigurationPrice {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Operation for ConfigurationPrice {
    fn name(&self) -> &str {
        "get_chair_configuration_price"
    }

    fn description(&self) -> &str {
        "Calculate the itemized price of a chair configuration: one variant plus optional add-ons."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["product_name", "variant_name"],
            "properties": {
                "product_name": {"type": "string"},
                "variant_name": {"type": "string", "description": "e.g. \"Size B\""},
                "addon_names": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Add-ons to include"
                }
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let product_name = required_str(&args, "product_name")?;
        let variant_name = required_str(&args, "variant_name")?;
        let addon_names: Vec<&str> = match &args["addon_names"] {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_str().ok_or_else(|| {
                        OperationError::InvalidArguments("addon_names must be strings".into())
                    })
                })
                .collect::<Result<_, _>>()?,
            _ => {
                return Err(OperationError::InvalidArguments(
                    "addon_names must be an array".into(),
                ))
            }
        };

        let Some(product) = self.catalog.find(product_name) else {
            return Ok(format!("Product '{product_name}' not found."));
        };
        let Some(variant) = product.variant(variant_name) else {
            return Ok(format!("Variant '{variant_name}' not found for {}.", product.name));
        };

        let (known, unknown): (Vec<_>, Vec<_>) = addon_names
            .iter()
            .map(|name| (*name, product.addon(name)))
            .partition(|(_, addon)| addon.is_some());
        let addons: Vec<_> = known.into_iter().filter_map(|(_, a)| a).collect();

        let mut out = format!(
            "**{} - {}**\n\nBase Price: {}\n\n",
            product.name,
            variant.name,
            money(variant.base_price)
        );
        if !addons.is_empty() {
            out.push_str("Add-ons:\n");
            for a in &addons {
                let _ = writeln!(out, "  - {}: +{}", a.name, money(a.price));
            }
            out.push('\n');
        }
        if !unknown.is_empty() {
            let names: Vec<_> = unknown.iter().map(|(n, _)| *n).collect();
            let _ = write!(out, "Ignored (not available for {}): {}\n\n", product.name, names.join(", "));
        }
        let total = variant.base_price + addons.iter().map(|a| a.price).sum::<f64>();
        let _ = write!(out, "**Total: {}**", money(total));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::catalog::test_catalog;

    async fn price(args: Value) -> Result<String, OperationError> {
        ConfigurationPrice::new(test_catalog()).invoke(args).await
    }

    #[tokio::test]
    async fn itemized_total() {
        let out = price(json!({
            "product_name": "Aeron Chair",
            "variant_name": "size b",
            "addon_names": ["Adjustable Arms", "Forward Tilt"]
        }))
        .await
        .unwrap();
        assert_eq!(
            out,
            "**Aeron Chair - Size B**\n\nBase Price: $1495.00\n\n\
             Add-ons:\n  - Adjustable Arms: +$85.00\n  - Forward Tilt: +$125.00\n\n\
             **Total: $1705.00**"
        );
    }

    #[tokio::test]
    async fn base_only() {
        let out = price(json!({"product_name": "Lino Chair", "variant_name": "Standard"}))
            .await
            .unwrap();
        assert!(!out.contains("Add-ons"));
        assert!(out.ends_with("**Total: $795.00**"));
    }

    #[tokio::test]
    async fn unknown_addons_listed_and_excluded() {
        let out = price(json!({
            "product_name": "Aeron Chair",
            "variant_name": "Size A",
            "addon_names": ["Cup Holder", "Forward Tilt"]
        }))
        .await
        .unwrap();
        assert!(out.contains("Ignored (not available for Aeron Chair): Cup Holder"));
        assert!(out.ends_with("**Total: $1520.00**"));
    }

    #[tokio::test]
    async fn unknown_variant_and_product() {
        let out = price(json!({"product_name": "Aeron Chair", "variant_name": "Size Z"}))
            .await
            .unwrap();
        assert_eq!(out, "Variant 'Size Z' not found for Aeron Chair.");
        let out = price(json!({"product_name": "Mirra", "variant_name": "Size B"}))
            .await
            .unwrap();
        assert_eq!(out, "Product 'Mirra' not found.");
    }

    #[tokio::test]
    async fn bad_addon_shape() {
        let err = price(json!({"product_name": "Aeron Chair", "variant_name": "Size B", "addon_names": "Forward Tilt"}))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::InvalidArguments(_)));
    }
}
