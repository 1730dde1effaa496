use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use super::catalog::Catalog;
use super::required_str;

pub struct SustainableOptions {
    catalog: Arc<Catalog>,
}

impl SustainableOptions {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Operation for SustainableOptions {
    fn name(&self) -> &str {
        "get_sustainable_options"
    }

    fn description(&self) -> &str {
        "List the sustainable materials used in a chair."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["product_name"],
            "properties": {
                "product_name": {"type": "string"}
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let name = required_str(&args, "product_name")?;
        let Some(product) = self.catalog.find(name) else {
            return Ok(format!("Product '{name}' not found."));
        };

        let sustainable: Vec<_> = product.materials.iter().filter(|m| m.is_sustainable).collect();
        if sustainable.is_empty() {
            return Ok(format!(
                "No specific sustainable materials information available for {}.",
                product.name
            ));
        }

        let mut out = format!("**Sustainable Materials in {}:**\n\n", product.name);
        for m in sustainable {
            out.push_str(&format!("**{}**: {}\n", m.component, m.material));
            if let Some(desc) = &m.description {
                out.push_str(&format!("  {desc}\n"));
            }
        }
        Ok(out.trim_end().to_string())
    }
}
