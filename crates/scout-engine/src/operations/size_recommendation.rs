use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use super::catalog::Catalog;
use super::{optional_f64, required_str};

const CM_PER_INCH: f64 = 2.54;
const LB_PER_KG: f64 = 2.20462;

pub struct SizeRecommendation {
    catalog: Arc<Catalog>,
}

impl SizeRecommendation {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

/// Imperial inputs win when both unit systems are given.
fn measurements(args: &Value) -> Result<(f64, f64), OperationError> {
    let height = match optional_f64(args, "height_inches")? {
        Some(h) => h,
        None => optional_f64(args, "height_cm")?
            .map(|cm| cm / CM_PER_INCH)
            .ok_or_else(|| OperationError::InvalidArguments("height_inches or height_cm is required".into()))?,
    };
    let weight = match optional_f64(args, "weight_pounds")? {
        Some(w) => w,
        None => optional_f64(args, "weight_kg")?
            .map(|kg| kg * LB_PER_KG)
            .ok_or_else(|| OperationError::InvalidArguments("weight_pounds or weight_kg is required".into()))?,
    };
    if height <= 0.0 || weight <= 0.0 {
        return Err(OperationError::InvalidArguments(
            "height and weight must be positive".into(),
        ));
    }
    Ok((height, weight))
}

#[async_trait]
impl Operation for SizeRecommendation {
    fn name(&self) -> &str {
        "get_size_recommendation_for_user"
    }

    fn description(&self) -> &str {
        "Recommend a chair size from the user's height and weight, in imperial or metric units."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["product_name"],
            "properties": {
                "product_name": {"type": "string"},
                "height_inches": {"type": "number"},
                "weight_pounds": {"type": "number"},
                "height_cm": {"type": "number"},
                "weight_kg": {"type": "number"}
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let name = required_str(&args, "product_name")?;
        let (height, weight) = measurements(&args)?;
        let Some(product) = self.catalog.find(name) else {
            return Ok(format!("Product '{name}' not found in catalog."));
        };

        let (size, explanation) = match &product.size_guide {
            Some(guide) => {
                let band = guide.recommend(height, weight);
                (band.label.clone(), band.explanation.clone())
            }
            None => (
                "Standard (one size fits most)".to_string(),
                format!("{} is designed to fit users 5'0\" - 6'5\"", product.name),
            ),
        };

        let total_inches = height.round() as i64;
        Ok(format!(
            "**Size Recommendation for {}**\n\n\
             Based on your measurements:\n  Height: {height:.1}\" ({}'{}\")\n  Weight: {weight:.1} lbs\n\n\
             **Recommended: {size}**\n{explanation}",
            product.name,
            total_inches / 12,
            total_inches % 12,
        ))
    }
}
