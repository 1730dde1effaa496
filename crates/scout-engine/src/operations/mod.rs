pub mod catalog;
pub mod configuration_price;
pub mod list_products;
pub mod price_search;
pub mod product_details;
pub mod size_recommendation;
pub mod sustainable_options;
pub mod think;

use std::sync::Arc;

use serde_json::Value;

use scout_core::operations::{Operation, OperationError};

use crate::registry::OperationRegistry;

pub use catalog::{Catalog, CatalogError};

/// Every built-in operation, backed by `catalog`.
pub fn builtin_operations(catalog: Arc<Catalog>) -> Vec<Arc<dyn Operation>> {
    vec![
        // Catalog lookups
        Arc::new(list_products::ListProducts::new(catalog.clone())),
        Arc::new(product_details::ProductDetails::new(catalog.clone())),
        Arc::new(price_search::PriceSearch::new(catalog.clone())),
        Arc::new(configuration_price::ConfigurationPrice::new(catalog.clone())),
        Arc::new(size_recommendation::SizeRecommendation::new(catalog.clone())),
        Arc::new(sustainable_options::SustainableOptions::new(catalog)),
        // Reflection
        Arc::new(think::ThinkTool),
    ]
}

pub fn create_default_registry(catalog: Arc<Catalog>) -> OperationRegistry {
    OperationRegistry::builder()
        .register_all(builtin_operations(catalog))
        .build()
}

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, OperationError> {
    args[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OperationError::InvalidArguments(format!("{key} is required")))
}

/// Absent or null is `None`; any other non-number is an error.
pub(crate) fn optional_f64(args: &Value, key: &str) -> Result<Option<f64>, OperationError> {
    match &args[key] {
        Value::Null => Ok(None),
        v => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| OperationError::InvalidArguments(format!("{key} must be a number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_registry_names() {
        let registry = create_default_registry(catalog::test_catalog());
        assert_eq!(
            registry.names(),
            [
                "get_chair_configuration_price",
                "get_product_details",
                "get_size_recommendation_for_user",
                "get_sustainable_options",
                "list_all_products",
                "search_products_by_price",
                "think_tool",
            ]
        );
    }

    #[test]
    fn schemas_are_objects() {
        for op in builtin_operations(catalog::test_catalog()) {
            assert_eq!(op.parameters_schema()["type"], "object", "{}", op.name());
        }
    }

    #[test]
    fn arg_helpers() {
        let args = json!({"name": "  Aeron Chair ", "blank": " ", "n": 3, "s": "x"});
        assert_eq!(required_str(&args, "name").unwrap(), "Aeron Chair");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(optional_f64(&args, "n").unwrap(), Some(3.0));
        assert_eq!(optional_f64(&args, "missing").unwrap(), None);
        assert!(optional_f64(&args, "s").is_err());
    }
}
