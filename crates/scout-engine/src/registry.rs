use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use scout_core::operations::{Operation, OperationDefinition};

/// Fixed name → operation mapping. Built once, read-only afterwards.
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    /// Definitions offered to the model, sorted by name.
    pub fn definitions(&self) -> Vec<OperationDefinition> {
        let mut defs: Vec<OperationDefinition> = self
            .operations
            .values()
            .map(|op| op.to_definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl RegistryBuilder {
    /// A later registration under the same name replaces the earlier one.
    pub fn register(mut self, operation: Arc<dyn Operation>) -> Self {
        let name = operation.name().to_string();
        if self.operations.insert(name.clone(), operation).is_some() {
            warn!(operation = %name, "operation registered twice, keeping the last");
        }
        self
    }

    pub fn register_all(self, operations: impl IntoIterator<Item = Arc<dyn Operation>>) -> Self {
        operations.into_iter().fold(self, Self::register)
    }

    pub fn build(self) -> OperationRegistry {
        OperationRegistry {
            operations: self.operations,
        }
    }
}
