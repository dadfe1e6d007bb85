use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Looks up localized strings provided by the host app (Android string
/// resources, iOS `Localizable.strings`, ...).
pub trait IResourceProvider: Send + Sync + 'static {
    fn get_string(&self, key: &str) -> Option<String>;
}

pub type ResourceProvider = Arc<dyn IResourceProvider>;

impl dyn IResourceProvider {
    pub fn get_string_or(&self, key: &str, fallback: &str) -> String {
        self.get_string(key).unwrap_or_else(|| fallback.to_owned())
    }
}

/// Resource table handed over by the host as a flat key/value map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticResources(pub BTreeMap<String, String>);

impl IResourceProvider for StaticResources {
    fn get_string(&self, key: &str) -> Option<String> {
        self.0.get(key).filter(|value| !value.is_empty()).cloned()
    }
}

/// Substitutes the `%d` placeholder of an amount template.
pub fn format_amount(template: &str, amount: u64) -> String {
    template.replacen("%d", &amount.to_string(), 1)
}
