// gsq-core/src/domain/session.rs

use std::collections::BTreeMap;

pub const CLUSTER_IDENTIFIER: &str = "AZUREML_SYNAPSE_CLUSTER_IDENTIFIER";
pub const TOKEN_SERVICE_ENDPOINT: &str = "AZUREML_SYNAPSE_TOKEN_SERVICE_ENDPOINT";
pub const RUN_ID: &str = "AZUREML_RUN_ID";
pub const RUN_TOKEN_EXPIRY: &str = "AZUREML_RUN_TOKEN_EXPIRY";
pub const OBO_SERVICE_ENDPOINT: &str = "AZUREML_OBO_SERVICE_ENDPOINT";
pub const OBO_CANARY_TOKEN: &str = "AZUREML_OBO_CANARY_TOKEN";
pub const ARM_SUBSCRIPTION: &str = "AZUREML_ARM_SUBSCRIPTION";
pub const ARM_RESOURCE_GROUP: &str = "AZUREML_ARM_RESOURCEGROUP";
pub const ARM_WORKSPACE_NAME: &str = "AZUREML_ARM_WORKSPACE_NAME";
pub const ARM_PROJECT_NAME: &str = "AZUREML_ARM_PROJECT_NAME";
pub const SERVICE_ENDPOINT: &str = "AZUREML_SERVICE_ENDPOINT";
pub const OID: &str = "OID";
pub const TID: &str = "TID";

/// Identity variables propagated from the driver to every batch worker.
pub const SESSION_KEYS: [&str; 13] = [
    CLUSTER_IDENTIFIER,
    TOKEN_SERVICE_ENDPOINT,
    RUN_ID,
    RUN_TOKEN_EXPIRY,
    OBO_SERVICE_ENDPOINT,
    OBO_CANARY_TOKEN,
    ARM_SUBSCRIPTION,
    ARM_RESOURCE_GROUP,
    ARM_WORKSPACE_NAME,
    ARM_PROJECT_NAME,
    SERVICE_ENDPOINT,
    OID,
    TID,
];

/// Immutable snapshot of the job identity context.
///
/// Captured once on the driver and handed to each worker explicitly,
/// instead of mutating the process environment per worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    vars: BTreeMap<String, String>,
}

impl SessionContext {
    pub fn from_env() -> Self {
        Self::from_pairs(
            SESSION_KEYS
                .iter()
                .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v))),
        )
    }

    /// Keeps only the recognised session keys, ignoring empty values.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, v)| SESSION_KEYS.contains(&k.as_str()) && !v.is_empty())
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        if SESSION_KEYS.contains(&key) {
            self.vars.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn run_id(&self) -> Option<&str> {
        self.get(RUN_ID)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}
