//! Ordered set of named transports behind a failover group.

use crate::error::{FailoverError, FailoverResult};
use crate::messaging::Transport;
use std::collections::HashSet;
use std::sync::Arc;

/// Fewest transports a failover group accepts
pub const MIN_TRANSPORTS: usize = 2;

/// Transports in registration order, keyed by unique name
///
/// Order is fixed at construction and drives the sender's cascade.
#[derive(Debug, Clone)]
pub struct TransportRegistry {
    names: Vec<String>,
    transports: Vec<Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new(entries: Vec<(String, Arc<dyn Transport>)>) -> FailoverResult<Self> {
        if entries.len() < MIN_TRANSPORTS {
            return Err(FailoverError::configuration(
                "transports",
                format!(
                    "a failover group needs at least {MIN_TRANSPORTS} transports, got {}",
                    entries.len()
                ),
            ));
        }

        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(entries.len());
        let mut transports = Vec::with_capacity(entries.len());

        for (name, transport) in entries {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(FailoverError::configuration(
                    "transports",
                    "transport names must not be empty",
                ));
            }
            if !seen.insert(trimmed.to_string()) {
                return Err(FailoverError::configuration(
                    "transports",
                    format!("duplicate transport name '{trimmed}'"),
                ));
            }
            names.push(trimmed.to_string());
            transports.push(transport);
        }

        Ok(Self { names, transports })
    }

    /// Transport names in registration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Transport>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| &self.transports[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// `(name, transport)` pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Transport>)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.transports.iter())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryTransport;

    fn entry(name: &str) -> (String, Arc<dyn Transport>) {
        (name.to_string(), Arc::new(InMemoryTransport::new(name)))
    }

    #[test]
    fn test_registry_keeps_order() {
        let registry =
            TransportRegistry::new(vec![entry("primary"), entry("secondary"), entry("tertiary")])
                .unwrap();

        assert_eq!(registry.names(), ["primary", "secondary", "tertiary"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get("secondary").is_some());
        assert!(registry.get("missing").is_none());
        let order: Vec<_> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["primary", "secondary", "tertiary"]);
    }

    #[test]
    fn test_registry_rejects_single_transport() {
        let err = TransportRegistry::new(vec![entry("primary")]).unwrap_err();
        assert!(matches!(err, FailoverError::Configuration { .. }));
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_registry_rejects_duplicates_and_blank_names() {
        let err = TransportRegistry::new(vec![entry("primary"), entry("primary")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let err = TransportRegistry::new(vec![entry("primary"), entry("  ")]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
