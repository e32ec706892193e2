//! Registry of configured source adapters

use super::traits::{SourceAdapter, SourceDescriptor};
use std::sync::Arc;

/// One configured source: the adapter plus how it takes part in merges
#[derive(Clone)]
pub struct RegisteredSource {
    pub adapter: Arc<dyn SourceAdapter>,
    pub descriptor: SourceDescriptor,
}

/// Registry of configured sources, kept in configuration order so fan-out
/// result slots line up the same way on every request
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<RegisteredSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source; a later registration under the same name replaces
    /// the earlier one in place
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>, descriptor: SourceDescriptor) {
        let entry = RegisteredSource { adapter, descriptor };

        match self
            .sources
            .iter_mut()
            .find(|s| s.descriptor.name == entry.descriptor.name)
        {
            Some(existing) => *existing = entry,
            None => self.sources.push(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredSource> {
        self.sources.iter().find(|s| s.descriptor.name == name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&SourceDescriptor> {
        self.get(name).map(|s| &s.descriptor)
    }

    /// All sources in registration order
    pub fn sources(&self) -> &[RegisteredSource] {
        &self.sources
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.descriptor.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{SourceError, SourceKind};
    use crate::sources::{RawRecordStream, SourceQuery};
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use tokio_util::sync::CancellationToken;

    struct Empty;

    #[async_trait]
    impl SourceAdapter for Empty {
        fn engine(&self) -> &str {
            "empty"
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Search
        }

        async fn search(
            &self,
            _query: &SourceQuery,
            _cancel: &CancellationToken,
        ) -> Result<RawRecordStream, SourceError> {
            Ok(stream::empty().boxed())
        }
    }

    #[test]
    fn test_registry_order_and_replace() {
        let mut registry = SourceRegistry::new();
        registry.register(
            Arc::new(Empty),
            SourceDescriptor::new("b", SourceKind::Search).with_timeout(5.0),
        );
        registry.register(Arc::new(Empty), SourceDescriptor::new("a", SourceKind::Registry));
        registry.register(
            Arc::new(Empty),
            SourceDescriptor::new("b", SourceKind::Search).with_timeout(50.0),
        );

        assert_eq!(registry.names(), vec!["b", "a"]);
        assert_eq!(registry.descriptor("b").unwrap().timeout, 50.0);
        assert!(registry.descriptor("missing").is_none());
        assert_eq!(registry.descriptor("a").unwrap().priority, 40);
    }
}
