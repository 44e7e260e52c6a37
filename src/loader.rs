use crate::model::Catalog;
use crate::sources::CatalogSource;
use log::{error, info, warn};
use std::sync::Arc;

/// Owns the current catalog snapshot.
///
/// A reload builds the new tree completely before it replaces the shared
/// snapshot, so `current()` only ever hands out whole catalogs. Readers that
/// cloned the previous `Arc` keep it alive until they drop it.
pub struct CatalogLoader {
    source: Box<dyn CatalogSource>,
    current: Arc<Catalog>,
    next_sequence: u64,
}

impl CatalogLoader {
    pub fn new(source: Box<dyn CatalogSource>) -> Self {
        Self {
            source,
            current: Arc::new(Catalog::empty(0)),
            next_sequence: 1,
        }
    }

    pub fn current(&self) -> Arc<Catalog> {
        self.current.clone()
    }

    /// Blocks on the source. Failures degrade to an empty catalog.
    pub fn reload(&mut self) -> Arc<Catalog> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let catalog = match self.source.load() {
            Ok(root) => {
                if root.is_empty() {
                    warn!("Catalog source '{}' returned nothing", self.source.name());
                }
                Catalog::new(root, sequence)
            }
            Err(e) => {
                error!("Failed to load catalog from '{}': {}", self.source.name(), e);
                Catalog::empty(sequence)
            }
        };

        self.current = Arc::new(catalog);
        info!(
            "Catalog #{} loaded: {} entries",
            sequence,
            self.current.root().entries().len()
        );
        self.current.clone()
    }
}
