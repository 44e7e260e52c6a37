use crate::error::{LauncherError, Result};
use crate::model::{CatalogGroup, CatalogNode, ROOT_GROUP_NAME};
use log::{debug, warn};
use regex::Regex;
use std::sync::Arc;

pub mod custom;
pub mod desktop;

/// Supplies the application tree. Synchronous; may block on disk.
pub trait CatalogSource {
    fn name(&self) -> &str;
    fn load(&self) -> Result<CatalogGroup>;
}

/// Concatenates the top-level children of several sources, in order.
pub struct CompositeSource {
    sources: Vec<Box<dyn CatalogSource>>,
    hide: Vec<Regex>,
}

impl CompositeSource {
    pub fn new(sources: Vec<Box<dyn CatalogSource>>) -> Self {
        Self { sources, hide: Vec::new() }
    }

    pub fn with_hide_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.hide = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| LauncherError::HidePattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }
}

impl CatalogSource for CompositeSource {
    fn name(&self) -> &str {
        "composite"
    }

    fn load(&self) -> Result<CatalogGroup> {
        let mut root = CatalogGroup::new(ROOT_GROUP_NAME);
        let mut failures = Vec::new();

        for source in &self.sources {
            match source.load() {
                Ok(group) => {
                    debug!("{}: {} top-level nodes", source.name(), group.children.len());
                    root.children.extend(group.children);
                }
                Err(e) => {
                    warn!("Catalog source '{}' failed: {}", source.name(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        if !self.sources.is_empty() && failures.len() == self.sources.len() {
            return Err(LauncherError::Source(failures.join("; ")));
        }

        if !self.hide.is_empty() {
            apply_hide_patterns(&mut root, &self.hide);
        }
        Ok(root)
    }
}

fn apply_hide_patterns(group: &mut CatalogGroup, patterns: &[Regex]) {
    for child in group.children.iter_mut() {
        match child {
            CatalogNode::Entry(entry) => {
                if !entry.hidden && patterns.iter().any(|re| re.is_match(&entry.name) || re.is_match(&entry.id)) {
                    *entry = Arc::new((**entry).clone().hidden(true));
                }
            }
            CatalogNode::Group(sub) => apply_hide_patterns(sub, patterns),
        }
    }
}
