use crate::model::{Catalog, CatalogGroup, CatalogNode, VisibleItem};

/// Lower-cased search needle. An empty needle matches every displayable entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    needle: String,
}

impl FilterState {
    pub fn new(text: &str) -> Self {
        Self {
            needle: text.to_lowercase(),
        }
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    fn matches(&self, name: &str) -> bool {
        self.needle.is_empty() || name.to_lowercase().contains(&self.needle)
    }
}

/// Prune `catalog` down to the entries whose display name contains `needle`
/// (case-insensitive), keeping source order. Group labels survive only when
/// something below them does.
pub fn filter(catalog: &Catalog, needle: &str) -> Vec<VisibleItem> {
    let state = FilterState::new(needle);
    let (items, count) = filter_group(catalog.root(), &state, 0);
    log::debug!(
        "filter: catalog #{} needle='{}' -> {} entries, {} items",
        catalog.sequence(),
        state.needle(),
        count,
        items.len()
    );
    items
}

/// Returns the visible items under `group` (its own label excluded) and the
/// number of entry rows among them.
fn filter_group(group: &CatalogGroup, state: &FilterState, depth: usize) -> (Vec<VisibleItem>, usize) {
    let mut items = Vec::new();
    let mut count = 0;

    for child in &group.children {
        match child {
            CatalogNode::Entry(entry) => {
                if entry.hidden || !state.matches(&entry.name) {
                    continue;
                }
                items.push(VisibleItem::EntryRow(entry.clone()));
                count += 1;
            }
            CatalogNode::Group(sub) => {
                let (sub_items, sub_count) = filter_group(sub, state, depth + 1);
                if sub_count == 0 {
                    continue;
                }
                items.push(VisibleItem::GroupLabel {
                    name: sub.name.clone(),
                    depth,
                });
                items.extend(sub_items);
                count += sub_count;
            }
        }
    }

    (items, count)
}

/// First entry row in depth-first order.
pub fn first_entry(items: &[VisibleItem]) -> Option<&VisibleItem> {
    items.iter().find(|item| item.entry().is_some())
}
