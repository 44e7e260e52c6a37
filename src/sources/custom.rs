use crate::config::{StaticEntry, StaticGroup};
use crate::error::Result;
use crate::model::{CatalogEntry, CatalogGroup, ROOT_GROUP_NAME};
use crate::sources::CatalogSource;
use log::{info, warn};

/// Groups declared under `[[catalog.groups]]` in the config file.
pub struct ConfigSource {
    groups: Vec<StaticGroup>,
}

impl ConfigSource {
    pub fn new(groups: Vec<StaticGroup>) -> Self {
        Self { groups }
    }
}

impl CatalogSource for ConfigSource {
    fn name(&self) -> &str {
        "config"
    }

    fn load(&self) -> Result<CatalogGroup> {
        let mut root = CatalogGroup::new(ROOT_GROUP_NAME);
        for group in &self.groups {
            root.push_group(build_group(group, ""));
        }
        info!("ConfigSource: found {} entries", root.entries().len());
        Ok(root)
    }
}

fn build_group(group: &StaticGroup, parent_path: &str) -> CatalogGroup {
    let path = if parent_path.is_empty() {
        group.name.clone()
    } else {
        format!("{}/{}", parent_path, group.name)
    };

    let mut out = CatalogGroup::new(group.name.clone());
    for item in &group.items {
        if let Some(entry) = build_entry(item, &path) {
            out.push_entry(entry);
        }
    }
    for sub in &group.groups {
        out.push_group(build_group(sub, &path));
    }
    out
}

fn build_entry(item: &StaticEntry, path: &str) -> Option<CatalogEntry> {
    let argv = shlex::split(&item.command).filter(|argv| !argv.is_empty());
    let Some(argv) = argv else {
        warn!("Skipping '{}' in {}: unusable command {:?}", item.name, path, item.command);
        return None;
    };
    let mut entry = CatalogEntry::new(format!("custom:{}/{}", path, item.name), item.name.clone(), argv)
        .hidden(item.hidden);
    entry.icon = item.icon.clone();
    entry.terminal = item.terminal;
    Some(entry)
}
