use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,            // Stable key (e.g. "firefox.desktop" or "custom:Tools/htop")
    pub name: String,          // Display name
    pub argv: Vec<String>,     // Program and arguments, already unquoted
    pub icon: Option<String>,  // Icon name/path
    pub terminal: bool,
    pub hidden: bool,          // NoDisplay/Hidden, never listed
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            argv,
            icon: None,
            terminal: false,
            hidden: false,
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogNode {
    Entry(Arc<CatalogEntry>),
    Group(CatalogGroup),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogGroup {
    pub name: String,
    pub children: Vec<CatalogNode>,
}

impl CatalogGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn push_entry(&mut self, entry: CatalogEntry) {
        self.children.push(CatalogNode::Entry(Arc::new(entry)));
    }

    pub fn push_group(&mut self, group: CatalogGroup) {
        self.children.push(CatalogNode::Group(group));
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every entry in the subtree, depth-first, hidden ones included.
    pub fn entries(&self) -> Vec<&Arc<CatalogEntry>> {
        let mut out = Vec::new();
        self.collect_entries(&mut out);
        out
    }

    fn collect_entries<'a>(&'a self, out: &mut Vec<&'a Arc<CatalogEntry>>) {
        for child in &self.children {
            match child {
                CatalogNode::Entry(entry) => out.push(entry),
                CatalogNode::Group(group) => group.collect_entries(out),
            }
        }
    }
}

/// One loaded snapshot of the application tree. Never mutated after
/// construction; a reload builds a new one.
#[derive(Debug, PartialEq, Eq)]
pub struct Catalog {
    root: CatalogGroup,
    sequence: u64,
}

impl Catalog {
    pub fn new(root: CatalogGroup, sequence: u64) -> Self {
        Self { root, sequence }
    }

    pub fn empty(sequence: u64) -> Self {
        Self::new(CatalogGroup::new(ROOT_GROUP_NAME), sequence)
    }

    pub fn root(&self) -> &CatalogGroup {
        &self.root
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

pub const ROOT_GROUP_NAME: &str = "Applications";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleItem {
    GroupLabel { name: String, depth: usize },
    EntryRow(Arc<CatalogEntry>),
}

impl VisibleItem {
    pub fn entry(&self) -> Option<&Arc<CatalogEntry>> {
        match self {
            VisibleItem::EntryRow(entry) => Some(entry),
            VisibleItem::GroupLabel { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x as f64
            && py >= self.y as f64
            && px < self.x as f64 + self.width as f64
            && py < self.y as f64 + self.height as f64
    }
}

/// Where the popup sits: inside `monitor`, clear of the panel band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub monitor: Rect,
    pub popup: Rect,
}

impl PopupGeometry {
    /// Offset of the popup from the monitor's top-left corner, as layer-shell
    /// margins want it.
    pub fn margins(&self) -> (i32, i32) {
        (self.popup.x - self.monitor.x, self.popup.y - self.monitor.y)
    }
}
