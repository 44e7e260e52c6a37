//! Catalog builders and recording fakes shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::error::{LauncherError, Result};
use crate::executor::ProcessLauncher;
use crate::model::{Catalog, CatalogEntry, CatalogGroup, CatalogNode, PopupGeometry, Rect, VisibleItem};
use crate::overlay::{MonitorGeometryProvider, ScreenDimEffect, SurfaceBackend};
use crate::sources::CatalogSource;

pub fn app(name: &str) -> CatalogEntry {
    let slug = name.to_lowercase().replace(' ', "-");
    CatalogEntry::new(format!("{slug}.desktop"), name, vec![slug])
}

pub fn entry(name: &str) -> CatalogNode {
    CatalogNode::Entry(Arc::new(app(name)))
}

pub fn hidden(name: &str) -> CatalogNode {
    CatalogNode::Entry(Arc::new(app(name).hidden(true)))
}

pub fn group(name: &str, children: Vec<CatalogNode>) -> CatalogNode {
    CatalogNode::Group(CatalogGroup {
        name: name.to_string(),
        children,
    })
}

pub fn root(children: Vec<CatalogNode>) -> CatalogGroup {
    CatalogGroup {
        name: crate::model::ROOT_GROUP_NAME.to_string(),
        children,
    }
}

pub fn catalog(children: Vec<CatalogNode>) -> Catalog {
    Catalog::new(root(children), 1)
}

/// Accessories: Calculator, Text Editor, (hidden) Hidden Helper
/// System: Terminal, Files
/// Internet: Firefox
pub fn sample_root() -> CatalogGroup {
    root(vec![
        group(
            "Accessories",
            vec![entry("Calculator"), entry("Text Editor"), hidden("Hidden Helper")],
        ),
        group("System", vec![entry("Terminal"), entry("Files")]),
        group("Internet", vec![entry("Firefox")]),
    ])
}

pub fn sample_catalog() -> Catalog {
    Catalog::new(sample_root(), 1)
}

/// Group labels as `[name]`, entry rows as their display name.
pub fn labels_and_names(items: &[VisibleItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            VisibleItem::GroupLabel { name, .. } => format!("[{name}]"),
            VisibleItem::EntryRow(entry) => entry.name.clone(),
        })
        .collect()
}

/// Source returning a scripted sequence of results, repeating the last one.
pub struct ScriptedSource {
    results: Mutex<Vec<std::result::Result<CatalogGroup, String>>>,
}

impl ScriptedSource {
    pub fn new(results: Vec<std::result::Result<CatalogGroup, String>>) -> Self {
        Self {
            results: Mutex::new(results),
        }
    }
}

impl CatalogSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn load(&self) -> Result<CatalogGroup> {
        let mut results = self.results.lock().map_err(|e| LauncherError::Source(e.to_string()))?;
        let next = if results.len() > 1 {
            results.remove(0)
        } else {
            results.first().cloned().unwrap_or_else(|| Ok(CatalogGroup::default()))
        };
        next.map_err(LauncherError::Source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Show(PopupGeometry),
    Apply(PopupGeometry),
    Hide,
    Grab,
    Release,
    Focus,
    DimBegin,
    DimEnd,
}

/// Records every call the overlay makes into the host.
pub struct FakeHost {
    pub monitor: Option<Rect>,
    pub panel_height: u32,
    pub focus_fails: bool,
    pub grab_fails: bool,
    pub calls: Vec<HostCall>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            monitor: Some(Rect::new(0, 0, 1920, 1080)),
            panel_height: 48,
            focus_fails: false,
            grab_fails: false,
            calls: Vec::new(),
        }
    }
}

impl FakeHost {
    pub fn count(&self, call: &HostCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl MonitorGeometryProvider for FakeHost {
    fn active_monitor_rect(&self) -> Option<Rect> {
        self.monitor
    }

    fn reserved_panel_height(&self) -> u32 {
        self.panel_height
    }
}

impl ScreenDimEffect for FakeHost {
    fn begin(&mut self) {
        self.calls.push(HostCall::DimBegin);
    }

    fn end(&mut self) {
        self.calls.push(HostCall::DimEnd);
    }
}

impl SurfaceBackend for FakeHost {
    fn show(&mut self, geometry: PopupGeometry) {
        self.calls.push(HostCall::Show(geometry));
    }

    fn apply_geometry(&mut self, geometry: PopupGeometry) {
        self.calls.push(HostCall::Apply(geometry));
    }

    fn hide(&mut self) {
        self.calls.push(HostCall::Hide);
    }

    fn grab_pointer(&mut self) -> Result<()> {
        self.calls.push(HostCall::Grab);
        if self.grab_fails {
            return Err(LauncherError::CaptureUnavailable("no pointer".to_string()));
        }
        Ok(())
    }

    fn release_pointer(&mut self) {
        self.calls.push(HostCall::Release);
    }

    fn request_keyboard_focus(&mut self) -> Result<()> {
        self.calls.push(HostCall::Focus);
        if self.focus_fails {
            return Err(LauncherError::FocusUnavailable("no keyboard".to_string()));
        }
        Ok(())
    }
}

/// Process launcher that remembers argv lists instead of spawning.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    pub spawned: Rc<RefCell<Vec<Vec<String>>>>,
    pub fail: bool,
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn_detached(&self, argv: &[String]) -> Result<()> {
        self.spawned.borrow_mut().push(argv.to_vec());
        if self.fail {
            return Err(LauncherError::Spawn {
                command: argv.join(" "),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        Ok(())
    }
}
