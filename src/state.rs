use std::sync::Arc;
use xkbcommon::xkb::keysyms;
use crate::config::Config;
use crate::executor::{LaunchDispatcher, ProcessLauncher};
use crate::loader::CatalogLoader;
use crate::model::{Catalog, CatalogEntry};
use crate::overlay::{KeyRoute, OverlayController, OverlayHost};
use crate::search::{KeyInput, SearchController};
use crate::sources::CatalogSource;
use crate::ui::layout::{ListLayout, ROW_HEIGHT};

/// Where a pointer press landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerTarget {
    Popup { x: f64, y: f64 },
    Outside,
}

pub struct Launcher {
    pub config: Config,
    pub loader: CatalogLoader,
    pub overlay: OverlayController,
    pub search: SearchController,
    pub dispatcher: LaunchDispatcher,
    /// Snapshot the visible list was built from.
    catalog: Arc<Catalog>,
}

impl Launcher {
    pub fn new(config: Config, source: Box<dyn CatalogSource>, process: Box<dyn ProcessLauncher>) -> Self {
        let loader = CatalogLoader::new(source);
        let catalog = loader.current();
        Self {
            overlay: OverlayController::new(&config.popup),
            dispatcher: LaunchDispatcher::new(process, config.general.terminal.clone()),
            search: SearchController::new(),
            loader,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn open<H: OverlayHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let Some(catalog) = self.overlay.open(host, &mut self.loader) else {
            return false;
        };
        // Populate only after the reload finished; the list never sees a
        // catalog that is still being built.
        self.catalog = catalog;
        self.search.focus_field();
        self.search.refresh(&self.catalog);
        true
    }

    pub fn close<H: OverlayHost + ?Sized>(&mut self, host: &mut H) -> bool {
        self.overlay.close(host)
    }

    pub fn toggle<H: OverlayHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if self.overlay.is_shown() {
            self.close(host)
        } else {
            self.open(host)
        }
    }

    pub fn on_monitors_changed<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        self.overlay.on_monitor_configuration_changed(host);
    }

    pub fn activate<H: OverlayHost + ?Sized>(&mut self, host: &mut H, entry: &CatalogEntry) {
        let catalog = self.catalog.clone();
        // Failures are already logged by the dispatcher.
        let _ = self.dispatcher.launch(entry, &catalog, &mut self.search, &mut self.overlay, host);
    }

    /// Returns whether anything visible changed.
    pub fn handle_key<H: OverlayHost + ?Sized>(&mut self, host: &mut H, key: &KeyInput, layout: &ListLayout) -> bool {
        let catalog = self.catalog.clone();

        match self.overlay.route_key(self.search.has_focus()) {
            KeyRoute::Dropped => return false,
            KeyRoute::SearchField => {
                if self.search.type_ahead(key, &catalog) {
                    return true;
                }
            }
            KeyRoute::PassThrough => {}
        }

        if !key.pressed {
            return false;
        }

        match key.keysym {
            keysyms::KEY_Escape => {
                self.close(host);
            }
            keysyms::KEY_Return | keysyms::KEY_KP_Enter => {
                let target = if self.search.has_focus() {
                    self.search.on_submit()
                } else {
                    self.search.selected_entry()
                };
                if let Some(entry) = target {
                    self.activate(host, &entry);
                }
            }
            keysyms::KEY_Up => {
                self.search.move_selection(-1);
                self.search.follow_selection(ROW_HEIGHT, layout.viewport());
            }
            keysyms::KEY_Down => {
                self.search.move_selection(1);
                self.search.follow_selection(ROW_HEIGHT, layout.viewport());
            }
            _ => return self.search.edit(key, &catalog),
        }
        true
    }

    pub fn handle_pointer_press<H: OverlayHost + ?Sized>(&mut self, host: &mut H, target: PointerTarget, layout: &ListLayout) -> bool {
        match target {
            PointerTarget::Outside => self.overlay.on_pointer_press(host, false),
            PointerTarget::Popup { y, .. } => {
                if !self.overlay.is_shown() {
                    return false;
                }
                if layout.in_search_bar(y) {
                    self.search.focus_field();
                    return true;
                }
                let visible = self.search.visible();
                let Some(row) = layout.row_at(y, self.search.scroll(), visible.len()) else {
                    return false;
                };
                match visible[row].entry().cloned() {
                    Some(entry) => {
                        self.activate(host, &entry);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    pub fn handle_scroll(&mut self, delta: f64, layout: &ListLayout) -> bool {
        if !self.overlay.is_shown() {
            return false;
        }
        let before = self.search.scroll();
        let max = layout.max_scroll(self.search.visible().len());
        self.search.scroll_by(delta as f32, max);
        self.search.scroll() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeConfig;
    use crate::fixtures::{labels_and_names, root, sample_root, FakeHost, HostCall, RecordingLauncher, ScriptedSource};
    use crate::overlay::OverlayState;

    struct Harness {
        launcher: Launcher,
        host: FakeHost,
        recorder: RecordingLauncher,
        layout: ListLayout,
    }

    fn harness() -> Harness {
        let recorder = RecordingLauncher::default();
        let launcher = Launcher::new(
            Config::default(),
            Box::new(ScriptedSource::new(vec![Ok(sample_root())])),
            Box::new(recorder.clone()),
        );
        Harness {
            launcher,
            host: FakeHost::default(),
            recorder,
            layout: ListLayout::new(&ThemeConfig::default(), 600.0),
        }
    }

    fn key(h: &mut Harness, keysym: u32, utf8: Option<&str>) -> bool {
        h.launcher.handle_key(&mut h.host, &KeyInput::press(keysym, utf8), &h.layout)
    }

    fn spawned(h: &Harness) -> Vec<Vec<String>> {
        h.recorder.spawned.borrow().clone()
    }

    #[test]
    fn test_open_populates_full_list() {
        let mut h = harness();
        assert!(h.launcher.catalog().root().is_empty());
        assert!(h.launcher.open(&mut h.host));
        assert_eq!(h.launcher.catalog().sequence(), 1);
        assert_eq!(
            labels_and_names(h.launcher.search.visible()),
            vec!["[Accessories]", "Calculator", "Text Editor", "[System]", "Terminal", "Files", "[Internet]", "Firefox"]
        );
    }

    #[test]
    fn test_typing_then_enter_launches_first_match() {
        let mut h = harness();
        h.launcher.open(&mut h.host);

        assert!(key(&mut h, keysyms::KEY_f, Some("f")));
        assert!(key(&mut h, keysyms::KEY_i, Some("i")));
        assert!(key(&mut h, keysyms::KEY_r, Some("r")));
        assert_eq!(labels_and_names(h.launcher.search.visible()), vec!["[Internet]", "Firefox"]);

        key(&mut h, keysyms::KEY_Return, Some("\r"));
        assert_eq!(spawned(&h), vec![vec!["firefox".to_string()]]);
        assert_eq!(h.launcher.overlay.state(), OverlayState::Hidden);
        assert_eq!(h.launcher.search.text(), "");
    }

    #[test]
    fn test_enter_with_empty_needle_does_nothing() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        key(&mut h, keysyms::KEY_Return, Some("\r"));
        assert!(spawned(&h).is_empty());
        assert!(h.launcher.overlay.is_shown());
    }

    #[test]
    fn test_type_ahead_from_list_focus() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        key(&mut h, keysyms::KEY_Down, None);
        assert!(!h.launcher.search.has_focus());

        assert!(key(&mut h, keysyms::KEY_t, Some("t")));
        assert!(h.launcher.search.has_focus());
        assert_eq!(h.launcher.search.text(), "t");
    }

    #[test]
    fn test_release_forwarded_but_ignored() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        h.launcher.search.focus_list();
        let changed = h.launcher.handle_key(&mut h.host, &KeyInput::release(keysyms::KEY_a), &h.layout);
        assert!(!changed);
        assert_eq!(h.launcher.search.text(), "");
    }

    #[test]
    fn test_arrow_and_enter_launch_selection() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        key(&mut h, keysyms::KEY_Down, None);
        key(&mut h, keysyms::KEY_Down, None);
        // Calculator -> Text Editor -> Terminal
        key(&mut h, keysyms::KEY_Return, Some("\r"));
        assert_eq!(spawned(&h), vec![vec!["terminal".to_string()]]);
    }

    #[test]
    fn test_keys_dropped_while_hidden() {
        let mut h = harness();
        assert!(!key(&mut h, keysyms::KEY_a, Some("a")));
        assert_eq!(h.launcher.search.text(), "");
    }

    #[test]
    fn test_escape_closes() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        key(&mut h, keysyms::KEY_Escape, None);
        assert_eq!(h.launcher.overlay.state(), OverlayState::Hidden);
        assert_eq!(h.host.count(&HostCall::Release), 1);
    }

    #[test]
    fn test_click_row_launches() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        // Row 2 is "Text Editor": list starts at 50, rows are 30 high.
        let target = PointerTarget::Popup { x: 40.0, y: 50.0 + 2.5 * 30.0 };
        assert!(h.launcher.handle_pointer_press(&mut h.host, target, &h.layout));
        assert_eq!(spawned(&h), vec![vec!["text-editor".to_string()]]);
    }

    #[test]
    fn test_click_label_does_nothing() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        let target = PointerTarget::Popup { x: 40.0, y: 55.0 };
        assert!(!h.launcher.handle_pointer_press(&mut h.host, target, &h.layout));
        assert!(h.launcher.overlay.is_shown());
    }

    #[test]
    fn test_click_search_bar_focuses_field() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        h.launcher.search.focus_list();
        let target = PointerTarget::Popup { x: 40.0, y: 25.0 };
        assert!(h.launcher.handle_pointer_press(&mut h.host, target, &h.layout));
        assert!(h.launcher.search.has_focus());
    }

    #[test]
    fn test_outside_click_closes() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        assert!(h.launcher.handle_pointer_press(&mut h.host, PointerTarget::Outside, &h.layout));
        assert!(!h.launcher.overlay.is_shown());
        assert!(spawned(&h).is_empty());
    }

    #[test]
    fn test_toggle() {
        let mut h = harness();
        assert!(h.launcher.toggle(&mut h.host));
        assert!(h.launcher.overlay.is_shown());
        assert!(h.launcher.toggle(&mut h.host));
        assert!(!h.launcher.overlay.is_shown());
    }

    #[test]
    fn test_reopen_keeps_needle_against_new_catalog() {
        let recorder = RecordingLauncher::default();
        let mut launcher = Launcher::new(
            Config::default(),
            Box::new(ScriptedSource::new(vec![Ok(sample_root()), Ok(root(Vec::new()))])),
            Box::new(recorder),
        );
        let mut host = FakeHost::default();
        launcher.open(&mut host);
        let catalog = launcher.catalog().clone();
        launcher.search.on_text_changed("term", &catalog);

        // Refresh while shown: new (empty) catalog, same needle, same geometry.
        let geometry = launcher.overlay.geometry();
        launcher.open(&mut host);
        assert_eq!(launcher.catalog().sequence(), 2);
        assert_eq!(launcher.search.needle(), "term");
        assert!(launcher.search.visible().is_empty());
        assert_eq!(launcher.overlay.geometry(), geometry);
    }

    #[test]
    fn test_scroll_sets_shadow() {
        let mut h = harness();
        h.launcher.open(&mut h.host);
        let small = ListLayout::new(&ThemeConfig::default(), 150.0);
        assert!(h.launcher.handle_scroll(20.0, &small));
        assert!(h.launcher.search.scrolled_shadow());
        assert!(h.launcher.handle_scroll(-100.0, &small));
        assert!(!h.launcher.search.scrolled_shadow());
        assert!(!h.launcher.handle_scroll(-1.0, &small));
    }
}
