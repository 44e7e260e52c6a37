use crate::filter::{filter, first_entry, FilterState};
use crate::model::{Catalog, CatalogEntry, VisibleItem};
use std::sync::Arc;
use xkbcommon::xkb::keysyms;

/// Scroll distance past which the search bar draws its shadow.
pub const SHADOW_SCROLL_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub keysym: u32,
    pub utf8: Option<String>,
    pub pressed: bool,
}

impl KeyInput {
    pub fn press(keysym: u32, utf8: Option<&str>) -> Self {
        Self {
            keysym,
            utf8: utf8.map(str::to_string),
            pressed: true,
        }
    }

    pub fn release(keysym: u32) -> Self {
        Self {
            keysym,
            utf8: None,
            pressed: false,
        }
    }

    /// Text this key would insert, if any.
    pub fn printable(&self) -> Option<&str> {
        self.utf8
            .as_deref()
            .filter(|s| !s.is_empty() && !s.chars().any(|c| c.is_control()))
    }
}

/// Owns the search field and the list it drives.
pub struct SearchController {
    text: String,
    filter: FilterState,
    field_focused: bool,
    visible: Vec<VisibleItem>,
    selected: usize,
    scroll: f32,
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchController {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            filter: FilterState::default(),
            field_focused: true,
            visible: Vec::new(),
            selected: 0,
            scroll: 0.0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn needle(&self) -> &str {
        self.filter.needle()
    }

    pub fn visible(&self) -> &[VisibleItem] {
        &self.visible
    }

    pub fn has_focus(&self) -> bool {
        self.field_focused
    }

    pub fn focus_field(&mut self) {
        self.field_focused = true;
    }

    pub fn focus_list(&mut self) {
        self.field_focused = false;
    }

    /// The field's text changed: re-filter and rebuild the whole list.
    pub fn on_text_changed(&mut self, text: &str, catalog: &Catalog) {
        self.text = text.to_string();
        self.filter = FilterState::new(text);
        self.rebuild(catalog);
    }

    /// Re-run the current needle, e.g. against a freshly loaded catalog.
    pub fn refresh(&mut self, catalog: &Catalog) {
        self.rebuild(catalog);
    }

    pub fn clear(&mut self, catalog: &Catalog) {
        self.on_text_changed("", catalog);
    }

    /// Enter in the field: the first entry row, provided something was typed
    /// and the field has focus.
    pub fn on_submit(&self) -> Option<Arc<CatalogEntry>> {
        if self.filter.is_empty() || !self.field_focused {
            return None;
        }
        first_entry(&self.visible).and_then(|item| item.entry()).cloned()
    }

    /// Key delivered while the field is unfocused. Printable presses start a
    /// search: the field takes focus and the text is appended. Anything else is
    /// left for normal handling.
    pub fn type_ahead(&mut self, key: &KeyInput, catalog: &Catalog) -> bool {
        if !key.pressed {
            return false;
        }
        let Some(text) = key.printable() else { return false };
        let text = text.to_string();
        self.field_focused = true;
        self.insert(&text, catalog);
        true
    }

    /// Editing keys for the focused field.
    pub fn edit(&mut self, key: &KeyInput, catalog: &Catalog) -> bool {
        if !key.pressed || !self.field_focused {
            return false;
        }
        if key.keysym == keysyms::KEY_BackSpace {
            let mut text = self.text.clone();
            if text.pop().is_some() {
                self.on_text_changed(&text, catalog);
            }
            return true;
        }
        match key.printable() {
            Some(text) => {
                let text = text.to_string();
                self.insert(&text, catalog);
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, text: &str, catalog: &Catalog) {
        let mut new_text = self.text.clone();
        new_text.push_str(text);
        self.on_text_changed(&new_text, catalog);
    }

    fn rebuild(&mut self, catalog: &Catalog) {
        self.visible = filter(catalog, self.filter.needle());
        self.selected = 0;
        self.scroll = 0.0;
    }

    /// Positions of entry rows inside `visible()`.
    pub fn entry_positions(&self) -> Vec<usize> {
        self.visible
            .iter()
            .enumerate()
            .filter(|(_, item)| item.entry().is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Index into `visible()` of the highlighted row.
    pub fn selected_position(&self) -> Option<usize> {
        self.entry_positions().get(self.selected).copied()
    }

    pub fn selected_entry(&self) -> Option<Arc<CatalogEntry>> {
        let position = self.selected_position()?;
        self.visible[position].entry().cloned()
    }

    /// Wrapping move over entry rows; the list takes focus.
    pub fn move_selection(&mut self, delta: i32) {
        self.field_focused = false;
        let len = self.entry_positions().len() as i32;
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected as i32 + delta).rem_euclid(len) as usize;
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn scroll_by(&mut self, delta: f32, max_scroll: f32) {
        self.scroll = (self.scroll + delta).clamp(0.0, max_scroll.max(0.0));
    }

    /// Scroll just enough for the selected row to fit in `viewport`.
    pub fn follow_selection(&mut self, row_height: f32, viewport: f32) {
        let Some(position) = self.selected_position() else { return };
        let top = position as f32 * row_height;
        let bottom = top + row_height;
        if top < self.scroll {
            self.scroll = top;
        } else if bottom > self.scroll + viewport {
            self.scroll = bottom - viewport;
        }
    }

    pub fn scrolled_shadow(&self) -> bool {
        self.scroll > SHADOW_SCROLL_THRESHOLD
    }
}
