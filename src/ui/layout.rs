use crate::config::ThemeConfig;

pub const ROW_HEIGHT: f32 = 30.0;
pub const SEARCH_HEIGHT: f32 = 20.0;

/// Vertical layout of the popup: search bar on top, list below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListLayout {
    pub padding: f32,
    pub list_top: f32,
    pub list_bottom: f32,
}

impl ListLayout {
    pub fn new(theme: &ThemeConfig, height: f32) -> Self {
        let list_top = theme.padding + SEARCH_HEIGHT + theme.spacing;
        Self {
            padding: theme.padding,
            list_top,
            list_bottom: (height - theme.padding).max(list_top),
        }
    }

    pub fn viewport(&self) -> f32 {
        self.list_bottom - self.list_top
    }

    pub fn max_scroll(&self, rows: usize) -> f32 {
        (rows as f32 * ROW_HEIGHT - self.viewport()).max(0.0)
    }

    pub fn in_search_bar(&self, y: f64) -> bool {
        (y as f32) < self.list_top
    }

    /// Index of the row under `y`, given the list's scroll offset.
    pub fn row_at(&self, y: f64, scroll: f32, rows: usize) -> Option<usize> {
        let y = y as f32;
        if y < self.list_top || y >= self.list_bottom {
            return None;
        }
        let index = ((y - self.list_top + scroll) / ROW_HEIGHT) as usize;
        (index < rows).then_some(index)
    }

    /// Top of `row` in surface coordinates.
    pub fn row_y(&self, row: usize, scroll: f32) -> f32 {
        self.list_top + row as f32 * ROW_HEIGHT - scroll
    }
}
