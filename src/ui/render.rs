use tiny_skia::{Color, Paint, PathBuilder, PixmapMut, PixmapPaint, Rect, Stroke, Transform};
use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, SwashCache};
use crate::config::ThemeConfig;
use crate::model::VisibleItem;
use crate::state::Launcher;
use crate::ui::icons::{IconCache, IconReply};
use crate::ui::layout::{ListLayout, ROW_HEIGHT, SEARCH_HEIGHT};

const ICON_SIZE: u32 = 22;
const ICON_GAP: f32 = 10.0;
const INDENT: f32 = 14.0;
const SHADOW_DEPTH: f32 = 6.0;

pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    pub icon_cache: IconCache,
}

impl Renderer {
    pub fn new(icon_cache: IconCache) -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            icon_cache,
        }
    }

    pub fn insert_icon(&mut self, reply: IconReply) {
        self.icon_cache.insert(reply);
    }

    pub fn draw(&mut self, pixmap: &mut PixmapMut, launcher: &Launcher) {
        let theme = &launcher.config.theme;
        let search = &launcher.search;
        let layout = ListLayout::new(theme, pixmap.height() as f32);

        let bg_color = ThemeConfig::parse_color(&theme.background);
        let border_color = ThemeConfig::parse_color(&theme.border_color);
        let text_color = ThemeConfig::parse_color(&theme.text);
        let group_color = ThemeConfig::parse_color(&theme.group_text);
        let sel_bg_color = ThemeConfig::parse_color(&theme.selection_background);
        let sel_text_color = ThemeConfig::parse_color(&theme.selection_text);

        pixmap.fill(Color::TRANSPARENT);
        let width = pixmap.width() as f32;
        let height = pixmap.height() as f32;

        if let Some(rect) = Rect::from_xywh(0.0, 0.0, width, height) {
            self.draw_rounded_rect(pixmap, rect, theme.border_radius, bg_color, Some(border_color));
        }

        // List first; the search bar is painted over anything scrolled under it.
        let items = search.visible();
        let indents = row_indents(items);
        let highlighted = highlighted_row(launcher);

        for (i, item) in items.iter().enumerate() {
            let y = layout.row_y(i, search.scroll());
            if y + ROW_HEIGHT <= layout.list_top || y >= layout.list_bottom {
                continue;
            }
            let mut x = theme.padding + indents[i] as f32 * INDENT;
            let text_y = y + (ROW_HEIGHT - 16.0) / 2.0;

            match item {
                VisibleItem::GroupLabel { name, .. } => {
                    self.draw_text(pixmap, name, x, text_y, 14.0, group_color);
                }
                VisibleItem::EntryRow(entry) => {
                    let mut color = text_color;
                    if highlighted == Some(i) {
                        if let Some(sel_rect) = Rect::from_xywh(theme.padding / 2.0, y, width - theme.padding, ROW_HEIGHT) {
                            self.draw_rounded_rect(pixmap, sel_rect, theme.border_radius / 2.0, sel_bg_color, None);
                        }
                        color = sel_text_color;
                    }

                    if let Some(icon) = self.icon_cache.get(entry.icon.as_deref(), ICON_SIZE) {
                        let icon_y = (y + (ROW_HEIGHT - ICON_SIZE as f32) / 2.0) as i32;
                        pixmap.draw_pixmap(x as i32, icon_y, icon.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
                    }
                    x += ICON_SIZE as f32 + ICON_GAP;
                    self.draw_text(pixmap, &entry.name, x, text_y, 16.0, color);
                }
            }
        }

        if items.is_empty() {
            self.draw_text(pixmap, "No results", theme.padding, layout.list_top, 16.0, Color::from_rgba8(150, 100, 100, 255));
        }

        self.draw_search_bar(pixmap, launcher, &layout, bg_color, text_color);
    }

    fn draw_search_bar(&mut self, pixmap: &mut PixmapMut, launcher: &Launcher, layout: &ListLayout, bg: Color, text_color: Color) {
        let theme = &launcher.config.theme;
        let search = &launcher.search;
        let width = pixmap.width() as f32;

        if let Some(band) = Rect::from_xywh(1.0, 1.0, width - 2.0, layout.list_top - 1.0) {
            let mut paint = Paint::default();
            paint.set_color(bg);
            pixmap.fill_rect(band, &paint, Transform::identity(), None);
        }

        let (label, color) = match search_label(launcher) {
            Some(label) => (label, text_color),
            None => ("Search...".to_string(), Color::from_rgba8(100, 100, 100, 255)),
        };
        self.draw_text(pixmap, &label, theme.padding, theme.padding, SEARCH_HEIGHT, color);

        if search.scrolled_shadow() {
            draw_shadow(pixmap, layout.list_top, width);
        }
    }

    /// The full-screen surface behind the popup.
    pub fn draw_dim(&self, pixmap: &mut PixmapMut, theme: &ThemeConfig) {
        pixmap.fill(ThemeConfig::parse_color(&theme.dim));
    }

    fn draw_rounded_rect(&self, pixmap: &mut PixmapMut, rect: Rect, radius: f32, fill: Color, stroke: Option<Color>) {
        let mut pb = PathBuilder::new();
        let x = rect.left();
        let y = rect.top();
        let w = rect.width();
        let h = rect.height();

        pb.move_to(x + radius, y);
        pb.line_to(x + w - radius, y);
        pb.quad_to(x + w, y, x + w, y + radius);
        pb.line_to(x + w, y + h - radius);
        pb.quad_to(x + w, y + h, x + w - radius, y + h);
        pb.line_to(x + radius, y + h);
        pb.quad_to(x, y + h, x, y + h - radius);
        pb.line_to(x, y + radius);
        pb.quad_to(x, y, x + radius, y);
        pb.close();

        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            paint.set_color(fill);
            paint.anti_alias = true;
            pixmap.fill_path(&path, &paint, tiny_skia::FillRule::Winding, Transform::identity(), None);

            if let Some(s_color) = stroke {
                let mut s_paint = Paint::default();
                s_paint.set_color(s_color);
                s_paint.anti_alias = true;
                let stroke_obj = Stroke { width: 1.5, ..Default::default() };
                pixmap.stroke_path(&path, &s_paint, &stroke_obj, Transform::identity(), None);
            }
        }
    }

    fn draw_text(&mut self, pixmap: &mut PixmapMut, text: &str, x: f32, y: f32, size: f32, color: Color) {
        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(size, size));
        buffer.set_size(&mut self.font_system, Some(pixmap.width() as f32 - x), None);
        buffer.set_text(&mut self.font_system, text, Attrs::new(), cosmic_text::Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let text_color = cosmic_text::Color::rgba(
            (color.red() * 255.0) as u8,
            (color.green() * 255.0) as u8,
            (color.blue() * 255.0) as u8,
            (color.alpha() * 255.0) as u8,
        );

        buffer.draw(&mut self.font_system, &mut self.swash_cache, text_color, |draw_x, draw_y, w, h, color| {
            let draw_x = draw_x + x as i32;
            let draw_y = draw_y + y as i32;
            if w == 0 || h == 0 { return; }
            if draw_x >= 0 && draw_y >= 0 && draw_x < pixmap.width() as i32 && draw_y < pixmap.height() as i32 {
                let paint = Paint {
                    shader: tiny_skia::Shader::SolidColor(Color::from_rgba8(color.r(), color.g(), color.b(), color.a())),
                    ..Paint::default()
                };
                if let Some(r) = Rect::from_xywh(draw_x as f32, draw_y as f32, w as f32, h as f32) {
                    pixmap.fill_rect(r, &paint, Transform::identity(), None);
                }
            }
        });
    }
}

/// Fading band under the search bar, shown once the list is scrolled.
fn draw_shadow(pixmap: &mut PixmapMut, top: f32, width: f32) {
    for step in 0..SHADOW_DEPTH as u32 {
        let alpha = 90 - (step * 90 / SHADOW_DEPTH as u32);
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(0, 0, 0, alpha as u8));
        if let Some(line) = Rect::from_xywh(1.0, top + step as f32, width - 2.0, 1.0) {
            pixmap.fill_rect(line, &paint, Transform::identity(), None);
        }
    }
}

/// What the search bar shows, `None` for the placeholder. The caret only
/// appears while keystrokes actually reach the field.
fn search_label(launcher: &Launcher) -> Option<String> {
    let search = &launcher.search;
    if search.text().is_empty() {
        None
    } else if search.has_focus() && launcher.overlay.keyboard_focused() {
        Some(format!("{}|", search.text()))
    } else {
        Some(search.text().to_string())
    }
}

/// Row that gets the selection highlight: the Enter target while typing,
/// the keyboard selection once the list has focus.
fn highlighted_row(launcher: &Launcher) -> Option<usize> {
    let search = &launcher.search;
    if search.has_focus() && search.needle().is_empty() {
        return None;
    }
    search.selected_position()
}

/// Indentation level per visible row. Entries sit one level below the
/// label they follow.
fn row_indents(items: &[VisibleItem]) -> Vec<usize> {
    let mut current = 0;
    items
        .iter()
        .map(|item| match item {
            VisibleItem::GroupLabel { depth, .. } => {
                current = depth + 1;
                *depth
            }
            VisibleItem::EntryRow(_) => current,
        })
        .collect()
}
