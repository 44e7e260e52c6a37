use serde::Deserialize;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use anyhow::Result;
use std::fs;
use tiny_skia::Color;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub terminal: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_true")]
    pub desktop: bool,
    /// Regexes over name or id; matches are marked hidden.
    #[serde(default)]
    pub hide: Vec<String>,
    #[serde(default)]
    pub groups: Vec<StaticGroup>,
}

fn default_true() -> bool { true }

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            hide: Vec::new(),
            groups: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct StaticGroup {
    pub name: String,
    #[serde(default)]
    pub items: Vec<StaticEntry>,
    #[serde(default)]
    pub groups: Vec<StaticGroup>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StaticEntry {
    pub name: String,
    pub command: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PanelEdge {
    Top,
    #[default]
    Bottom,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PopupConfig {
    #[serde(default = "default_panel_height")]
    pub panel_height: u32,
    #[serde(default)]
    pub panel_edge: PanelEdge,
    #[serde(default = "default_width_divisor")]
    pub width_divisor: u32,
    #[serde(default)]
    pub output: Option<String>,
}

fn default_panel_height() -> u32 { 48 }
fn default_width_divisor() -> u32 { 6 }

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            panel_height: default_panel_height(),
            panel_edge: PanelEdge::default(),
            width_divisor: default_width_divisor(),
            output: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ThemeConfig {
    #[serde(default = "default_padding")]
    pub padding: f32,
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    #[serde(default = "default_border_radius")]
    pub border_radius: f32,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_group_text")]
    pub group_text: String,
    #[serde(default = "default_selection_background")]
    pub selection_background: String,
    #[serde(default = "default_selection_text")]
    pub selection_text: String,
    #[serde(default = "default_dim")]
    pub dim: String,
    #[serde(default = "default_fallback_icon")]
    pub fallback_icon: String,
}

fn default_padding() -> f32 { 20.0 }
fn default_spacing() -> f32 { 10.0 }
fn default_border_radius() -> f32 { 12.0 }
fn default_background() -> String { "1e1e1eff".to_string() }
fn default_border_color() -> String { "3c3c50ff".to_string() }
fn default_text() -> String { "c8c8c8ff".to_string() }
fn default_group_text() -> String { "8c8ca0ff".to_string() }
fn default_selection_background() -> String { "3c3c50ff".to_string() }
fn default_selection_text() -> String { "ffffffff".to_string() }
fn default_dim() -> String { "00000080".to_string() }
fn default_fallback_icon() -> String { "application-x-executable".to_string() }

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            spacing: default_spacing(),
            border_radius: default_border_radius(),
            background: default_background(),
            border_color: default_border_color(),
            text: default_text(),
            group_text: default_group_text(),
            selection_background: default_selection_background(),
            selection_text: default_selection_text(),
            dim: default_dim(),
            fallback_icon: default_fallback_icon(),
        }
    }
}

impl ThemeConfig {
    pub fn parse_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 8 {
            return Color::BLACK;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
        let a = u8::from_str_radix(&hex[6..8], 16).unwrap_or(255);

        Color::from_rgba8(r, g, b, a)
    }
}

pub fn default_config_path() -> PathBuf {
    match ProjectDirs::from("org", "panel-launcher", "panel-launcher") {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !config_path.exists() {
        log::info!("No config at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)?;
    let config = parse_config(&content)?;
    log::info!("Loaded config from {:?}", config_path);
    Ok(config)
}

pub fn parse_config(content: &str) -> crate::error::Result<Config> {
    Ok(toml::from_str(content)?)
}
