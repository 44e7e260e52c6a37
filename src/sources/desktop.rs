use crate::error::Result;
use crate::model::{CatalogEntry, CatalogGroup, ROOT_GROUP_NAME};
use crate::sources::CatalogSource;
use directories::BaseDirs;
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const OTHER_GROUP: &str = "Other";

/// Menu groups in priority order. The first group sharing a category with an
/// entry claims it; `Utility` is last because it is usually a secondary tag.
const MENU_GROUPS: &[(&str, &[&str])] = &[
    ("Universal Access", &["Accessibility"]),
    ("Programming", &["Development"]),
    ("Games", &["Game"]),
    ("Graphics", &["Graphics"]),
    ("Internet", &["Network"]),
    ("Sound & Video", &["AudioVideo", "Audio", "Video"]),
    ("Office", &["Office"]),
    ("Science", &["Science"]),
    ("Education", &["Education"]),
    ("System Tools", &["System", "Settings"]),
    ("Accessories", &["Utility"]),
];

pub struct DesktopSource {
    data_dirs: Vec<PathBuf>,
}

impl DesktopSource {
    /// `$XDG_DATA_HOME` first, then `$XDG_DATA_DIRS`.
    pub fn from_env() -> Self {
        let mut data_dirs = Vec::new();
        if let Some(base_dirs) = BaseDirs::new() {
            data_dirs.push(base_dirs.data_dir().to_path_buf());
        }
        let system = env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
        data_dirs.extend(system.split(':').filter(|s| !s.is_empty()).map(PathBuf::from));
        Self { data_dirs }
    }

    pub fn with_data_dirs(data_dirs: Vec<PathBuf>) -> Self {
        Self { data_dirs }
    }
}

impl CatalogSource for DesktopSource {
    fn name(&self) -> &str {
        "desktop"
    }

    fn load(&self) -> Result<CatalogGroup> {
        let mut seen = HashSet::new();
        let mut grouped: BTreeMap<&'static str, Vec<CatalogEntry>> = BTreeMap::new();

        for data_dir in &self.data_dirs {
            let dir = data_dir.join("applications");
            if !dir.is_dir() {
                continue;
            }
            debug!("Scanning desktop files in {:?}", dir);

            for file in WalkDir::new(&dir).follow_links(true).into_iter().flatten() {
                let path = file.path();
                if path.extension().and_then(|s| s.to_str()) != Some("desktop") {
                    continue;
                }
                let Some(id) = desktop_file_id(&dir, path) else { continue };
                // Earlier directories shadow later ones, hidden or not.
                if !seen.insert(id.clone()) {
                    continue;
                }
                let Ok(content) = fs::read_to_string(path) else { continue };
                let Some(parsed) = parse_desktop_file(&content) else { continue };

                let group = menu_group(&parsed.categories);
                let mut entry = CatalogEntry::new(id, parsed.name, parsed.argv);
                entry.icon = parsed.icon;
                entry.terminal = parsed.terminal;
                entry.hidden = parsed.no_display;
                grouped.entry(group).or_default().push(entry);
            }
        }

        let mut root = CatalogGroup::new(ROOT_GROUP_NAME);
        let mut other = None;
        let mut total = 0;
        for (name, mut entries) in grouped {
            entries.sort_by_cached_key(|e| e.name.to_lowercase());
            total += entries.len();
            let mut group = CatalogGroup::new(name);
            for entry in entries {
                group.push_entry(entry);
            }
            if name == OTHER_GROUP {
                other = Some(group);
            } else {
                root.push_group(group);
            }
        }
        if let Some(group) = other {
            root.push_group(group);
        }

        info!("DesktopSource: found {} entries", total);
        Ok(root)
    }
}

/// Path below `applications/` with separators turned into dashes.
fn desktop_file_id(applications_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(applications_dir).ok()?;
    let parts: Vec<_> = relative.iter().map(|p| p.to_string_lossy()).collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("-"))
}

fn menu_group(categories: &[String]) -> &'static str {
    MENU_GROUPS
        .iter()
        .find(|(_, cats)| categories.iter().any(|c| cats.contains(&c.as_str())))
        .map(|(name, _)| *name)
        .unwrap_or(OTHER_GROUP)
}

#[derive(Debug, PartialEq)]
struct DesktopFile {
    name: String,
    argv: Vec<String>,
    icon: Option<String>,
    terminal: bool,
    no_display: bool,
    categories: Vec<String>,
}

fn parse_desktop_file(content: &str) -> Option<DesktopFile> {
    let mut name = None;
    let mut exec = None;
    let mut icon = None;
    let mut terminal = false;
    let mut no_display = false;
    let mut is_application = true;
    let mut categories = Vec::new();
    let mut is_desktop_entry = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }

        if line == "[Desktop Entry]" {
            is_desktop_entry = true;
            continue;
        }

        if line.starts_with('[') {
            is_desktop_entry = false;
            continue;
        }

        if !is_desktop_entry { continue; }

        let Some((key, value)) = line.split_once('=') else { continue };
        let value = value.trim();
        match key.trim() {
            "Type" => is_application = value == "Application",
            "Name" => name = Some(value.to_string()),
            "Exec" => exec = exec_argv(value),
            "Icon" if !value.is_empty() => icon = Some(value.to_string()),
            "Terminal" => terminal = value == "true",
            "NoDisplay" | "Hidden" => no_display |= value == "true",
            "Categories" => {
                categories = value.split(';').filter(|c| !c.is_empty()).map(str::to_string).collect();
            }
            _ => {}
        }
    }

    if !is_application { return None; }

    match (name, exec) {
        (Some(name), Some(argv)) => Some(DesktopFile {
            name,
            argv,
            icon,
            terminal,
            no_display,
            categories,
        }),
        _ => None,
    }
}

/// Split an `Exec` value into argv: undo key-file escapes, unquote, then
/// expand field codes. `None` for unbalanced quoting or an empty command.
fn exec_argv(value: &str) -> Option<Vec<String>> {
    let Some(words) = shlex::split(&unescape_value(value)) else {
        debug!("Unbalanced quoting in Exec={}", value);
        return None;
    };
    let argv: Vec<String> = words.iter().filter_map(|w| expand_field_codes(w)).collect();
    (!argv.is_empty()).then_some(argv)
}

/// Key-file level escapes: `\s`, `\n`, `\t`, `\r` and `\\`.
fn unescape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A word that is a lone field code (`%f`, `%U`, ...) is dropped; codes
/// inside a word are removed and `%%` becomes `%`.
fn expand_field_codes(word: &str) -> Option<String> {
    let mut chars = word.chars();
    if let (Some('%'), Some(code), None) = (chars.next(), chars.next(), chars.next()) {
        if code != '%' {
            return None;
        }
    }

    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                out.push('%');
                chars.next();
            }
            Some(code) if code.is_ascii_alphabetic() => {
                chars.next();
            }
            _ => out.push('%'),
        }
    }
    Some(out)
}
