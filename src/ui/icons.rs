use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use std::thread;
use std::fs;
use image::ImageReader;
use log::{debug, warn};
use tiny_skia::{Pixmap, Transform};
use crate::handoff::Handoff;

const THEME_SUBDIRS: [&str; 7] = [
    "hicolor/48x48/apps",
    "hicolor/scalable/apps",
    "hicolor/32x32/apps",
    "hicolor/64x64/apps",
    "Adwaita/48x48/apps",
    "Adwaita/scalable/apps",
    "",
];

const EXTENSIONS: [&str; 3] = ["png", "svg", "xpm"];

/// A decoded icon on its way back to the UI thread.
pub struct IconReply {
    pub name: String,
    pub pixmap: Option<Pixmap>,
}

struct IconRequest {
    name: String,
    size: u32,
    reply: Handoff<IconReply>,
}

/// Icons are decoded off the UI thread; `get` returns `None` until the
/// worker's reply has been fed back through `insert`.
pub struct IconCache {
    cache: HashMap<String, Option<Pixmap>>,
    pending: HashSet<String>,
    request_tx: Sender<IconRequest>,
    reply_tx: calloop::channel::Sender<IconReply>,
    fallback: String,
}

impl IconCache {
    pub fn new(reply_tx: calloop::channel::Sender<IconReply>, fallback: impl Into<String>) -> Self {
        Self::with_roots(default_roots(), reply_tx, fallback)
    }

    pub fn with_roots(
        roots: Vec<PathBuf>,
        reply_tx: calloop::channel::Sender<IconReply>,
        fallback: impl Into<String>,
    ) -> Self {
        let fallback = fallback.into();
        let (request_tx, request_rx) = channel::<IconRequest>();

        let loader = IconLoader { roots, fallback: fallback.clone() };
        thread::spawn(move || {
            while let Ok(request) = request_rx.recv() {
                let pixmap = loader.load_with_fallback(&request.name, request.size);
                let delivered = request.reply.deliver(IconReply { name: request.name, pixmap });
                if !delivered {
                    debug!("Icon worker: event loop gone, stopping");
                    break;
                }
            }
        });

        Self {
            cache: HashMap::new(),
            pending: HashSet::new(),
            request_tx,
            reply_tx,
            fallback,
        }
    }

    /// Entries without an icon draw the fallback.
    pub fn get(&mut self, icon: Option<&str>, size: u32) -> Option<Pixmap> {
        let name = icon.unwrap_or(&self.fallback).to_string();
        if let Some(cached) = self.cache.get(&name) {
            return cached.clone();
        }

        if self.pending.insert(name.clone()) {
            let request = IconRequest {
                name: name.clone(),
                size,
                reply: Handoff::new(self.reply_tx.clone()),
            };
            if self.request_tx.send(request).is_err() {
                warn!("Icon worker is gone, '{}' will not load", name);
            }
        }
        None
    }

    pub fn insert(&mut self, reply: IconReply) {
        self.pending.remove(&reply.name);
        self.cache.insert(reply.name, reply.pixmap);
    }

    #[cfg(test)]
    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains(name)
    }
}

fn default_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(home) = directories::BaseDirs::new() {
        roots.push(home.data_dir().join("icons"));
    }
    roots.push(PathBuf::from("/usr/share/icons"));
    roots.push(PathBuf::from("/usr/share/pixmaps"));
    roots
}

struct IconLoader {
    roots: Vec<PathBuf>,
    fallback: String,
}

impl IconLoader {
    fn load_with_fallback(&self, name: &str, size: u32) -> Option<Pixmap> {
        let found = find_icon(&self.roots, name).and_then(|path| load_from_path(&path, size));
        if found.is_some() || name == self.fallback {
            return found;
        }
        debug!("Icon '{}' not found, using '{}'", name, self.fallback);
        find_icon(&self.roots, &self.fallback).and_then(|path| load_from_path(&path, size))
    }
}

/// Absolute paths are taken as-is; names are looked up under each root.
pub fn find_icon(roots: &[PathBuf], name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }

    for root in roots {
        if !root.exists() {
            continue;
        }
        for sub in THEME_SUBDIRS {
            let dir = root.join(sub);
            if !dir.exists() {
                continue;
            }
            for ext in EXTENSIONS {
                let file_path = dir.join(format!("{}.{}", name, ext));
                if file_path.exists() {
                    return Some(file_path);
                }
            }
        }
    }
    None
}

fn load_from_path(path: &Path, size: u32) -> Option<Pixmap> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("svg") => load_svg(path, size),
        _ => load_raster(path, size),
    }
}

fn load_raster(path: &Path, size: u32) -> Option<Pixmap> {
    let img = ImageReader::open(path).ok()?.decode().ok()?;
    let img = img.resize(size, size, image::imageops::FilterType::Lanczos3);
    let mut rgba = img.into_rgba8();

    // tiny-skia wants premultiplied alpha
    for pixel in rgba.chunks_exact_mut(4) {
        let a = pixel[3] as f32 / 255.0;
        pixel[0] = (pixel[0] as f32 * a) as u8;
        pixel[1] = (pixel[1] as f32 * a) as u8;
        pixel[2] = (pixel[2] as f32 * a) as u8;
    }

    let (width, height) = (rgba.width(), rgba.height());
    Pixmap::from_vec(rgba.into_vec(), tiny_skia::IntSize::from_wh(width, height)?)
}

fn load_svg(path: &Path, size: u32) -> Option<Pixmap> {
    let opt = resvg::usvg::Options::default();
    let svg_data = fs::read(path).ok()?;
    let tree = resvg::usvg::Tree::from_data(&svg_data, &opt).ok()?;

    let mut pixmap = Pixmap::new(size, size)?;
    let transform = Transform::from_scale(
        size as f32 / tree.size().width(),
        size as f32 / tree.size().height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Some(pixmap)
}
