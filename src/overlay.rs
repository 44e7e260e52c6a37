use crate::config::{PanelEdge, PopupConfig};
use crate::error::Result;
use crate::loader::CatalogLoader;
use crate::model::{Catalog, CatalogEntry, PopupGeometry, Rect};
use log::{debug, error, info, warn};
use std::sync::Arc;

pub trait MonitorGeometryProvider {
    /// Rectangle of the monitor the panel lives on, `None` when no output is known.
    fn active_monitor_rect(&self) -> Option<Rect>;
    fn reserved_panel_height(&self) -> u32;
}

/// Cosmetic background treatment while the popup is up.
pub trait ScreenDimEffect {
    fn begin(&mut self);
    fn end(&mut self);
}

/// The popup surface and the input it can claim from the compositor.
pub trait SurfaceBackend {
    fn show(&mut self, geometry: PopupGeometry);
    fn apply_geometry(&mut self, geometry: PopupGeometry);
    fn hide(&mut self);
    fn grab_pointer(&mut self) -> Result<()>;
    fn release_pointer(&mut self);
    fn request_keyboard_focus(&mut self) -> Result<()>;
}

pub trait OverlayHost: SurfaceBackend + MonitorGeometryProvider + ScreenDimEffect {}

impl<T: SurfaceBackend + MonitorGeometryProvider + ScreenDimEffect + ?Sized> OverlayHost for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Shown,
}

/// Where a key event goes while the popup is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRoute {
    /// Hand the event to the search field first (type-ahead).
    SearchField,
    /// Field already focused; normal handling.
    PassThrough,
    /// Popup hidden.
    Dropped,
}

#[derive(Default)]
pub struct Observers {
    opened: Vec<Box<dyn FnMut()>>,
    closed: Vec<Box<dyn FnMut()>>,
    launch_requested: Vec<Box<dyn FnMut(&CatalogEntry)>>,
}

pub struct OverlayController {
    state: OverlayState,
    panel_edge: PanelEdge,
    width_divisor: u32,
    geometry: Option<PopupGeometry>,
    capture_held: bool,
    keyboard_focused: bool,
    dimmed: bool,
    observers: Observers,
}

impl OverlayController {
    pub fn new(config: &PopupConfig) -> Self {
        Self {
            state: OverlayState::Hidden,
            panel_edge: config.panel_edge,
            width_divisor: config.width_divisor.max(1),
            geometry: None,
            capture_held: false,
            keyboard_focused: false,
            dimmed: false,
            observers: Observers::default(),
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_shown(&self) -> bool {
        self.state == OverlayState::Shown
    }

    pub fn geometry(&self) -> Option<PopupGeometry> {
        self.geometry
    }

    #[cfg(test)]
    pub fn capture_held(&self) -> bool {
        self.capture_held
    }

    pub fn keyboard_focused(&self) -> bool {
        self.keyboard_focused
    }

    #[cfg(test)]
    pub fn dimmed(&self) -> bool {
        self.dimmed
    }

    pub fn on_opened(&mut self, callback: impl FnMut() + 'static) {
        self.observers.opened.push(Box::new(callback));
    }

    pub fn on_closed(&mut self, callback: impl FnMut() + 'static) {
        self.observers.closed.push(Box::new(callback));
    }

    pub fn on_launch_requested(&mut self, callback: impl FnMut(&CatalogEntry) + 'static) {
        self.observers.launch_requested.push(Box::new(callback));
    }

    pub(crate) fn notify_launch_requested(&mut self, entry: &CatalogEntry) {
        for callback in self.observers.launch_requested.iter_mut() {
            callback(entry);
        }
    }

    /// Show the popup. Reloads the catalog every time; when already shown only
    /// the reload happens. Returns `None` if there is no monitor to show on, or
    /// the popup would come out zero-sized.
    pub fn open<H: OverlayHost + ?Sized>(&mut self, host: &mut H, loader: &mut CatalogLoader) -> Option<Arc<Catalog>> {
        if self.is_shown() {
            debug!("open: already shown, refreshing catalog only");
            return Some(loader.reload());
        }

        // A previous session must be fully torn down before this one starts.
        debug_assert!(!self.capture_held && !self.dimmed);

        let catalog = loader.reload();

        let Some(geometry) = self.compute_geometry(host) else {
            error!("open: no usable monitor, staying hidden");
            return None;
        };

        host.show(geometry);
        self.geometry = Some(geometry);

        match host.grab_pointer() {
            Ok(()) => self.capture_held = true,
            Err(e) => warn!("open: continuing without pointer capture: {}", e),
        }

        match host.request_keyboard_focus() {
            Ok(()) => self.keyboard_focused = true,
            Err(e) => warn!("open: continuing unfocused: {}", e),
        }

        host.begin();
        self.dimmed = true;
        self.state = OverlayState::Shown;
        info!("Overlay shown at {:?}", geometry.popup);

        for callback in self.observers.opened.iter_mut() {
            callback();
        }
        Some(catalog)
    }

    /// Hide the popup and drop everything it claimed. No-op when hidden.
    pub fn close<H: OverlayHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if !self.is_shown() {
            return false;
        }

        host.release_pointer();
        self.capture_held = false;
        host.hide();
        self.keyboard_focused = false;
        host.end();
        self.dimmed = false;

        self.geometry = None;
        self.state = OverlayState::Hidden;
        info!("Overlay hidden");

        for callback in self.observers.closed.iter_mut() {
            callback();
        }
        true
    }

    /// Pointer press somewhere while shown. Presses outside the popup dismiss it.
    pub fn on_pointer_press<H: OverlayHost + ?Sized>(&mut self, host: &mut H, inside_popup: bool) -> bool {
        if !self.is_shown() || inside_popup {
            return false;
        }
        debug!("Pointer press outside popup");
        self.close(host)
    }

    /// Outputs changed. Geometry is recomputed and re-applied; the popup stays up.
    pub fn on_monitor_configuration_changed<H: OverlayHost + ?Sized>(&mut self, host: &mut H) {
        if !self.is_shown() {
            return;
        }
        match self.compute_geometry(host) {
            Some(geometry) => {
                if self.geometry != Some(geometry) {
                    debug!("Monitor configuration changed, popup now {:?}", geometry.popup);
                }
                host.apply_geometry(geometry);
                self.geometry = Some(geometry);
            }
            None => warn!("Monitor configuration changed but no usable monitor, keeping {:?}", self.geometry),
        }
    }

    pub fn route_key(&self, search_focused: bool) -> KeyRoute {
        if !self.is_shown() {
            KeyRoute::Dropped
        } else if search_focused {
            KeyRoute::PassThrough
        } else {
            KeyRoute::SearchField
        }
    }

    /// Layer surfaces may not be sized 0 in either direction, so a panel
    /// taller than the monitor or a divisor wider than it counts as no monitor.
    fn compute_geometry<H: OverlayHost + ?Sized>(&self, host: &H) -> Option<PopupGeometry> {
        let monitor = host.active_monitor_rect()?;
        let geometry = popup_geometry(
            monitor,
            host.reserved_panel_height(),
            self.panel_edge,
            self.width_divisor,
        );
        if geometry.popup.width == 0 || geometry.popup.height == 0 {
            warn!("Popup would be {}x{} on {:?}", geometry.popup.width, geometry.popup.height, monitor);
            return None;
        }
        Some(geometry)
    }
}

/// The popup hugs the monitor's left edge, spans everything but the panel
/// band vertically, and takes `1/width_divisor` of the width.
pub fn popup_geometry(monitor: Rect, panel_height: u32, edge: PanelEdge, width_divisor: u32) -> PopupGeometry {
    let panel_height = panel_height.min(monitor.height);
    let y = match edge {
        PanelEdge::Top => monitor.y + panel_height as i32,
        PanelEdge::Bottom => monitor.y,
    };
    PopupGeometry {
        monitor,
        popup: Rect::new(
            monitor.x,
            y,
            monitor.width / width_divisor.max(1),
            monitor.height - panel_height,
        ),
    }
}
