use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_layer, delegate_output, delegate_pointer,
    delegate_registry, delegate_seat, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Modifiers},
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{slot::SlotPool, Shm, ShmHandler},
};
use wayland_client::{
    globals::GlobalList,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    Connection, QueueHandle,
};
use xkbcommon::xkb;
use log::{debug, error, info, warn};
use crate::error::{LauncherError, Result};
use crate::model::{PopupGeometry, Rect};
use crate::overlay::{MonitorGeometryProvider, ScreenDimEffect, SurfaceBackend};
use crate::remote::Command;
use crate::search::KeyInput;
use crate::state::{Launcher, PointerTarget};
use crate::ui::layout::ListLayout;
use crate::ui::render::Renderer;

const NAMESPACE: &str = "panel-launcher";
const CATCHER_NAMESPACE: &str = "panel-launcher-click-catcher";

/// A layer surface and the size the compositor last configured it to.
pub struct Panel {
    pub layer: LayerSurface,
    pub width: u32,
    pub height: u32,
    pub configured: bool,
}

impl Panel {
    fn new(layer: LayerSurface) -> Self {
        Self { layer, width: 0, height: 0, configured: false }
    }

    fn owns(&self, surface: &wl_surface::WlSurface) -> bool {
        self.layer.wl_surface() == surface
    }
}

/// Everything the overlay controller drives on the compositor side.
///
/// The popup is a layer surface on the overlay layer. Pointer capture is a
/// transparent full-screen surface one layer below it that swallows clicks
/// outside the popup and paints the dim colour.
pub struct SurfaceHost {
    pub output_state: OutputState,
    compositor_state: CompositorState,
    shm_state: Shm,
    layer_shell_state: LayerShell,
    qh: QueueHandle<WaylandApp>,

    pub popup: Option<Panel>,
    pub catcher: Option<Panel>,
    pool: Option<SlotPool>,

    keyboard: Option<wl_keyboard::WlKeyboard>,
    pointer: Option<wl_pointer::WlPointer>,
    output_name: Option<String>,
    panel_height: u32,
    dimmed: bool,
}

impl SurfaceHost {
    fn active_output(&self) -> Option<(wl_output::WlOutput, Rect)> {
        let mut fallback = None;
        for output in self.output_state.outputs() {
            let Some(info) = self.output_state.info(&output) else { continue };
            let (Some((x, y)), Some((w, h))) = (info.logical_position, info.logical_size) else {
                continue;
            };
            let rect = Rect::new(x, y, w.max(0) as u32, h.max(0) as u32);
            match (&self.output_name, &info.name) {
                (Some(wanted), Some(name)) if wanted == name => return Some((output, rect)),
                _ => {
                    if fallback.is_none() {
                        fallback = Some((output, rect));
                    }
                }
            }
        }
        if self.output_name.is_some() && fallback.is_some() {
            debug!("Configured output {:?} not found, using the first one", self.output_name);
        }
        fallback
    }

    fn place(layer: &LayerSurface, geometry: PopupGeometry) {
        let (left, top) = geometry.margins();
        layer.set_margin(top, 0, 0, left);
        layer.set_size(geometry.popup.width, geometry.popup.height);
    }

    fn create_layer(&self, layer: Layer, namespace: &str) -> LayerSurface {
        let output = self.active_output().map(|(output, _)| output);
        let surface = self.compositor_state.create_surface(&self.qh);
        let layer_surface = self.layer_shell_state.create_layer_surface(
            &self.qh,
            surface,
            layer,
            Some(namespace),
            output.as_ref(),
        );
        // Geometry already leaves the panel band free.
        layer_surface.set_exclusive_zone(-1);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::None);
        layer_surface
    }
}

impl MonitorGeometryProvider for SurfaceHost {
    fn active_monitor_rect(&self) -> Option<Rect> {
        self.active_output().map(|(_, rect)| rect)
    }

    fn reserved_panel_height(&self) -> u32 {
        self.panel_height
    }
}

impl ScreenDimEffect for SurfaceHost {
    fn begin(&mut self) {
        self.dimmed = true;
    }

    fn end(&mut self) {
        self.dimmed = false;
    }
}

impl SurfaceBackend for SurfaceHost {
    fn show(&mut self, geometry: PopupGeometry) {
        let layer = self.create_layer(Layer::Overlay, NAMESPACE);
        layer.set_anchor(Anchor::TOP | Anchor::LEFT);
        Self::place(&layer, geometry);
        layer.commit();
        self.popup = Some(Panel::new(layer));
    }

    fn apply_geometry(&mut self, geometry: PopupGeometry) {
        if let Some(popup) = &self.popup {
            Self::place(&popup.layer, geometry);
            popup.layer.commit();
        }
    }

    fn hide(&mut self) {
        self.popup = None;
    }

    fn grab_pointer(&mut self) -> Result<()> {
        if self.pointer.is_none() {
            return Err(LauncherError::CaptureUnavailable("seat has no pointer".to_string()));
        }
        let layer = self.create_layer(Layer::Top, CATCHER_NAMESPACE);
        layer.set_anchor(Anchor::TOP | Anchor::BOTTOM | Anchor::LEFT | Anchor::RIGHT);
        layer.set_size(0, 0);
        layer.commit();
        self.catcher = Some(Panel::new(layer));
        Ok(())
    }

    fn release_pointer(&mut self) {
        self.catcher = None;
    }

    fn request_keyboard_focus(&mut self) -> Result<()> {
        if self.keyboard.is_none() {
            return Err(LauncherError::FocusUnavailable("seat has no keyboard".to_string()));
        }
        let Some(popup) = &self.popup else {
            return Err(LauncherError::FocusUnavailable("popup not mapped".to_string()));
        };
        popup.layer.set_keyboard_interactivity(KeyboardInteractivity::Exclusive);
        popup.layer.commit();
        Ok(())
    }
}

pub struct WaylandApp {
    pub registry_state: RegistryState,
    pub seat_state: SeatState,
    pub host: SurfaceHost,
    pub launcher: Launcher,
    pub renderer: Renderer,
    pub should_exit: bool,
}

impl WaylandApp {
    pub fn new(globals: &GlobalList, qh: &QueueHandle<Self>, launcher: Launcher, renderer: Renderer) -> Result<Self> {
        let bind_error = |what: &str| LauncherError::Io(std::io::Error::other(format!("{what} not available")));

        let compositor_state = CompositorState::bind(globals, qh).map_err(|_| bind_error("wl_compositor"))?;
        let shm_state = Shm::bind(globals, qh).map_err(|_| bind_error("wl_shm"))?;
        let layer_shell_state = LayerShell::bind(globals, qh).map_err(|_| bind_error("zwlr_layer_shell_v1"))?;

        let host = SurfaceHost {
            output_state: OutputState::new(globals, qh),
            compositor_state,
            shm_state,
            layer_shell_state,
            qh: qh.clone(),
            popup: None,
            catcher: None,
            pool: None,
            keyboard: None,
            pointer: None,
            output_name: launcher.config.popup.output.clone(),
            panel_height: launcher.config.popup.panel_height,
            dimmed: false,
        };

        Ok(Self {
            registry_state: RegistryState::new(globals),
            seat_state: SeatState::new(globals, qh),
            host,
            launcher,
            renderer,
            should_exit: false,
        })
    }

    pub fn run_command(&mut self, command: Command) {
        info!("Command: {:?}", command);
        match command {
            Command::Toggle => {
                self.launcher.toggle(&mut self.host);
            }
            Command::Open => {
                self.launcher.open(&mut self.host);
            }
            Command::Close => {
                self.launcher.close(&mut self.host);
            }
        }
        self.draw();
    }

    fn layout(&self) -> Option<ListLayout> {
        let popup = self.host.popup.as_ref()?;
        Some(ListLayout::new(&self.launcher.config.theme, popup.height as f32))
    }

    pub fn draw(&mut self) {
        let host = &mut self.host;
        if host.pool.is_none() {
            match SlotPool::new(256 * 256 * 4, &host.shm_state) {
                Ok(pool) => host.pool = Some(pool),
                Err(e) => {
                    error!("Failed to create shm pool: {}", e);
                    self.should_exit = true;
                    return;
                }
            }
        }
        let Some(pool) = host.pool.as_mut() else { return };

        for (panel, is_popup) in [(&host.popup, true), (&host.catcher, false)] {
            let Some(panel) = panel else { continue };
            if !panel.configured || panel.width == 0 || panel.height == 0 {
                continue;
            }
            let (width, height) = (panel.width, panel.height);

            let (buffer, canvas) = match pool.create_buffer(
                width as i32,
                height as i32,
                (width * 4) as i32,
                wl_shm::Format::Argb8888,
            ) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Could not allocate a {}x{} buffer: {}", width, height, e);
                    continue;
                }
            };

            let Some(mut pixmap) = tiny_skia::PixmapMut::from_bytes(canvas, width, height) else { continue };
            if is_popup {
                self.renderer.draw(&mut pixmap, &self.launcher);
            } else if host.dimmed {
                self.renderer.draw_dim(&mut pixmap, &self.launcher.config.theme);
            } else {
                pixmap.fill(tiny_skia::Color::TRANSPARENT);
            }

            // RGBA -> BGRA
            for chunk in canvas.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }

            let surface = panel.layer.wl_surface();
            if let Err(e) = buffer.attach_to(surface) {
                warn!("Could not attach buffer: {}", e);
                continue;
            }
            surface.damage(0, 0, width as i32, height as i32);
            surface.commit();
        }
    }
}

impl LayerShellHandler for WaylandApp {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, layer: &LayerSurface) {
        let ours = [&self.host.popup, &self.host.catcher]
            .into_iter()
            .flatten()
            .any(|panel| &panel.layer == layer);
        if ours {
            warn!("Compositor closed a launcher surface, hiding");
            self.launcher.close(&mut self.host);
        }
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        let panel = [self.host.popup.as_mut(), self.host.catcher.as_mut()]
            .into_iter()
            .flatten()
            .find(|panel| &panel.layer == layer);
        let Some(panel) = panel else { return };

        if configure.new_size.0 > 0 {
            panel.width = configure.new_size.0;
        }
        if configure.new_size.1 > 0 {
            panel.height = configure.new_size.1;
        }
        panel.configured = true;
        self.draw();
    }
}

impl CompositorHandler for WaylandApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {}

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
        self.draw();
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {}

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {}

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {}
}

impl OutputHandler for WaylandApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.host.output_state
    }

    fn new_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {
        self.launcher.on_monitors_changed(&mut self.host);
    }

    fn update_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {
        self.launcher.on_monitors_changed(&mut self.host);
    }

    fn output_destroyed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {
        self.launcher.on_monitors_changed(&mut self.host);
    }
}

impl SeatHandler for WaylandApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Keyboard && self.host.keyboard.is_none() {
            match self.seat_state.get_keyboard(qh, &seat, None) {
                Ok(keyboard) => self.host.keyboard = Some(keyboard),
                Err(e) => warn!("Failed to get keyboard: {}", e),
            }
        }
        if capability == Capability::Pointer && self.host.pointer.is_none() {
            match self.seat_state.get_pointer(qh, &seat) {
                Ok(pointer) => self.host.pointer = Some(pointer),
                Err(e) => warn!("Failed to get pointer: {}", e),
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _: &QueueHandle<Self>,
        _: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Keyboard {
            if let Some(keyboard) = self.host.keyboard.take() {
                keyboard.release();
            }
        }
        if capability == Capability::Pointer {
            if let Some(pointer) = self.host.pointer.take() {
                pointer.release();
            }
        }
    }

    fn remove_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}
}

impl KeyboardHandler for WaylandApp {
    fn enter(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: &wl_surface::WlSurface,
        _: u32,
        _: &[u32],
        _: &[xkb::Keysym],
    ) {}

    fn leave(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: &wl_surface::WlSurface,
        _: u32,
    ) {}

    fn press_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        let key = KeyInput::press(u32::from(event.keysym), event.utf8.as_deref());
        self.handle_key(key);
    }

    fn release_key(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: u32,
        event: KeyEvent,
    ) {
        self.handle_key(KeyInput::release(u32::from(event.keysym)));
    }

    fn update_modifiers(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _modifiers: Modifiers,
        _layout: u32,
    ) {}
}

impl WaylandApp {
    fn handle_key(&mut self, key: KeyInput) {
        let Some(layout) = self.layout() else { return };
        if self.launcher.handle_key(&mut self.host, &key, &layout) {
            self.draw();
        }
    }
}

impl PointerHandler for WaylandApp {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        let mut dirty = false;
        for event in events {
            let on_popup = self.host.popup.as_ref().is_some_and(|p| p.owns(&event.surface));
            let on_catcher = self.host.catcher.as_ref().is_some_and(|p| p.owns(&event.surface));
            let Some(layout) = self.layout() else { continue };

            match &event.kind {
                PointerEventKind::Press { .. } if on_popup || on_catcher => {
                    let target = if on_popup {
                        PointerTarget::Popup { x: event.position.0, y: event.position.1 }
                    } else {
                        PointerTarget::Outside
                    };
                    dirty |= self.launcher.handle_pointer_press(&mut self.host, target, &layout);
                }
                PointerEventKind::Axis { vertical, .. } if on_popup => {
                    dirty |= self.launcher.handle_scroll(vertical.absolute, &layout);
                }
                _ => {}
            }
        }
        if dirty {
            self.draw();
        }
    }
}

impl ShmHandler for WaylandApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.host.shm_state
    }
}

delegate_compositor!(WaylandApp);
delegate_output!(WaylandApp);
delegate_shm!(WaylandApp);
delegate_seat!(WaylandApp);
delegate_keyboard!(WaylandApp);
delegate_pointer!(WaylandApp);
delegate_layer!(WaylandApp);
delegate_registry!(WaylandApp);

impl ProvidesRegistryState for WaylandApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}
