use std::sync::Arc;

use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::DemoConfig,
    error::{DemoError, Result},
    gfx::{rendering::FrameStatus, RenderEngine, Scene},
    performance::FrameTimer,
    ui::{controls_panel, UiManager},
};

/// The demo: one window, one scene, one render engine
pub struct DemoApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: DemoConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    scene: Scene,
    timer: FrameTimer,
    /// Set when the event loop had to stop because of an error
    fatal: Option<DemoError>,
}

impl DemoApp {
    /// Loads every asset named by `config`
    ///
    /// GPU setup happens once the event loop delivers the first `resumed`.
    pub fn new(config: DemoConfig) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| DemoError::Window(e.to_string()))?;

        let aspect = config.window.width as f32 / config.window.height as f32;
        let scene = Scene::load(&config, aspect)?;
        info!(
            "scene loaded: '{}' with {} triangles",
            scene.building.name,
            scene.building.triangle_count()
        );

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                ui_manager: None,
                scene,
                timer: FrameTimer::new(),
                fatal: None,
            },
        })
    }

    /// Run the application (consumes self and starts the event loop)
    pub fn run(mut self) -> Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| DemoError::Window("event loop already consumed".to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .map_err(|e| DemoError::Window(e.to_string()))?;

        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_config = &self.config.window;
        let attributes = WindowAttributes::default()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| DemoError::Window(e.to_string()))?;
        let window_handle = Arc::new(window);

        let (width, height) = window_handle.inner_size().into();
        let vsync = window_config.vsync;
        let shader_dir = self.config.assets.shader_dir_path();

        let window_clone = window_handle.clone();
        let renderer = pollster::block_on(async move {
            RenderEngine::new(window_clone, width, height, vsync, shader_dir).await
        })?;

        renderer.init_scene(&mut self.scene)?;
        self.scene
            .camera_manager
            .camera
            .resize_projection(width, height);

        let mut ui_manager = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window_handle,
        );
        let (surface_width, surface_height) = renderer.surface_size();
        ui_manager.update_display_size(surface_width, surface_height);

        self.ui_manager = Some(ui_manager);
        self.render_engine = Some(renderer);
        self.window = Some(window_handle);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: DemoError) {
        error!("{}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn handle_key(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: &KeyEvent,
        ui_captured: bool,
    ) {
        match key_action(event.physical_key, event.state, event.repeat, ui_captured) {
            KeyAction::Quit => event_loop.exit(),
            KeyAction::ReloadShaders => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.reload_shaders();
                }
            }
            KeyAction::Camera => self.scene.camera_manager.process_keyboard_event(event),
            KeyAction::Ignore => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(render_engine), Some(window)) =
            (self.render_engine.as_mut(), self.window.as_ref())
        else {
            return;
        };

        let dt = self.timer.tick();

        // UI first so panel edits land in this frame's uniforms
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let scene = &mut self.scene;
            let timer = &self.timer;
            ui_manager.update_logic(window, |ui| {
                controls_panel(ui, scene);
                timer.render_fps_overlay(ui);
            });
        }

        self.scene.update(dt);

        let result = match self.ui_manager.as_mut() {
            Some(ui_manager) => render_engine.render_frame(
                &mut self.scene,
                Some(
                    |device: &wgpu::Device,
                     queue: &wgpu::Queue,
                     encoder: &mut wgpu::CommandEncoder,
                     color_attachment: &wgpu::TextureView| {
                        ui_manager.render_display_only(device, queue, encoder, color_attachment);
                    },
                ),
            ),
            None => render_engine.render_frame(
                &mut self.scene,
                None::<
                    fn(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
                >,
            ),
        };

        match result {
            Ok(FrameStatus::Presented) => {}
            Ok(FrameStatus::Skipped) => {
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.discard_frame();
                }
            }
            Err(err) => self.fail(event_loop, err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    ReloadShaders,
    Camera,
    Ignore,
}

/// Escape and F5 work even while a UI window has keyboard focus
fn key_action(
    key: PhysicalKey,
    state: ElementState,
    repeat: bool,
    ui_captured: bool,
) -> KeyAction {
    let pressed = state == ElementState::Pressed;
    match key {
        PhysicalKey::Code(KeyCode::Escape) if pressed => KeyAction::Quit,
        PhysicalKey::Code(KeyCode::F5) if pressed && !repeat => KeyAction::ReloadShaders,
        PhysicalKey::Code(KeyCode::Escape | KeyCode::F5) => KeyAction::Ignore,
        // releases always reach the camera so no movement key stays held
        _ if ui_captured && pressed => KeyAction::Ignore,
        _ => KeyAction::Camera,
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.init_graphics(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // Handle UI input first
        let ui_captured = match self.ui_manager.as_mut() {
            Some(ui_manager) => {
                let ui_event: winit::event::Event<()> = winit::event::Event::WindowEvent {
                    window_id,
                    event: event.clone(),
                };
                ui_manager.handle_input(&window, &ui_event)
            }
            None => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if width == 0 || height == 0 {
                    return;
                }
                self.scene
                    .camera_manager
                    .camera
                    .resize_projection(width, height);
                let Some(render_engine) = self.render_engine.as_mut() else {
                    return;
                };
                render_engine.resize(width, height);
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    let (width, height) = render_engine.surface_size();
                    ui_manager.update_display_size(width, height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event, ui_captured)
            }
            _ if ui_captured => {}
            WindowEvent::MouseInput { state, button, .. } => {
                self.scene
                    .camera_manager
                    .process_mouse_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scene.camera_manager.process_scroll(&delta);
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        if self
            .ui_manager
            .as_ref()
            .is_some_and(|ui_manager| ui_manager.wants_input())
        {
            return;
        }

        self.scene.camera_manager.process_event(&event, window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESSED: ElementState = ElementState::Pressed;
    const RELEASED: ElementState = ElementState::Released;

    fn code(key: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(key)
    }

    #[test]
    fn test_escape_quits_while_ui_has_focus() {
        assert_eq!(key_action(code(KeyCode::Escape), PRESSED, false, true), KeyAction::Quit);
        assert_eq!(key_action(code(KeyCode::Escape), PRESSED, false, false), KeyAction::Quit);
        assert_eq!(key_action(code(KeyCode::Escape), RELEASED, false, true), KeyAction::Ignore);
    }

    #[test]
    fn test_f5_reloads_once_per_press() {
        assert_eq!(
            key_action(code(KeyCode::F5), PRESSED, false, true),
            KeyAction::ReloadShaders
        );
        assert_eq!(key_action(code(KeyCode::F5), PRESSED, true, false), KeyAction::Ignore);
    }

    #[test]
    fn test_movement_keys_respect_ui_capture() {
        assert_eq!(key_action(code(KeyCode::KeyW), PRESSED, false, false), KeyAction::Camera);
        assert_eq!(key_action(code(KeyCode::KeyW), RELEASED, false, false), KeyAction::Camera);
        assert_eq!(key_action(code(KeyCode::KeyW), PRESSED, false, true), KeyAction::Ignore);
        assert_eq!(key_action(code(KeyCode::KeyW), RELEASED, false, true), KeyAction::Camera);
    }
}
