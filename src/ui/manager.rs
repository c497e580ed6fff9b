// src/ui/manager.rs
//! ImGui UI manager
//!
//! Handles ImGui integration with wgpu and winit: frame preparation, input
//! capture and drawing the overlay on top of the composited frame.

use std::time::Instant;

use imgui::{Context, FontConfig, FontSource, MouseCursor};
use imgui_wgpu::{Renderer, RendererConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use log::{error, warn};
use wgpu::{CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::Window,
};

/// ImGui UI manager
///
/// Uses locked DPI mode so the overlay is sized in physical pixels, matching
/// the surface the render engine draws into.
pub struct UiManager {
    pub context: Context,
    platform: WinitPlatform,
    renderer: Renderer,
    last_frame: Instant,
    last_cursor: Option<MouseCursor>,
    /// A frame was started by `update_logic` and not yet rendered
    frame_open: bool,
}

impl UiManager {
    /// Creates a new UI manager drawing into targets of `output_color_format`
    pub fn new(
        device: &Device,
        queue: &Queue,
        output_color_format: TextureFormat,
        window: &Window,
    ) -> Self {
        let mut context = Context::create();
        context.set_ini_filename(None);

        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(context.io_mut(), window, HiDpiMode::Locked(1.0));

        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: 16.0,
                ..Default::default()
            }),
        }]);

        let renderer_config = RendererConfig {
            texture_format: output_color_format,
            ..Default::default()
        };
        let renderer = Renderer::new(&mut context, device, queue, renderer_config);

        Self {
            context,
            platform,
            renderer,
            last_frame: Instant::now(),
            last_cursor: None,
            frame_open: false,
        }
    }

    /// Updates ImGui's display size to match the surface
    pub fn update_display_size(&mut self, width: u32, height: u32) {
        self.context.io_mut().display_size = [width as f32, height as f32];
    }

    /// Forwards an input event to ImGui
    ///
    /// Returns true if the UI wants the input, in which case it must not reach
    /// the camera.
    pub fn handle_input<T>(&mut self, window: &Window, event: &Event<T>) -> bool {
        match event {
            Event::WindowEvent {
                event: window_event,
                ..
            } => match window_event {
                WindowEvent::CursorMoved { .. }
                | WindowEvent::MouseInput { .. }
                | WindowEvent::MouseWheel { .. }
                | WindowEvent::KeyboardInput { .. }
                | WindowEvent::ModifiersChanged(_)
                | WindowEvent::Focused(_) => {
                    self.platform
                        .handle_event(self.context.io_mut(), window, event);
                    self.wants_input()
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// True while the pointer or keyboard focus is on a UI window
    pub fn wants_input(&self) -> bool {
        let io = self.context.io();
        io.want_capture_mouse || io.want_capture_keyboard
    }

    /// Builds this frame's UI with `run_ui`
    ///
    /// Returns whether the UI wants input capture.
    pub fn update_logic<F>(&mut self, window: &Window, run_ui: F) -> bool
    where
        F: FnOnce(&imgui::Ui),
    {
        finish_open_frame(&mut self.context, &mut self.frame_open);

        let now = Instant::now();
        self.context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        if let Err(e) = self.platform.prepare_frame(self.context.io_mut(), window) {
            warn!("failed to prepare UI frame: {}", e);
        }

        let ui = self.context.frame();
        self.frame_open = true;
        run_ui(ui);

        if self.last_cursor != ui.mouse_cursor() {
            self.last_cursor = ui.mouse_cursor();
            self.platform.prepare_render(ui, window);
        }

        self.wants_input()
    }

    /// Renders the UI built in the last [`update_logic`](Self::update_logic)
    ///
    /// Loads the existing color so the composited scene stays underneath.
    pub fn render_display_only(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        color_attachment: &TextureView,
    ) {
        self.frame_open = false;
        let draw_data = self.context.render();

        if draw_data.display_size[0] <= 0.0 || draw_data.display_size[1] <= 0.0 {
            return;
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("imgui_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_attachment,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Err(e) = self
            .renderer
            .render(draw_data, queue, device, &mut render_pass)
        {
            error!("failed to render UI: {:?}", e);
        }
    }

    /// Ends the frame built by [`update_logic`](Self::update_logic) without
    /// drawing it, for frames where the surface was not available
    pub fn discard_frame(&mut self) {
        finish_open_frame(&mut self.context, &mut self.frame_open);
    }

}

/// ImGui requires every `frame()` to be closed by `render()` before the next one
fn finish_open_frame(context: &mut Context, frame_open: &mut bool) {
    if std::mem::take(frame_open) {
        context.render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::test_context::with_context;

    #[test]
    fn test_skipped_frame_is_closed_before_the_next() {
        with_context(|context| {
            let mut frame_open = false;
            for _ in 0..3 {
                finish_open_frame(context, &mut frame_open);
                let ui = context.frame();
                ui.text("frame");
                frame_open = true;
            }

            finish_open_frame(context, &mut frame_open);
            assert!(!frame_open);
            finish_open_frame(context, &mut frame_open);
            assert!(!frame_open);
        });
    }
}
