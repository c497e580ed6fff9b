//! # User Interface Module
//!
//! Dear ImGui overlay drawn after the composite pass.
//!
//! - [`UiManager`] - ImGui context, winit platform glue, wgpu renderer and input capture
//! - [`controls_panel`] - live camera and shading parameters
//!
//! When the UI wants the mouse or keyboard, camera input is suppressed.

pub mod manager;
pub mod panel;

// Re-export main types
pub use manager::UiManager;
pub use panel::controls_panel;

#[cfg(test)]
pub(crate) mod test_context {
    use std::sync::Mutex;

    // ImGui has one global current context
    static LOCK: Mutex<()> = Mutex::new(());

    /// Runs `f` against a fresh headless ImGui context with a built font atlas
    pub fn with_context<R>(f: impl FnOnce(&mut imgui::Context) -> R) -> R {
        let _guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut context = imgui::Context::create();
        context.set_ini_filename(None);
        context.io_mut().display_size = [800.0, 600.0];
        context.fonts().build_rgba32_texture();
        f(&mut context)
    }
}
