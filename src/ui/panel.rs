//! The "Controls" panel
//!
//! Edits the camera position and the live render parameters of a [`Scene`].

use cgmath::Vector3;

use crate::config::MAX_BLUR_PASSES;
use crate::gfx::scene::{RenderParams, Scene};

pub const CAMERA_RANGE: f32 = 10.0;
pub const COLOR_RANGE: (f32, f32) = (0.0, 2.0);
pub const GAMMA_RANGE: (f32, f32) = (1.0, 3.0);
const DRAG_SPEED: f32 = 0.01;

/// Controls panel for the camera and the shading parameters
///
/// The "Advanced" section is collapsed by default.
pub fn controls_panel(ui: &imgui::Ui, scene: &mut Scene) {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return;
    }

    ui.window("Controls")
        .size([340.0, 0.0], imgui::Condition::FirstUseEver)
        .position([display_size[0] - 350.0, 10.0], imgui::Condition::FirstUseEver)
        .always_auto_resize(true)
        .collapsible(true)
        .build(|| {
            render_camera_controls(ui, scene);
            ui.separator();
            render_shading_controls(ui, &mut scene.params);

            if ui.collapsing_header("Advanced", imgui::TreeNodeFlags::empty()) {
                render_advanced_controls(ui, scene);
            }

            clamp_params(&mut scene.params);
        });
}

fn render_camera_controls(ui: &imgui::Ui, scene: &mut Scene) {
    let camera = &mut scene.camera_manager.camera;
    let mut position: [f32; 3] = camera.position.into();
    let changed = imgui::Drag::new("Camera Pos")
        .range(-CAMERA_RANGE, CAMERA_RANGE)
        .speed(DRAG_SPEED)
        .build_array(ui, &mut position);
    if changed {
        camera.set_position(Vector3::from(position));
    }
}

fn render_shading_controls(ui: &imgui::Ui, params: &mut RenderParams) {
    imgui::Drag::new("Ambient Color")
        .range(COLOR_RANGE.0, COLOR_RANGE.1)
        .speed(DRAG_SPEED)
        .build_array(ui, &mut params.ambient_color);
    imgui::Drag::new("Specular Color")
        .range(COLOR_RANGE.0, COLOR_RANGE.1)
        .speed(DRAG_SPEED)
        .build_array(ui, &mut params.specular_color);
    imgui::Drag::new("Gamma")
        .range(GAMMA_RANGE.0, GAMMA_RANGE.1)
        .speed(DRAG_SPEED)
        .build(ui, &mut params.gamma);
}

fn render_advanced_controls(ui: &imgui::Ui, scene: &mut Scene) {
    let params = &mut scene.params;
    ui.slider("Exposure", 0.01, 10.0, &mut params.exposure);
    ui.slider("Shininess", 1.0, 256.0, &mut params.shininess);
    ui.slider("Blur Passes", 0, MAX_BLUR_PASSES, &mut params.blur_passes);
    ui.slider("Spin Speed", -3.0, 3.0, &mut scene.orbits.spin_speed);

    ui.spacing();
    ui.text(format!("Building: {}", scene.building.name));
    ui.text(format!("Triangles: {}", scene.building.triangle_count()));
}

/// Pulls typed-in values back into the ranges the sliders offer
pub fn clamp_params(params: &mut RenderParams) {
    for c in params
        .ambient_color
        .iter_mut()
        .chain(params.specular_color.iter_mut())
    {
        *c = c.clamp(COLOR_RANGE.0, COLOR_RANGE.1);
    }
    params.gamma = params.gamma.clamp(GAMMA_RANGE.0, GAMMA_RANGE.1);
    params.blur_passes = params.blur_passes.min(MAX_BLUR_PASSES);
    params.exposure = params.exposure.max(0.01);
    params.shininess = params.shininess.max(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::test_context::with_context;

    #[test]
    fn test_shading_drags_leave_untouched_params_alone() {
        with_context(|context| {
            let mut params = RenderParams::default();
            let ui = context.frame();
            ui.window("Controls")
                .build(|| render_shading_controls(ui, &mut params));
            context.render();
            assert_eq!(params, RenderParams::default());
        });
        assert!((GAMMA_RANGE.0..=GAMMA_RANGE.1).contains(&RenderParams::default().gamma));
    }

    #[test]
    fn test_clamp_keeps_values_in_range() {
        let mut params = RenderParams {
            ambient_color: [-1.0, 0.5, 3.0],
            gamma: 0.2,
            blur_passes: 1000,
            shininess: 0.0,
            ..RenderParams::default()
        };
        clamp_params(&mut params);
        assert_eq!(params.ambient_color, [0.0, 0.5, 2.0]);
        assert_eq!(params.gamma, 1.0);
        assert_eq!(params.blur_passes, MAX_BLUR_PASSES);
        assert_eq!(params.shininess, 1.0);
    }

    #[test]
    fn test_clamp_leaves_defaults_untouched() {
        let mut params = RenderParams::default();
        clamp_params(&mut params);
        assert_eq!(params, RenderParams::default());
    }
}
