//! Global uniform bindings for camera and lighting data
//!
//! Everything shared by the scene pass lives in one uniform buffer bound to
//! slot 0 of every scene pipeline: camera matrices, the eye position, the
//! Phong terms from the controls panel and the eight orbit lights.

use crate::{
    gfx::{camera::camera_utils::CameraUniform, scene::RenderParams},
    orbits::{LightSet, NUM_ORBITS},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Global uniform buffer content structure
///
/// MUST match the `Globals` struct in the scene shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    pub view_proj: [[f32; 4]; 4],
    /// Projection times the rotation-only view, for the skybox
    pub sky_view_proj: [[f32; 4]; 4],
    pub eye_position: [f32; 4],
    pub ambient: [f32; 4],
    /// rgb = specular color, w = shininess
    pub specular: [f32; 4],
    /// x = bright-pass luminance threshold
    pub bloom: [f32; 4],
    pub light_positions: [[f32; 4]; NUM_ORBITS],
    /// rgb = color, w = intensity
    pub light_colors: [[f32; 4]; NUM_ORBITS],
}
// 2 * 64 + 4 * 16 + 2 * 8 * 16 = 448 bytes

impl GlobalUBOContent {
    pub fn new(camera: &CameraUniform, params: &RenderParams, lights: &LightSet) -> Self {
        let [ar, ag, ab] = params.ambient_color;
        let [sr, sg, sb] = params.specular_color;

        let mut light_positions = [[0.0; 4]; NUM_ORBITS];
        let mut light_colors = [[0.0; 4]; NUM_ORBITS];
        for i in 0..NUM_ORBITS {
            let [x, y, z] = lights.positions[i];
            let [r, g, b] = lights.colors[i];
            light_positions[i] = [x, y, z, 1.0];
            light_colors[i] = [r, g, b, lights.intensities[i]];
        }

        Self {
            view_proj: camera.view_proj,
            sky_view_proj: camera.sky_view_proj,
            eye_position: camera.view_position,
            ambient: [ar, ag, ab, 1.0],
            specular: [sr, sg, sb, params.shininess],
            bloom: [params.bright_threshold, 0.0, 0.0, 0.0],
            light_positions,
            light_colors,
        }
    }
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Owns the global uniform buffer and its bind group
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
    ubo: GlobalUBO,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");

        let ubo = GlobalUBO::new(device);
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
            ubo,
        }
    }

    /// Uploads this frame's camera, parameters and lights
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        camera: &CameraUniform,
        params: &RenderParams,
        lights: &LightSet,
    ) {
        self.ubo
            .update_content(queue, GlobalUBOContent::new(camera, params, lights));
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_size_matches_shader_struct() {
        assert_eq!(std::mem::size_of::<GlobalUBOContent>(), 448);
    }

    #[test]
    fn test_content_packs_lights_and_params() {
        let camera = CameraUniform::default();
        let params = RenderParams {
            shininess: 16.0,
            bright_threshold: 0.75,
            ..RenderParams::default()
        };
        let mut lights = LightSet {
            positions: [[0.0; 3]; NUM_ORBITS],
            colors: [[0.0; 3]; NUM_ORBITS],
            intensities: [3.0; NUM_ORBITS],
        };
        lights.positions[2] = [3.5, 1.7, 0.0];
        lights.colors[2] = [0.0, 0.0, 0.5];

        let content = GlobalUBOContent::new(&camera, &params, &lights);
        assert_eq!(content.light_positions[2], [3.5, 1.7, 0.0, 1.0]);
        assert_eq!(content.light_colors[2], [0.0, 0.0, 0.5, 3.0]);
        assert_eq!(content.specular[3], 16.0);
        assert_eq!(content.bloom[0], 0.75);
    }
}
