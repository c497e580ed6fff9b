//! HDR render targets and the bind groups of the bloom chain
//!
//! Every target is sized to the surface. Bind groups reference texture views,
//! so they are rebuilt whenever the targets are reallocated.

use std::collections::HashMap;

use log::info;

use super::blur::BloomTarget;
use crate::gfx::resources::texture_resource::TextureResource;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// Floating point targets written by the scene pass and the blur passes
pub struct HdrTargets {
    pub width: u32,
    pub height: u32,
    pub hdr: TextureResource,
    pub bright: TextureResource,
    pub pingpong: [TextureResource; 2],
    pub depth: TextureResource,
}

impl HdrTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            hdr: TextureResource::create_render_target(device, width, height, "HDR Color"),
            bright: TextureResource::create_render_target(device, width, height, "Bright Color"),
            pingpong: [
                TextureResource::create_render_target(device, width, height, "Ping-Pong 0"),
                TextureResource::create_render_target(device, width, height, "Ping-Pong 1"),
            ],
            depth: TextureResource::create_depth_texture(device, width, height, "Scene Depth"),
        }
    }

    /// Reallocates every target at the new size
    ///
    /// Returns false when nothing changed: same size, or a zero dimension
    /// (minimized window).
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if !needs_realloc((self.width, self.height), (width, height)) {
            return false;
        }
        *self = Self::new(device, width, height);
        info!("reallocated HDR targets at {}x{}", width, height);
        true
    }

    pub fn bloom_texture(&self, target: BloomTarget) -> &TextureResource {
        match target {
            BloomTarget::Bright => &self.bright,
            BloomTarget::PingPong(i) => &self.pingpong[i % 2],
        }
    }
}

fn needs_realloc(current: (u32, u32), requested: (u32, u32)) -> bool {
    requested.0 > 0 && requested.1 > 0 && current != requested
}

/// MUST match `BlurParams` in blur.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniform {
    pub horizontal: u32,
    _padding: [u32; 3],
}

impl BlurUniform {
    pub fn new(horizontal: bool) -> Self {
        Self {
            horizontal: horizontal as u32,
            _padding: [0; 3],
        }
    }
}

/// MUST match `CompositeParams` in composite.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniform {
    pub exposure: f32,
    pub gamma: f32,
    _padding: [f32; 2],
}

impl CompositeUniform {
    pub fn new(exposure: f32, gamma: f32) -> Self {
        Self {
            exposure,
            gamma,
            _padding: [0.0; 2],
        }
    }
}

const BLOOM_SOURCES: [BloomTarget; 3] = [
    BloomTarget::Bright,
    BloomTarget::PingPong(0),
    BloomTarget::PingPong(1),
];

/// Direction a blur pass uses when reading `source`
///
/// Follows from the schedule: the bright target and ping-pong 1 are read by
/// passes writing ping-pong 0 (vertical), ping-pong 0 by passes writing 1.
fn blur_direction(source: BloomTarget) -> bool {
    matches!(source, BloomTarget::PingPong(0))
}

/// Layouts, uniforms and bind groups of the blur and composite passes
pub struct PostProcess {
    blur_layout: BindGroupLayoutWithDesc,
    composite_layout: BindGroupLayoutWithDesc,
    blur_uniforms: [UniformBuffer<BlurUniform>; 2],
    composite_uniform: UniformBuffer<CompositeUniform>,
    blur_groups: HashMap<BloomTarget, wgpu::BindGroup>,
    composite_groups: HashMap<BloomTarget, wgpu::BindGroup>,
}

impl PostProcess {
    pub fn new(device: &wgpu::Device, targets: &HdrTargets) -> Self {
        let blur_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Blur Bind Group Layout");

        let composite_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Composite Bind Group Layout");

        let blur_uniforms = [
            UniformBuffer::new_with_data(device, &BlurUniform::new(false)),
            UniformBuffer::new_with_data(device, &BlurUniform::new(true)),
        ];
        let composite_uniform =
            UniformBuffer::new_with_data(device, &CompositeUniform::new(1.0, 2.2));

        let mut post = Self {
            blur_layout,
            composite_layout,
            blur_uniforms,
            composite_uniform,
            blur_groups: HashMap::new(),
            composite_groups: HashMap::new(),
        };
        post.rebuild_bind_groups(device, targets);
        post
    }

    /// Points every bind group at the current target views
    pub fn rebuild_bind_groups(&mut self, device: &wgpu::Device, targets: &HdrTargets) {
        self.blur_groups.clear();
        self.composite_groups.clear();

        for source in BLOOM_SOURCES {
            let texture = targets.bloom_texture(source);
            let uniform = &self.blur_uniforms[blur_direction(source) as usize];

            let blur = BindGroupBuilder::new(&self.blur_layout)
                .resource(uniform.binding_resource())
                .texture(&texture.view)
                .sampler(&texture.sampler)
                .create(device, &format!("Blur {:?} Bind Group", source));
            self.blur_groups.insert(source, blur);

            let composite = BindGroupBuilder::new(&self.composite_layout)
                .resource(self.composite_uniform.binding_resource())
                .texture(&targets.hdr.view)
                .texture(&texture.view)
                .sampler(&targets.hdr.sampler)
                .create(device, &format!("Composite {:?} Bind Group", source));
            self.composite_groups.insert(source, composite);
        }
    }

    pub fn update_composite(&mut self, queue: &wgpu::Queue, exposure: f32, gamma: f32) {
        self.composite_uniform
            .update_content(queue, CompositeUniform::new(exposure, gamma));
    }

    pub fn blur_layout(&self) -> &wgpu::BindGroupLayout {
        &self.blur_layout.layout
    }

    pub fn composite_layout(&self) -> &wgpu::BindGroupLayout {
        &self.composite_layout.layout
    }

    pub fn blur_bind_group(&self, source: BloomTarget) -> Option<&wgpu::BindGroup> {
        self.blur_groups.get(&source)
    }

    pub fn composite_bind_group(&self, bloom: BloomTarget) -> Option<&wgpu::BindGroup> {
        self.composite_groups.get(&bloom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::blur::blur_schedule;

    #[test]
    fn test_realloc_only_on_real_change() {
        assert!(!needs_realloc((1000, 650), (1000, 650)));
        assert!(!needs_realloc((1000, 650), (0, 650)));
        assert!(!needs_realloc((1000, 650), (1000, 0)));
        assert!(needs_realloc((1000, 650), (1280, 720)));
    }

    #[test]
    fn test_bind_group_direction_matches_schedule() {
        for pass in blur_schedule(9) {
            assert_eq!(blur_direction(pass.source), pass.horizontal, "{:?}", pass);
        }
    }

    #[test]
    fn test_uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<BlurUniform>(), 16);
        assert_eq!(std::mem::size_of::<CompositeUniform>(), 16);
        assert_eq!(BlurUniform::new(true).horizontal, 1);
    }
}
