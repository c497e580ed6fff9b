//! Per-object uniforms: transform and emission
//!
//! Bound at slot 1. The building uses one binding with an identity transform;
//! each orbit sphere has its own, rewritten every frame.

use cgmath::{Matrix, Matrix4, SquareMatrix};

use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// MUST match the `Object` struct in the scene shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb = emissive color, w = intensity
    pub emissive: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Matrix4<f32>, emissive: [f32; 3], intensity: f32) -> Self {
        let normal_matrix = model.invert().unwrap_or(model).transpose();
        Self {
            model: model.into(),
            normal_matrix: normal_matrix.into(),
            emissive: [emissive[0], emissive[1], emissive[2], intensity],
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity(), [0.0; 3], 0.0)
    }
}

pub struct ObjectBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl ObjectBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Object Bind Group Layout");
        Self { bind_group_layout }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn create_binding(
        &self,
        device: &wgpu::Device,
        initial: &ObjectUniform,
        label: &str,
    ) -> ObjectBinding {
        let ubo = UniformBuffer::new_with_data(device, initial);
        let bind_group = BindGroupBuilder::new(&self.bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, label);
        ObjectBinding { ubo, bind_group }
    }
}

/// Uniform buffer and bind group of one drawable
pub struct ObjectBinding {
    ubo: UniformBuffer<ObjectUniform>,
    bind_group: wgpu::BindGroup,
}

impl ObjectBinding {
    pub fn update(&mut self, queue: &wgpu::Queue, content: ObjectUniform) {
        self.ubo.update_content(queue, content);
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let model = Matrix4::from_nonuniform_scale(2.0, 1.0, 4.0);
        let uniform = ObjectUniform::new(model, [1.0, 0.5, 0.0], 3.0);
        assert_eq!(uniform.normal_matrix[0][0], 0.5);
        assert_eq!(uniform.normal_matrix[2][2], 0.25);
        assert_eq!(uniform.emissive, [1.0, 0.5, 0.0, 3.0]);
    }

    #[test]
    fn test_translation_does_not_leak_into_normals() {
        let model = Matrix4::from_translation(Vector3::new(5.0, -2.0, 1.0));
        let uniform = ObjectUniform::new(model, [0.0; 3], 0.0);
        let n = uniform.normal_matrix;
        // Inverse transpose of a translation moves it into the bottom row,
        // which the shader drops by using the upper 3x3
        for column in 0..3 {
            for row in 0..3 {
                let expected = if column == row { 1.0 } else { 0.0 };
                assert_eq!(n[column][row], expected);
            }
        }
    }

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 144);
    }
}
