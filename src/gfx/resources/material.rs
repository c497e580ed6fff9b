//! Materials of the building model
//!
//! A material is a base color factor plus optional diffuse and normal maps.
//! Missing maps are replaced by shared 1x1 textures (white diffuse, flat
//! normal) so every material binds the same layout.

use std::collections::HashMap;

use super::texture_resource::TextureResource;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// CPU-side material description produced by the model loaders
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: String,
    pub base_color: [f32; 4],
    /// Index into the owning model's image list
    pub diffuse_image: Option<usize>,
    pub normal_image: Option<usize>,
    /// Fragments with alpha below this are discarded
    pub alpha_cutoff: Option<f32>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            diffuse_image: None,
            normal_image: None,
            alpha_cutoff: None,
        }
    }
}

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// x = alpha cutoff (0 disables), y = 1 when a normal map is bound
    pub flags: [f32; 4],
}

impl From<&MaterialData> for MaterialUniform {
    fn from(data: &MaterialData) -> Self {
        Self {
            base_color: data.base_color,
            flags: [
                data.alpha_cutoff.unwrap_or(0.0),
                if data.normal_image.is_some() { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Bind group layout shared by every material
///
/// Bindings: uniform, diffuse texture, normal texture, sampler.
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl MaterialBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        MaterialBindings { bind_group_layout }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }
}

/// Fallback textures bound where a material has no map
pub struct DefaultTextures {
    pub white: TextureResource,
    pub flat_normal: TextureResource,
}

impl DefaultTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            white: TextureResource::solid_color(device, queue, [255; 4], true, "White Texture"),
            flat_normal: TextureResource::solid_color(
                device,
                queue,
                [128, 128, 255, 255],
                false,
                "Flat Normal Texture",
            ),
        }
    }
}

/// Uploaded model images keyed by (image index, sRGB)
///
/// The same image may be referenced as color by one material and as data by
/// another, so the color space is part of the key.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<(usize, bool), TextureResource>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        images: &[image::RgbaImage],
        index: usize,
        srgb: bool,
    ) -> Option<&TextureResource> {
        let image = images.get(index)?;
        Some(self.textures.entry((index, srgb)).or_insert_with(|| {
            TextureResource::from_image(
                device,
                queue,
                image,
                srgb,
                &format!("Model Image {}", index),
            )
        }))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// A material ready for drawing
pub struct Material {
    pub name: String,
    _ubo: MaterialUBO,
    bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn create(
        device: &wgpu::Device,
        bindings: &MaterialBindings,
        data: &MaterialData,
        diffuse: &TextureResource,
        normal: &TextureResource,
    ) -> Self {
        let ubo = MaterialUBO::new_with_data(device, &MaterialUniform::from(data));
        let bind_group = BindGroupBuilder::new(&bindings.bind_group_layout)
            .resource(ubo.binding_resource())
            .texture(&diffuse.view)
            .texture(&normal.view)
            .sampler(&diffuse.sampler)
            .create(device, &format!("Material '{}' Bind Group", data.name));

        Self {
            name: data.name.clone(),
            _ubo: ubo,
            bind_group,
        }
    }

    /// Resolves the material's maps through the cache, falling back to defaults
    pub fn create_with_images(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &MaterialBindings,
        data: &MaterialData,
        images: &[image::RgbaImage],
        cache: &mut TextureCache,
        defaults: &DefaultTextures,
    ) -> Self {
        if let Some(index) = data.diffuse_image {
            cache.get_or_upload(device, queue, images, index, true);
        }
        if let Some(index) = data.normal_image {
            cache.get_or_upload(device, queue, images, index, false);
        }

        let diffuse = data
            .diffuse_image
            .and_then(|index| cache.textures.get(&(index, true)))
            .unwrap_or(&defaults.white);
        let normal = data
            .normal_image
            .and_then(|index| cache.textures.get(&(index, false)))
            .unwrap_or(&defaults.flat_normal);

        Self::create(device, bindings, data, diffuse, normal)
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_flags() {
        let data = MaterialData {
            normal_image: Some(3),
            alpha_cutoff: Some(0.5),
            ..MaterialData::default()
        };
        let uniform = MaterialUniform::from(&data);
        assert_eq!(uniform.flags, [0.5, 1.0, 0.0, 0.0]);
        assert_eq!(uniform.base_color, [0.8, 0.8, 0.8, 1.0]);

        let plain = MaterialUniform::from(&MaterialData::default());
        assert_eq!(plain.flags[1], 0.0);
    }
}
