use log::info;

use super::{mesh::Mesh, model::Model};
use crate::{
    config::{DemoConfig, RenderConfig},
    error::{DemoError, Result},
    gfx::{
        camera::{CameraController, CameraManager, FlyCamera},
        geometry::{generate_cube, generate_sphere},
        resources::{
            cubemap::{Cubemap, CubemapSource},
            material::{DefaultTextures, MaterialBindings},
            object_bindings::{ObjectBinding, ObjectBindings, ObjectUniform},
            texture_resource::{load_image, TextureResource},
        },
    },
    orbits::{sun_mask_from_image, OrbitSystem, NUM_ORBITS},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

/// Live-tunable shading and post-processing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub ambient_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub shininess: f32,
    pub exposure: f32,
    pub gamma: f32,
    pub blur_passes: u32,
    pub bright_threshold: f32,
}

impl From<&RenderConfig> for RenderParams {
    fn from(config: &RenderConfig) -> Self {
        Self {
            ambient_color: config.ambient_color,
            specular_color: config.specular_color,
            shininess: config.shininess,
            exposure: config.exposure,
            gamma: config.gamma,
            blur_passes: config.blur_passes,
            bright_threshold: config.bright_threshold,
        }
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

/// Bind group layouts of the scene pipelines, slot by slot
pub struct SceneLayouts {
    pub objects: ObjectBindings,
    pub materials: MaterialBindings,
    skybox: BindGroupLayoutWithDesc,
    emission: BindGroupLayoutWithDesc,
}

impl SceneLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let skybox = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Skybox Bind Group Layout");
        let emission = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Emission Bind Group Layout");

        Self {
            objects: ObjectBindings::new(device),
            materials: MaterialBindings::new(device),
            skybox,
            emission,
        }
    }

    pub fn skybox_layout(&self) -> &wgpu::BindGroupLayout {
        &self.skybox.layout
    }

    /// Emission map of the orbit bodies, slot 2 of the emissive pipeline
    pub fn emission_layout(&self) -> &wgpu::BindGroupLayout {
        &self.emission.layout
    }
}

struct SceneGpu {
    building: ObjectBinding,
    orbits: Vec<ObjectBinding>,
    _skybox: Cubemap,
    skybox_bind_group: wgpu::BindGroup,
    _sun: TextureResource,
    emission_bind_group: wgpu::BindGroup,
}

/// Everything drawn in the scene pass plus the camera looking at it
pub struct Scene {
    pub camera_manager: CameraManager,
    pub building: Model,
    pub orbit_mesh: Mesh,
    pub skybox_mesh: Mesh,
    pub orbits: OrbitSystem,
    pub params: RenderParams,
    skybox_faces: Option<[image::RgbaImage; 6]>,
    sun: Option<image::RgbaImage>,
    gpu: Option<SceneGpu>,
}

impl Scene {
    /// Loads every startup asset named by the configuration
    pub fn load(config: &DemoConfig, aspect: f32) -> Result<Self> {
        let building = Model::load(&config.assets.model_path())?;

        let sun = load_image(&config.assets.sun_texture_path())?;
        let mask = sun_mask_from_image(&sun);
        info!("sun mask {:.3}", mask);

        let skybox_faces = CubemapSource::from_config(&config.assets).load()?;

        let orbit_config = &config.orbits;
        let orbit_mesh = Mesh::from_geometry(
            "Orbit Sphere",
            &generate_sphere(
                orbit_config.sphere_radius,
                orbit_config.sphere_rings,
                orbit_config.sphere_slices,
            ),
        );
        let skybox_mesh = Mesh::from_geometry("Skybox Cube", &generate_cube(2.0));

        let camera_manager = CameraManager::new(
            FlyCamera::new(&config.camera, aspect),
            CameraController::from_config(&config.camera),
        );

        Ok(Self {
            camera_manager,
            building,
            orbit_mesh,
            skybox_mesh,
            orbits: OrbitSystem::new(orbit_config).with_color_mask(mask),
            params: RenderParams::from(&config.render),
            skybox_faces: Some(skybox_faces),
            sun: Some(sun),
            gpu: None,
        })
    }

    pub fn init_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &SceneLayouts,
    ) -> Result<()> {
        if self.gpu.is_some() {
            return Ok(());
        }

        let defaults = DefaultTextures::new(device, queue);
        self.building
            .init_gpu_resources(device, queue, &layouts.materials, &defaults);
        self.orbit_mesh.init_gpu_resources(device);
        self.skybox_mesh.init_gpu_resources(device);

        let faces = self
            .skybox_faces
            .take()
            .ok_or_else(|| DemoError::Cubemap("skybox faces already uploaded".to_string()))?;
        let skybox = Cubemap::create(device, queue, &faces, "Skybox")?;
        let skybox_bind_group = BindGroupBuilder::new(&layouts.skybox)
            .texture(&skybox.view)
            .sampler(&skybox.sampler)
            .create(device, "Skybox Bind Group");

        let sun_image = self
            .sun
            .take()
            .ok_or_else(|| DemoError::Gpu("sun texture already uploaded".to_string()))?;
        let sun = TextureResource::from_image(device, queue, &sun_image, true, "Sun Texture");
        let emission_bind_group = BindGroupBuilder::new(&layouts.emission)
            .texture(&sun.view)
            .sampler(&sun.sampler)
            .create(device, "Emission Bind Group");

        let building = layouts.objects.create_binding(
            device,
            &ObjectUniform::identity(),
            "Building Object Bind Group",
        );
        let orbits = (0..NUM_ORBITS)
            .map(|i| {
                layouts.objects.create_binding(
                    device,
                    &self.orbit_uniform(i),
                    &format!("Orbit {} Object Bind Group", i),
                )
            })
            .collect();

        self.gpu = Some(SceneGpu {
            building,
            orbits,
            _skybox: skybox,
            skybox_bind_group,
            _sun: sun,
            emission_bind_group,
        });
        Ok(())
    }

    fn orbit_uniform(&self, index: usize) -> ObjectUniform {
        ObjectUniform::new(
            self.orbits.model_matrix(index),
            self.orbits.color(index),
            self.orbits.intensity,
        )
    }

    /// Advances animation and camera by one frame
    pub fn update(&mut self, dt: f32) {
        self.orbits.advance(dt);
        self.camera_manager.update(dt);
    }

    /// Writes the per-object uniforms that changed this frame
    pub fn upload(&mut self, queue: &wgpu::Queue) {
        let uniforms: Vec<ObjectUniform> = (0..NUM_ORBITS).map(|i| self.orbit_uniform(i)).collect();
        if let Some(gpu) = self.gpu.as_mut() {
            for (binding, uniform) in gpu.orbits.iter_mut().zip(uniforms) {
                binding.update(queue, uniform);
            }
        }
    }

    /// Skybox: cube around the eye, sampled by direction
    pub fn draw_skybox(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        use super::mesh::DrawMesh;
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        render_pass.set_bind_group(1, &gpu.skybox_bind_group, &[]);
        render_pass.draw_mesh(&self.skybox_mesh);
    }

    /// Building with its own materials at slot 2
    pub fn draw_building(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        use super::model::DrawModel;
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        render_pass.set_bind_group(1, gpu.building.bind_group(), &[]);
        render_pass.draw_model(&self.building, 2);
    }

    /// The eight emissive orbit bodies, all sharing the sun emission map
    pub fn draw_orbits(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        use super::mesh::DrawMesh;
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        render_pass.set_bind_group(2, &gpu.emission_bind_group, &[]);
        for binding in &gpu.orbits {
            render_pass.set_bind_group(1, binding.bind_group(), &[]);
            render_pass.draw_mesh(&self.orbit_mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_follow_render_config() {
        let config = RenderConfig {
            gamma: 1.8,
            blur_passes: 4,
            ..RenderConfig::default()
        };
        let params = RenderParams::from(&config);
        assert_eq!(params.gamma, 1.8);
        assert_eq!(params.blur_passes, 4);
        assert_eq!(params.ambient_color, [0.0001; 3]);
        assert_eq!(params.specular_color, [0.1; 3]);
        assert_eq!(params.shininess, 32.0);
        assert_eq!(params.exposure, 1.0);
    }
}
