//! WGPU-based rendering engine for the orbit-bloom demo
//!
//! Owns the surface, device and every render target. A frame is recorded as
//! one scene pass into two HDR targets, a chain of blur passes over the bright
//! target, a composite pass onto the surface and an optional UI overlay.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use wgpu::TextureFormat;

use crate::error::{DemoError, Result};
use crate::gfx::{
    resources::{global_bindings::GlobalBindings, texture_resource::TextureResource},
    scene::{Scene, SceneLayouts},
};

use super::blur::{blur_schedule, bloom_source};
use super::pipeline_manager::{DepthConfig, PipelineConfig, PipelineManager};
use super::post_process::{HdrTargets, PostProcess};
use super::shaders;

const SKYBOX: &str = "skybox";
const PHONG: &str = "phong";
const EMISSIVE: &str = "emissive";
const BLUR: &str = "blur";
const COMPOSITE: &str = "composite";

/// Outcome of one call to [`RenderEngine::render_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The surface was unavailable; nothing was drawn this frame
    Skipped,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    global_bindings: GlobalBindings,
    layouts: SceneLayouts,
    targets: HdrTargets,
    post: PostProcess,
    shader_dir: PathBuf,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// Requests an adapter compatible with the window surface, picks a
    /// non-sRGB surface format (the composite pass applies gamma itself),
    /// allocates the HDR targets and builds every pipeline.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
        shader_dir: PathBuf,
    ) -> Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| DemoError::Gpu(format!("failed to create surface: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| DemoError::Gpu(format!("no suitable adapter: {}", e)))?;
        info!("using adapter {:?}", adapter.get_info().name);

        let max_dimension = adapter.limits().max_texture_dimension_2d;
        let (width, height) = clamp_surface_size(width, height, max_dimension);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: max_dimension,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| DemoError::Gpu(format!("failed to request device: {}", e)))?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| DemoError::Gpu("surface reports no formats".to_string()))?;
        if format.is_srgb() {
            warn!("only sRGB surface formats available, output will be gamma corrected twice");
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: present_mode(vsync),
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        debug!("surface configured as {:?} {}x{}", format, width, height);

        let global_bindings = GlobalBindings::new(&device);
        let layouts = SceneLayouts::new(&device);
        let targets = HdrTargets::new(&device, width, height);
        let post = PostProcess::new(&device, &targets);

        let mut engine = RenderEngine {
            surface,
            pipeline_manager: PipelineManager::new(device.clone()),
            device,
            queue,
            config,
            format,
            global_bindings,
            layouts,
            targets,
            post,
            shader_dir,
        };

        engine.load_shaders()?;
        engine.register_pipelines();
        engine
            .pipeline_manager
            .create_all_pipelines()
            .map_err(|errors| DemoError::Gpu(errors.join("; ")))?;

        let stats = engine.pipeline_manager.get_stats();
        info!(
            "render engine ready: {} pipelines, {} shaders",
            stats.total_pipelines, stats.loaded_shaders
        );
        Ok(engine)
    }

    fn load_shaders(&mut self) -> Result<()> {
        for (name, _) in shaders::SHADERS {
            let source = shaders::resolve_source(&self.shader_dir, name)?;
            self.pipeline_manager.load_shader(name, &source)?;
        }
        Ok(())
    }

    fn register_pipelines(&mut self) {
        let hdr_formats = [TextureResource::HDR_FORMAT, TextureResource::HDR_FORMAT];
        let globals = self.global_bindings.layout().clone();

        self.pipeline_manager.register_pipeline(
            SKYBOX,
            PipelineConfig::default_with_shader(SKYBOX)
                .with_label("Skybox Pipeline")
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![
                    globals.clone(),
                    self.layouts.skybox_layout().clone(),
                ])
                .with_depth(DepthConfig::read_only(TextureResource::DEPTH_FORMAT))
                .with_color_formats(&hdr_formats),
        );

        self.pipeline_manager.register_pipeline(
            PHONG,
            PipelineConfig::default_with_shader(PHONG)
                .with_label("Phong Pipeline")
                .with_bind_group_layouts(vec![
                    globals.clone(),
                    self.layouts.objects.layout().clone(),
                    self.layouts.materials.layout().clone(),
                ])
                .with_depth(DepthConfig::new(TextureResource::DEPTH_FORMAT))
                .with_color_formats(&hdr_formats),
        );

        self.pipeline_manager.register_pipeline(
            EMISSIVE,
            PipelineConfig::default_with_shader(EMISSIVE)
                .with_label("Emissive Pipeline")
                .with_bind_group_layouts(vec![
                    globals,
                    self.layouts.objects.layout().clone(),
                    self.layouts.emission_layout().clone(),
                ])
                .with_depth(DepthConfig::new(TextureResource::DEPTH_FORMAT))
                .with_color_formats(&hdr_formats),
        );

        self.pipeline_manager.register_pipeline(
            BLUR,
            PipelineConfig::default_with_shader(BLUR)
                .with_label("Blur Pipeline")
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_bind_group_layouts(vec![self.post.blur_layout().clone()])
                .with_color_formats(&[TextureResource::HDR_FORMAT]),
        );

        self.pipeline_manager.register_pipeline(
            COMPOSITE,
            PipelineConfig::default_with_shader(COMPOSITE)
                .with_label("Composite Pipeline")
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_bind_group_layouts(vec![self.post.composite_layout().clone()])
                .with_color_formats(&[self.format]),
        );
    }

    /// Recompiles every shader from the override directory
    ///
    /// A shader that fails to compile keeps its previous module and pipelines;
    /// the failure is logged and counted. Returns the number of pipelines that
    /// were rebuilt.
    pub fn reload_shaders(&mut self) -> usize {
        let mut rebuilt = 0;
        let mut failed = 0;
        for (name, _) in shaders::SHADERS {
            let result = shaders::resolve_source(&self.shader_dir, name)
                .and_then(|source| self.pipeline_manager.hot_reload_shader(name, &source));
            match result {
                Ok(pipelines) => rebuilt += pipelines.len(),
                Err(e) => {
                    error!("{}", e);
                    failed += 1;
                }
            }
        }
        info!(
            "shader reload from {}: {} pipelines rebuilt, {} shaders failed",
            self.shader_dir.display(),
            rebuilt,
            failed
        );
        rebuilt
    }

    /// Prepares the scene's GPU resources against this engine's layouts
    pub fn init_scene(&self, scene: &mut Scene) -> Result<()> {
        scene.init_gpu_resources(&self.device, &self.queue, &self.layouts)
    }

    /// Renders one frame of `scene`
    ///
    /// The UI callback runs last and draws straight onto the surface view.
    pub fn render_frame<F>(&mut self, scene: &mut Scene, ui_callback: Option<F>) -> Result<FrameStatus>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(FrameStatus::Skipped);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timed out, skipping frame");
                return Ok(FrameStatus::Skipped);
            }
            Err(e) => return Err(e.into()),
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let params = scene.params;
        self.global_bindings.update(
            &self.queue,
            &scene.camera_manager.camera.uniform,
            &params,
            &scene.orbits.light_set(),
        );
        self.post
            .update_composite(&self.queue, params.exposure, params.gamma);
        scene.upload(&self.queue);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // PASS 1: scene into the HDR and bright targets
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[
                    Some(clear_attachment(&self.targets.hdr.view)),
                    Some(clear_attachment(&self.targets.bright.view)),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

            if let Some(pipeline) = self.pipeline_manager.pipeline(SKYBOX) {
                render_pass.set_pipeline(pipeline);
                scene.draw_skybox(&mut render_pass);
            }
            if let Some(pipeline) = self.pipeline_manager.pipeline(PHONG) {
                render_pass.set_pipeline(pipeline);
                scene.draw_building(&mut render_pass);
            }
            if let Some(pipeline) = self.pipeline_manager.pipeline(EMISSIVE) {
                render_pass.set_pipeline(pipeline);
                scene.draw_orbits(&mut render_pass);
            }
        }

        // PASS 2: separable blur, ping-ponging between the two targets
        if let Some(pipeline) = self.pipeline_manager.pipeline(BLUR) {
            for pass in blur_schedule(params.blur_passes) {
                let Some(bind_group) = self.post.blur_bind_group(pass.source) else {
                    continue;
                };
                let mut blur_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Blur Pass"),
                    color_attachments: &[Some(clear_attachment(
                        &self.targets.pingpong[pass.target].view,
                    ))],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                blur_pass.set_pipeline(pipeline);
                blur_pass.set_bind_group(0, bind_group, &[]);
                blur_pass.draw(0..3, 0..1);
            }
        }

        // PASS 3: tone map HDR + bloom onto the surface
        {
            let bloom = bloom_source(params.blur_passes);
            trace!("composite reads {:?}", bloom);

            let mut composite_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(clear_attachment(&surface_texture_view))],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let (Some(pipeline), Some(bind_group)) = (
                self.pipeline_manager.pipeline(COMPOSITE),
                self.post.composite_bind_group(bloom),
            ) {
                composite_pass.set_pipeline(pipeline);
                composite_pass.set_bind_group(0, bind_group, &[]);
                composite_pass.draw(0..3, 0..1);
            }
        }

        // PASS 4: UI overlay (if provided)
        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.device,
                &self.queue,
                &mut encoder,
                &surface_texture_view,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(FrameStatus::Presented)
    }

    /// Resizes the surface and every size-dependent target
    ///
    /// Zero dimensions (a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (width, height) =
            clamp_surface_size(width, height, self.device.limits().max_texture_dimension_2d);

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        if self.targets.resize(&self.device, width, height) {
            self.post.rebuild_bind_groups(&self.device, &self.targets);
        }
    }

    /// Current surface dimensions, after clamping to the texture limit
    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the surface texture format
    pub fn surface_format(&self) -> TextureFormat {
        self.format
    }

    pub fn shader_dir(&self) -> &Path {
        &self.shader_dir
    }
}

/// Keeps the surface and the render targets inside the device's texture limit
fn clamp_surface_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    (
        width.clamp(1, max_dimension),
        height.clamp(1, max_dimension),
    )
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::Immediate
    }
}

fn clear_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vsync_selects_fifo() {
        assert_eq!(present_mode(true), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(false), wgpu::PresentMode::Immediate);
    }

    #[test]
    fn test_surface_size_clamped_to_texture_limit() {
        assert_eq!(clamp_surface_size(5120, 2880, 4096), (4096, 2880));
        assert_eq!(clamp_surface_size(1280, 720, 8192), (1280, 720));
        assert_eq!(clamp_surface_size(0, 0, 4096), (1, 1));
    }

    #[test]
    fn test_every_pipeline_has_a_shader() {
        for name in [SKYBOX, PHONG, EMISSIVE, BLUR, COMPOSITE] {
            assert!(shaders::embedded(name).is_some(), "{}", name);
        }
    }
}
