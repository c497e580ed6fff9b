//! Render pipeline management system for wgpu
//!
//! Provides pipeline creation, caching, and shader hot-reloading. Shader
//! compilation runs inside a validation error scope so a broken WGSL edit is
//! reported instead of aborting the process.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use wgpu::*;

use crate::error::{DemoError, Result};
use crate::gfx::scene::vertex::Vertex3D;

/// Depth test state of a pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthConfig {
    pub format: TextureFormat,
    pub write_enabled: bool,
    pub compare: CompareFunction,
}

impl DepthConfig {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            write_enabled: true,
            compare: CompareFunction::Less,
        }
    }

    /// Tests against the scene but never writes; draws at the far plane pass
    pub fn read_only(format: TextureFormat) -> Self {
        Self {
            format,
            write_enabled: false,
            compare: CompareFunction::LessEqual,
        }
    }
}

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub depth: Option<DepthConfig>,
    pub multisample: MultisampleState,
    pub color_targets: Vec<Option<ColorTargetState>>,
    /// Fullscreen passes generate their triangle from the vertex index
    pub no_vertex_buffers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "shader.wgsl".to_string(),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            depth: None,
            multisample: MultisampleState::default(),
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Bgra8Unorm,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            no_vertex_buffers: false,
        }
    }
}

impl PipelineConfig {
    pub fn default_with_shader(shader: &str) -> Self {
        Self {
            shader: shader.to_string(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_depth(mut self, depth: DepthConfig) -> Self {
        self.depth = Some(depth);
        self
    }

    /// One replace-blended target per format, in attachment order
    pub fn with_color_formats(mut self, formats: &[TextureFormat]) -> Self {
        self.color_targets = formats
            .iter()
            .map(|&format| {
                Some(ColorTargetState {
                    format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })
            })
            .collect();
        self
    }

    pub fn with_no_vertex_buffers(mut self) -> Self {
        self.no_vertex_buffers = true;
        self
    }
}

/// Manages render pipelines with caching and shader hot-reloading
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<String, RenderPipeline>,
    pipeline_configs: HashMap<String, PipelineConfig>,
    shader_modules: HashMap<String, ShaderModule>,
    pending_pipelines: Vec<String>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            pipelines: HashMap::new(),
            pipeline_configs: HashMap::new(),
            shader_modules: HashMap::new(),
            pending_pipelines: Vec::new(),
        }
    }

    /// Registers a pipeline configuration without creating it
    ///
    /// Re-registering a name replaces its configuration and drops the old
    /// pipeline, which is how pipelines pick up new target formats.
    pub fn register_pipeline(&mut self, name: &str, config: PipelineConfig) {
        self.pipelines.remove(name);
        self.pipeline_configs.insert(name.to_string(), config);
        if !self.pending_pipelines.iter().any(|n| n == name) {
            self.pending_pipelines.push(name.to_string());
        }
    }

    /// Compiles a WGSL shader module
    ///
    /// The previously loaded module under `name` is kept when compilation fails.
    pub fn load_shader(&mut self, name: &str, source: &str) -> Result<()> {
        let shader_module = self.compile_shader(name, source)?;
        self.shader_modules.insert(name.to_string(), shader_module);
        Ok(())
    }

    fn compile_shader(&self, name: &str, source: &str) -> Result<ShaderModule> {
        self.device.push_error_scope(ErrorFilter::Validation);
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DemoError::Gpu(format!("shader '{}' failed to compile: {}", name, e)));
        }

        debug!("compiled shader '{}'", name);
        Ok(shader_module)
    }

    /// Looks up an already created pipeline
    pub fn pipeline(&self, name: &str) -> Option<&RenderPipeline> {
        self.pipelines.get(name)
    }

    /// Creates all pending pipelines immediately
    pub fn create_all_pipelines(&mut self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let pending = self.pending_pipelines.clone();

        for name in pending {
            if let Some(config) = self.pipeline_configs.get(&name).cloned() {
                match self.create_pipeline_from_config(&name, &config) {
                    Ok(pipeline) => {
                        self.pipelines.insert(name.clone(), pipeline);
                        self.pending_pipelines.retain(|n| n != &name);
                    }
                    Err(e) => errors.push(format!("Pipeline '{}': {}", name, e)),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Hot-reloads a shader and recreates affected pipelines
    ///
    /// The new module and pipelines replace the old ones only when every
    /// affected pipeline builds; otherwise nothing changes.
    ///
    /// # Returns
    /// List of pipeline names that were recreated
    pub fn hot_reload_shader(&mut self, shader_name: &str, new_source: &str) -> Result<Vec<String>> {
        let shader_module = self.compile_shader(shader_name, new_source)?;

        let mut affected_pipelines: Vec<String> = self
            .pipeline_configs
            .iter()
            .filter(|(_, config)| config.shader == shader_name)
            .map(|(name, _)| name.clone())
            .collect();
        affected_pipelines.sort();

        let rebuilt = build_all(&affected_pipelines, |name| {
            let config = self
                .pipeline_configs
                .get(name)
                .ok_or_else(|| DemoError::Gpu(format!("Pipeline '{}' not registered", name)))?;
            self.build_pipeline(name, config, &shader_module)
        })?;

        for (name, pipeline) in rebuilt {
            self.pending_pipelines.retain(|n| n != &name);
            self.pipelines.insert(name, pipeline);
        }
        self.shader_modules
            .insert(shader_name.to_string(), shader_module);

        info!(
            "reloaded shader '{}' ({} pipelines)",
            shader_name,
            affected_pipelines.len()
        );
        Ok(affected_pipelines)
    }

    fn create_pipeline_from_config(
        &self,
        name: &str,
        config: &PipelineConfig,
    ) -> Result<RenderPipeline> {
        let shader = self
            .shader_modules
            .get(&config.shader)
            .ok_or_else(|| DemoError::Gpu(format!("Shader '{}' not found", config.shader)))?;
        self.build_pipeline(name, config, shader)
    }

    fn build_pipeline(
        &self,
        name: &str,
        config: &PipelineConfig,
        shader: &ShaderModule,
    ) -> Result<RenderPipeline> {
        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", name)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let vertex_buffers: &[VertexBufferLayout] = if config.no_vertex_buffers {
            &[]
        } else {
            &[Vertex3D::desc()]
        };

        let depth_stencil = config.depth.map(|depth| DepthStencilState {
            format: depth.format,
            depth_write_enabled: depth.write_enabled,
            depth_compare: depth.compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        self.device.push_error_scope(ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: vertex_buffers,
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &config.color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: config.multisample,
                multiview: None,
                cache: None,
            });
        if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DemoError::Gpu(e.to_string()));
        }

        debug!("created pipeline '{}'", name);
        Ok(pipeline)
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            total_pipelines: self.pipelines.len(),
            pending_pipelines: self.pending_pipelines.len(),
            loaded_shaders: self.shader_modules.len(),
        }
    }
}

/// Builds one item per name, or none at all if any build fails
fn build_all<T>(
    names: &[String],
    mut build: impl FnMut(&str) -> Result<T>,
) -> Result<Vec<(String, T)>> {
    names
        .iter()
        .map(|name| {
            build(name)
                .map(|item| (name.clone(), item))
                .map_err(|e| DemoError::Gpu(format!("pipeline '{}': {}", name, e)))
        })
        .collect()
}

/// Statistics about pipeline manager state
#[derive(Debug)]
pub struct PipelineStats {
    pub total_pipelines: usize,
    pub pending_pipelines: usize,
    pub loaded_shaders: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_formats_become_targets_in_order() {
        let config = PipelineConfig::default_with_shader("phong").with_color_formats(&[
            TextureFormat::Rgba16Float,
            TextureFormat::Rgba16Float,
        ]);
        assert_eq!(config.color_targets.len(), 2);
        assert!(config
            .color_targets
            .iter()
            .all(|t| t.as_ref().map(|t| t.format) == Some(TextureFormat::Rgba16Float)));
    }

    #[test]
    fn test_build_all_is_all_or_nothing() {
        let names: Vec<String> = ["blur", "composite", "phong"]
            .iter()
            .map(|n| n.to_string())
            .collect();

        let mut attempts = Vec::new();
        let result = build_all(&names, |name| {
            attempts.push(name.to_string());
            if name == "composite" {
                Err(DemoError::Gpu("bad entry point".to_string()))
            } else {
                Ok(name.len())
            }
        });
        assert!(result.is_err());
        assert_eq!(attempts, ["blur", "composite"]);

        let built = build_all(&names, |name| Ok(name.len())).unwrap();
        assert_eq!(built.len(), 3);
        assert_eq!(built[2], ("phong".to_string(), 5));
    }

    #[test]
    fn test_read_only_depth_passes_far_plane() {
        let depth = DepthConfig::read_only(TextureFormat::Depth32Float);
        assert!(!depth.write_enabled);
        assert_eq!(depth.compare, CompareFunction::LessEqual);
        assert!(DepthConfig::new(TextureFormat::Depth32Float).write_enabled);
    }
}
