// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Handles render pipelines, the HDR targets and bloom chain, and frame rendering.

pub mod blur;
pub mod pipeline_manager;
pub mod post_process;
pub mod render_engine;
pub mod shaders;

// Re-export main types
pub use blur::{bloom_source, blur_schedule, BloomTarget, BlurPass};
pub use pipeline_manager::{DepthConfig, PipelineConfig, PipelineManager, PipelineStats};
pub use post_process::{HdrTargets, PostProcess};
pub use render_engine::{FrameStatus, RenderEngine};
