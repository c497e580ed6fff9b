//! # Graphics Module
//!
//! Everything that touches the GPU: the fly camera, procedural geometry,
//! textures and uniform bindings, the scene and the HDR render engine.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Fly camera driven by mouse and keyboard
//! - **Geometry** ([`geometry`]) - Sphere and cube generators
//! - **Rendering Pipeline** ([`rendering`]) - Scene pass, bloom blur and tone mapping
//! - **Resource Management** ([`resources`]) - Textures, cubemaps, materials and uniforms
//! - **Scene Management** ([`scene`]) - Building model, skybox and orbiting lights

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::{CameraManager, FlyCamera};
pub use rendering::render_engine::RenderEngine;
pub use scene::Scene;
