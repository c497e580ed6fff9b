//! GPU resource management
//!
//! Textures, the skybox cubemap, materials and the uniform bindings shared by
//! the scene pipelines.

pub mod cubemap;
pub mod global_bindings;
pub mod material;
pub mod object_bindings;
pub mod texture_resource;

pub use cubemap::{Cubemap, CubemapSource};
pub use global_bindings::{GlobalBindings, GlobalUBOContent};
pub use material::{DefaultTextures, Material, MaterialBindings, MaterialData, TextureCache};
pub use object_bindings::{ObjectBinding, ObjectBindings, ObjectUniform};
pub use texture_resource::TextureResource;
