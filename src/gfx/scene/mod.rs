//! # Scene Management Module
//!
//! Vertex format, GPU meshes, model loading and the scene container that
//! owns everything the scene pass draws.
//!
//! ## Key Components
//!
//! - [`Scene`] - building model, skybox cube, orbit spheres, camera and render parameters
//! - [`Model`] - meshes and materials loaded from glTF/GLB or OBJ
//! - [`Mesh`] - CPU vertex data with lazily created GPU buffers
//! - [`Vertex3D`] - position, normal and texture coordinates

pub mod mesh;
pub mod model;
pub mod scene;
pub mod vertex;

pub use mesh::{DrawMesh, Mesh};
pub use model::{DrawModel, Model};
pub use scene::{RenderParams, Scene, SceneLayouts};
pub use vertex::Vertex3D;
