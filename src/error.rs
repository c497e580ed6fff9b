//! Error types for the demo
//!
//! Every fallible library operation returns [`Result`]. The binary wraps these
//! in `anyhow` at the top level.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading assets, configuring the GPU or rendering a frame
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to import glTF model {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("failed to load OBJ model {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("invalid cubemap: {0}")]
    Cubemap(String),

    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(String),

    #[error("unsupported model file {0}")]
    UnsupportedModel(PathBuf),

    #[error("windowing error: {0}")]
    Window(String),

    #[error("GPU initialisation failed: {0}")]
    Gpu(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

pub type Result<T> = std::result::Result<T, DemoError>;

impl DemoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DemoError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        DemoError::Image {
            path: path.into(),
            source,
        }
    }
}
