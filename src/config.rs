//! Demo configuration
//!
//! All settings have defaults matching the stock demo scene, so a config file
//! only needs the keys it wants to change:
//!
//! ```toml
//! [window]
//! width = 1280
//! vsync = false
//!
//! [render]
//! gamma = 2.4
//! blur_passes = 6
//!
//! [assets.skybox.cross]
//! atlas = "textures/skybox_cross.png"
//! ```

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::error::{DemoError, Result};

/// Upper bound on ping-pong blur passes
pub const MAX_BLUR_PASSES: u32 = 64;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub render: RenderConfig,
    pub orbits: OrbitConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Orbit Bloom".to_string(),
            width: 1000,
            height: 650,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory every other asset path is resolved against
    pub root: PathBuf,
    pub model: PathBuf,
    pub sun_texture: PathBuf,
    pub skybox: SkyboxConfig,
    /// Directory searched for WGSL overrides; embedded shaders are used otherwise
    pub shader_dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("resources"),
            model: PathBuf::from("objects/sponza.glb"),
            sun_texture: PathBuf::from("textures/sun.jpg"),
            skybox: SkyboxConfig::default(),
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

impl AssetConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model)
    }

    pub fn sun_texture_path(&self) -> PathBuf {
        self.resolve(&self.sun_texture)
    }

    pub fn shader_dir_path(&self) -> PathBuf {
        self.resolve(&self.shader_dir)
    }
}

/// Where the six skybox faces come from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyboxConfig {
    Faces {
        right: PathBuf,
        left: PathBuf,
        top: PathBuf,
        bottom: PathBuf,
        front: PathBuf,
        back: PathBuf,
    },
    /// A single 4x3 horizontal cross atlas
    Cross { atlas: PathBuf },
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        SkyboxConfig::Faces {
            right: PathBuf::from("textures/right.jpg"),
            left: PathBuf::from("textures/left.jpg"),
            top: PathBuf::from("textures/top.jpg"),
            bottom: PathBuf::from("textures/bottom.jpg"),
            front: PathBuf::from("textures/front.jpg"),
            back: PathBuf::from("textures/back.jpg"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    /// World units per second
    pub move_speed: f32,
    /// Radians per pixel of mouse motion
    pub mouse_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [-1.0, 2.0, -0.5],
            target: [0.0, 0.0, 0.0],
            fovy: 45.0,
            znear: 0.01,
            zfar: 1000.0,
            move_speed: 5.4,
            mouse_sensitivity: 0.003,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub ambient_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub shininess: f32,
    pub exposure: f32,
    pub gamma: f32,
    pub blur_passes: u32,
    /// Luminance above which a fragment feeds the bloom
    pub bright_threshold: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ambient_color: [0.0001, 0.0001, 0.0001],
            specular_color: [0.1, 0.1, 0.1],
            shininess: 32.0,
            exposure: 1.0,
            gamma: 2.2,
            blur_passes: 10,
            bright_threshold: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Radians per second
    pub spin_speed: f32,
    pub body_scale: f32,
    pub intensity: f32,
    pub sphere_radius: f32,
    pub sphere_rings: u32,
    pub sphere_slices: u32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            spin_speed: 0.0,
            body_scale: 0.2,
            intensity: 3.0,
            sphere_radius: 0.2,
            sphere_rings: 64,
            sphere_slices: 64,
        }
    }
}

impl DemoConfig {
    /// Loads and validates a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| DemoError::io(path, source))?;
        let config = Self::from_toml(&content).map_err(|err| match err {
            ParseFailure::Toml(source) => DemoError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Invalid(err) => err,
        })?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates config text
    pub fn parse(content: &str) -> Result<Self> {
        Self::from_toml(content).map_err(|err| match err {
            ParseFailure::Toml(source) => DemoError::Config(source.to_string()),
            ParseFailure::Invalid(err) => err,
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, ParseFailure> {
        let config: DemoConfig = toml::from_str(content).map_err(ParseFailure::Toml)?;
        config.validate().map_err(ParseFailure::Invalid)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(DemoError::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if !(1.0..=3.0).contains(&self.render.gamma) {
            return Err(DemoError::Config(format!(
                "gamma must be within [1, 3], got {}",
                self.render.gamma
            )));
        }
        if self.render.exposure <= 0.0 {
            return Err(DemoError::Config(format!(
                "exposure must be positive, got {}",
                self.render.exposure
            )));
        }
        if self.render.blur_passes > MAX_BLUR_PASSES {
            return Err(DemoError::Config(format!(
                "blur_passes must be at most {MAX_BLUR_PASSES}, got {}",
                self.render.blur_passes
            )));
        }
        if self.camera.fovy <= 0.0 || self.camera.fovy >= 180.0 {
            return Err(DemoError::Config(format!(
                "camera fovy must be within (0, 180), got {}",
                self.camera.fovy
            )));
        }
        if self.camera.znear <= 0.0 || self.camera.zfar <= self.camera.znear {
            return Err(DemoError::Config(format!(
                "camera clip planes must satisfy 0 < znear < zfar, got {} / {}",
                self.camera.znear, self.camera.zfar
            )));
        }
        if self.orbits.sphere_rings < 2 || self.orbits.sphere_slices < 3 {
            return Err(DemoError::Config(
                "orbit spheres need at least 2 rings and 3 slices".to_string(),
            ));
        }
        Ok(())
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(DemoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_scene() {
        let config = DemoConfig::default();
        assert_eq!(config.window.width, 1000);
        assert_eq!(config.window.height, 650);
        assert_eq!(config.camera.position, [-1.0, 2.0, -0.5]);
        assert_eq!(config.camera.fovy, 45.0);
        assert_eq!(config.render.gamma, 2.2);
        assert_eq!(config.render.blur_passes, 10);
        assert_eq!(config.orbits.body_scale, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = DemoConfig::parse("").unwrap();
        assert_eq!(config.render.exposure, 1.0);
        assert_eq!(config.assets.model, PathBuf::from("objects/sponza.glb"));
    }

    #[test]
    fn test_partial_override() {
        let config = DemoConfig::parse(
            r#"
            [window]
            width = 1920
            vsync = false

            [render]
            gamma = 2.4
            blur_passes = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.height, 650);
        assert!(!config.window.vsync);
        assert_eq!(config.render.gamma, 2.4);
        assert_eq!(config.render.blur_passes, 4);
        assert_eq!(config.render.shininess, 32.0);
    }

    #[test]
    fn test_cross_skybox() {
        let config = DemoConfig::parse(
            r#"
            [assets.skybox.cross]
            atlas = "textures/cross.png"
            "#,
        )
        .unwrap();

        match config.assets.skybox {
            SkyboxConfig::Cross { atlas } => assert_eq!(atlas, PathBuf::from("textures/cross.png")),
            other => panic!("expected cross skybox, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DemoConfig::parse("[render]\ngamma = 5.0").is_err());
        assert!(DemoConfig::parse("[render]\nblur_passes = 1000").is_err());
        assert!(DemoConfig::parse("[window]\nwidth = 0").is_err());
        assert!(DemoConfig::parse("[camera]\nznear = 10.0\nzfar = 1.0").is_err());
        assert!(DemoConfig::parse("[render]\ngamma = \"high\"").is_err());
    }

    #[test]
    fn test_asset_paths_resolve_against_root() {
        let mut assets = AssetConfig::default();
        assets.root = PathBuf::from("/data/scene");
        assert_eq!(
            assets.model_path(),
            PathBuf::from("/data/scene/objects/sponza.glb")
        );
        assert_eq!(assets.shader_dir_path(), PathBuf::from("/data/scene/shaders"));
    }
}
