//! WGSL sources of the render passes
//!
//! Every shader is embedded in the binary. A file with the same name in the
//! configured shader directory takes precedence, which is what F5 reloads.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{DemoError, Result};

pub const PHONG: &str = include_str!("shaders/phong.wgsl");
pub const EMISSIVE: &str = include_str!("shaders/emissive.wgsl");
pub const SKYBOX: &str = include_str!("shaders/skybox.wgsl");
pub const BLUR: &str = include_str!("shaders/blur.wgsl");
pub const COMPOSITE: &str = include_str!("shaders/composite.wgsl");

/// Shader names and their embedded sources
pub const SHADERS: [(&str, &str); 5] = [
    ("phong", PHONG),
    ("emissive", EMISSIVE),
    ("skybox", SKYBOX),
    ("blur", BLUR),
    ("composite", COMPOSITE),
];

pub fn embedded(name: &str) -> Option<&'static str> {
    SHADERS
        .iter()
        .find(|(shader, _)| *shader == name)
        .map(|(_, source)| *source)
}

/// Source for `name`: `<dir>/<name>.wgsl` when present, the embedded copy otherwise
pub fn resolve_source(dir: &Path, name: &str) -> Result<Cow<'static, str>> {
    let path = dir.join(format!("{}.wgsl", name));
    if path.is_file() {
        let source = std::fs::read_to_string(&path).map_err(|e| DemoError::io(&path, e))?;
        log::debug!("using shader override {}", path.display());
        return Ok(Cow::Owned(source));
    }

    embedded(name)
        .map(Cow::Borrowed)
        .ok_or_else(|| DemoError::Gpu(format!("unknown shader '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shader_has_both_entry_points() {
        for (name, source) in SHADERS {
            assert!(source.contains("fn vs_main"), "{} lacks vs_main", name);
            assert!(source.contains("fn fs_main"), "{} lacks fs_main", name);
        }
    }

    #[test]
    fn test_scene_shaders_write_two_targets() {
        for source in [PHONG, EMISSIVE, SKYBOX] {
            assert!(source.contains("@location(1) bright"));
        }
    }

    #[test]
    fn test_orbits_sample_emission_map() {
        assert!(EMISSIVE.contains("@group(2) @binding(0) var emission_map: texture_2d<f32>"));
        assert!(EMISSIVE.contains("@group(2) @binding(1) var emission_sampler: sampler"));
        assert!(EMISSIVE.contains("textureSample(emission_map, emission_sampler, in.tex_coords)"));
    }

    #[test]
    fn test_missing_override_falls_back_to_embedded() {
        let source = resolve_source(Path::new("no/such/dir"), "blur").unwrap();
        assert!(matches!(source, Cow::Borrowed(_)));
        assert_eq!(source, BLUR);
        assert!(resolve_source(Path::new("no/such/dir"), "bloom").is_err());
    }

    #[test]
    fn test_override_file_wins() {
        let dir = std::env::temp_dir().join(format!("orbit-bloom-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("composite.wgsl"), "// custom").unwrap();

        let source = resolve_source(&dir, "composite").unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(source, "// custom");
    }
}
