//! Skybox cubemap assembly
//!
//! Faces come either from six separate images or from one 4x3 horizontal
//! cross atlas. Either way they end up as a six layer texture in wgpu's layer
//! order: +X, -X, +Y, -Y, +Z, -Z.

use std::path::PathBuf;

use image::RgbaImage;

use super::texture_resource::load_image;
use crate::config::{AssetConfig, SkyboxConfig};
use crate::error::{DemoError, Result};

/// Tile positions (column, row) of each layer inside a horizontal cross
///
/// ```text
///        [+Y]
///   [-X] [+Z] [+X] [-Z]
///        [-Y]
/// ```
const CROSS_TILES: [(u32, u32); 6] = [(2, 1), (0, 1), (1, 0), (1, 2), (1, 1), (3, 1)];

#[derive(Debug, Clone, PartialEq)]
pub enum CubemapSource {
    Faces {
        right: PathBuf,
        left: PathBuf,
        top: PathBuf,
        bottom: PathBuf,
        front: PathBuf,
        back: PathBuf,
    },
    Cross(PathBuf),
}

impl CubemapSource {
    /// Resolves the configured skybox against the asset root
    pub fn from_config(assets: &AssetConfig) -> Self {
        match &assets.skybox {
            SkyboxConfig::Faces {
                right,
                left,
                top,
                bottom,
                front,
                back,
            } => CubemapSource::Faces {
                right: assets.resolve(right),
                left: assets.resolve(left),
                top: assets.resolve(top),
                bottom: assets.resolve(bottom),
                front: assets.resolve(front),
                back: assets.resolve(back),
            },
            SkyboxConfig::Cross { atlas } => CubemapSource::Cross(assets.resolve(atlas)),
        }
    }

    /// Decodes the source into six validated faces in layer order
    pub fn load(&self) -> Result<[RgbaImage; 6]> {
        let faces = match self {
            CubemapSource::Faces {
                right,
                left,
                top,
                bottom,
                front,
                back,
            } => {
                let [r, l, t, b, f, k] = [right, left, top, bottom, front, back].map(|p| load_image(p));
                [r?, l?, t?, b?, f?, k?]
            }
            CubemapSource::Cross(path) => extract_cross_faces(&load_image(path)?)?,
        };
        validate_faces(&faces)?;
        Ok(faces)
    }
}

/// Slices a 4x3 horizontal cross atlas into its six faces
pub fn extract_cross_faces(atlas: &RgbaImage) -> Result<[RgbaImage; 6]> {
    let (width, height) = atlas.dimensions();
    let face = width / 4;
    if face == 0 || width != face * 4 || height != face * 3 {
        return Err(DemoError::Cubemap(format!(
            "cross atlas must be 4x3 square tiles, got {}x{}",
            width, height
        )));
    }

    Ok(CROSS_TILES.map(|(column, row)| {
        image::imageops::crop_imm(atlas, column * face, row * face, face, face).to_image()
    }))
}

/// Checks that all faces are square and share one size, returning that size
pub fn validate_faces(faces: &[RgbaImage; 6]) -> Result<u32> {
    let size = faces[0].width();
    for (layer, face) in faces.iter().enumerate() {
        if face.width() != face.height() {
            return Err(DemoError::Cubemap(format!(
                "face {} is not square ({}x{})",
                layer,
                face.width(),
                face.height()
            )));
        }
        if face.width() != size {
            return Err(DemoError::Cubemap(format!(
                "face {} is {}px but face 0 is {}px",
                layer,
                face.width(),
                size
            )));
        }
    }
    if size == 0 {
        return Err(DemoError::Cubemap("faces are empty".to_string()));
    }
    Ok(size)
}

/// Six layer sRGB texture viewed as a cube
pub struct Cubemap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub face_size: u32,
}

impl Cubemap {
    pub fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[RgbaImage; 6],
        label: &str,
    ) -> Result<Self> {
        let face_size = validate_faces(faces)?;
        let face_extent = wgpu::Extent3d {
            width: face_size,
            height: face_size,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                depth_or_array_layers: 6,
                ..face_extent
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                face.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * face_size),
                    rows_per_image: Some(face_size),
                },
                face_extent,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{} View", label)),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::info!("created skybox cubemap ({}px faces)", face_size);

        Ok(Self {
            texture,
            view,
            sampler,
            face_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn tile_color(column: u32, row: u32) -> Rgba<u8> {
        Rgba([column as u8 * 60, row as u8 * 100, 7, 255])
    }

    fn cross_atlas(face: u32) -> RgbaImage {
        RgbaImage::from_fn(face * 4, face * 3, |x, y| tile_color(x / face, y / face))
    }

    #[test]
    fn test_cross_extraction_picks_tiles_in_layer_order() {
        let faces = extract_cross_faces(&cross_atlas(8)).unwrap();
        let expected = [(2, 1), (0, 1), (1, 0), (1, 2), (1, 1), (3, 1)];
        for (layer, (column, row)) in expected.iter().enumerate() {
            assert_eq!(faces[layer].dimensions(), (8, 8));
            assert_eq!(
                *faces[layer].get_pixel(3, 5),
                tile_color(*column, *row),
                "layer {}",
                layer
            );
        }
        assert_eq!(validate_faces(&faces).unwrap(), 8);
    }

    #[test]
    fn test_cross_with_wrong_aspect_is_rejected() {
        let atlas = RgbaImage::new(40, 40);
        assert!(matches!(
            extract_cross_faces(&atlas),
            Err(DemoError::Cubemap(_))
        ));
        assert!(extract_cross_faces(&RgbaImage::new(3, 2)).is_err());
    }

    #[test]
    fn test_mismatched_face_sizes_are_rejected() {
        let mut faces: [RgbaImage; 6] = std::array::from_fn(|_| RgbaImage::new(16, 16));
        assert_eq!(validate_faces(&faces).unwrap(), 16);

        faces[4] = RgbaImage::new(32, 32);
        let err = validate_faces(&faces).unwrap_err();
        assert!(err.to_string().contains("face 4"));

        faces[4] = RgbaImage::new(16, 8);
        assert!(validate_faces(&faces).unwrap_err().to_string().contains("not square"));
    }

    #[test]
    fn test_source_resolves_against_asset_root() {
        let assets = AssetConfig {
            root: PathBuf::from("assets"),
            skybox: SkyboxConfig::Cross {
                atlas: PathBuf::from("sky/cross.png"),
            },
            ..AssetConfig::default()
        };
        assert_eq!(
            CubemapSource::from_config(&assets),
            CubemapSource::Cross(PathBuf::from("assets/sky/cross.png"))
        );
    }
}
