//! Static model loading
//!
//! The building is loaded once at startup from glTF/GLB (preferred) or
//! Wavefront OBJ. Node transforms are baked into the vertices so the model is
//! drawn with a single identity transform.

use std::path::Path;

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix, Matrix3, Matrix4, Point3, SquareMatrix, Transform, Vector3,
};
use log::{debug, info, warn};

use super::mesh::{DrawMesh, Mesh};
use crate::error::{DemoError, Result};
use crate::gfx::resources::material::{
    DefaultTextures, Material, MaterialBindings, MaterialData, TextureCache,
};
use crate::gfx::resources::texture_resource::load_image;

/// A loaded model: meshes, their materials and the images those reference
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<MaterialData>,
    pub images: Vec<image::RgbaImage>,
    gpu_materials: Vec<Material>,
}

impl Model {
    /// Loads a model, choosing the importer from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let model = match extension.as_deref() {
            Some("glb") | Some("gltf") => load_gltf(path)?,
            Some("obj") => load_obj(path)?,
            _ => return Err(DemoError::UnsupportedModel(path.to_path_buf())),
        };

        info!(
            "loaded model {}: {} meshes, {} triangles, {} materials, {} images",
            path.display(),
            model.meshes.len(),
            model.triangle_count(),
            model.materials.len(),
            model.images.len()
        );
        Ok(model)
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Uploads meshes, textures and material bind groups
    ///
    /// Decoded images are released afterwards; they live on the GPU from here.
    pub fn init_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &MaterialBindings,
        defaults: &DefaultTextures,
    ) {
        for mesh in &mut self.meshes {
            mesh.init_gpu_resources(device);
        }

        let mut cache = TextureCache::new();
        self.gpu_materials = self
            .materials
            .iter()
            .map(|data| {
                Material::create_with_images(
                    device,
                    queue,
                    bindings,
                    data,
                    &self.images,
                    &mut cache,
                    defaults,
                )
            })
            .collect();
        debug!(
            "uploaded {} textures for '{}'",
            cache.len(),
            self.name
        );

        self.images = Vec::new();
    }

    fn gpu_material(&self, mesh: &Mesh) -> Option<&Material> {
        mesh.material
            .and_then(|index| self.gpu_materials.get(index))
            .or_else(|| self.gpu_materials.last())
    }
}

/// Draws every mesh of a model with its material bound at `material_group`
pub trait DrawModel {
    fn draw_model(&mut self, model: &Model, material_group: u32);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_model(&mut self, model: &Model, material_group: u32) {
        for mesh in &model.meshes {
            let Some(material) = model.gpu_material(mesh) else {
                continue;
            };
            self.set_bind_group(material_group, material.bind_group(), &[]);
            self.draw_mesh(mesh);
        }
    }
}

/// Converts decoded glTF pixels to 8-bit RGBA
///
/// 16-bit channels keep their high byte. Float formats are not supported.
pub fn to_rgba8(
    format: gltf::image::Format,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<image::RgbaImage> {
    use gltf::image::Format;

    let (channels, bytes_per_channel) = match format {
        Format::R8 => (1, 1),
        Format::R8G8 => (2, 1),
        Format::R8G8B8 => (3, 1),
        Format::R8G8B8A8 => (4, 1),
        Format::R16 => (1, 2),
        Format::R16G16 => (2, 2),
        Format::R16G16B16 => (3, 2),
        Format::R16G16B16A16 => (4, 2),
        other => return Err(DemoError::UnsupportedFormat(format!("{:?}", other))),
    };

    let stride = channels * bytes_per_channel;
    let expected = width as usize * height as usize * stride;
    if pixels.len() < expected {
        return Err(DemoError::UnsupportedFormat(format!(
            "{:?} image has {} bytes, expected {}",
            format,
            pixels.len(),
            expected
        )));
    }

    // Little endian, so the high byte of a 16-bit channel is the second one
    let channel = |texel: &[u8], c: usize| texel[c * bytes_per_channel + bytes_per_channel - 1];

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for texel in pixels[..expected].chunks_exact(stride) {
        let pixel = match channels {
            1 => {
                let l = channel(texel, 0);
                [l, l, l, 255]
            }
            2 => {
                let l = channel(texel, 0);
                [l, l, l, channel(texel, 1)]
            }
            3 => [channel(texel, 0), channel(texel, 1), channel(texel, 2), 255],
            _ => [
                channel(texel, 0),
                channel(texel, 1),
                channel(texel, 2),
                channel(texel, 3),
            ],
        };
        rgba.extend_from_slice(&pixel);
    }

    image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| DemoError::UnsupportedFormat(format!("{:?} image buffer", format)))
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string()
}

fn load_gltf(path: &Path) -> Result<Model> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| DemoError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let images = images
        .into_iter()
        .map(|data| to_rgba8(data.format, data.width, data.height, &data.pixels))
        .collect::<Result<Vec<_>>>()?;

    let mut materials: Vec<MaterialData> = document
        .materials()
        .enumerate()
        .map(|(i, material)| {
            let pbr = material.pbr_metallic_roughness();
            MaterialData {
                name: material
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("material_{}", i)),
                base_color: pbr.base_color_factor(),
                diffuse_image: pbr
                    .base_color_texture()
                    .map(|info| info.texture().source().index()),
                normal_image: material
                    .normal_texture()
                    .map(|normal| normal.texture().source().index()),
                alpha_cutoff: match material.alpha_mode() {
                    gltf::material::AlphaMode::Mask => Some(material.alpha_cutoff().unwrap_or(0.5)),
                    _ => None,
                },
            }
        })
        .collect();
    let default_material = materials.len();
    materials.push(MaterialData::default());

    let mut meshes = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Matrix4::identity(), &buffers, default_material, &mut meshes);
            }
        }
        None => {
            // No scene graph: take the meshes as they are
            for mesh in document.meshes() {
                collect_mesh(&mesh, Matrix4::identity(), &buffers, default_material, &mut meshes);
            }
        }
    }

    Ok(Model {
        name: model_name(path),
        meshes,
        materials,
        images,
        gpu_materials: Vec::new(),
    })
}

fn collect_node(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    default_material: usize,
    meshes: &mut Vec<Mesh>,
) {
    let world = parent * Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, default_material, meshes);
    }
    for child in node.children() {
        collect_node(&child, world, buffers, default_material, meshes);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    world: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    default_material: usize,
    meshes: &mut Vec<Mesh>,
) {
    let upper = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    let normal_matrix = upper.invert().unwrap_or(upper).transpose();
    let mirrored = upper.determinant() < 0.0;

    for (p, primitive) in mesh.primitives().enumerate() {
        let name = format!("{}#{}", mesh.name().unwrap_or("mesh"), p);
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!("skipping primitive {}: mode {:?}", name, primitive.mode());
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            warn!("skipping primitive {}: no positions", name);
            continue;
        };
        let positions: Vec<[f32; 3]> = positions
            .map(|p| world.transform_point(Point3::from(p)).to_vec().into())
            .collect();

        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| {
            iter.map(|n| {
                let n = normal_matrix * Vector3::from(n);
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    n.into()
                }
            })
            .collect()
        });
        let tex_coords: Option<Vec<[f32; 2]>> = reader
            .read_tex_coords(0)
            .map(|iter| iter.into_f32().collect());

        let mut indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if mirrored {
            for triangle in indices.chunks_exact_mut(3) {
                triangle.swap(1, 2);
            }
        }

        let material = primitive.material().index().unwrap_or(default_material);
        meshes.push(
            Mesh::from_streams(
                name,
                &positions,
                normals.as_deref(),
                tex_coords.as_deref(),
                indices,
            )
            .with_material(Some(material)),
        );
    }
}

fn load_obj(path: &Path) -> Result<Model> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| DemoError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let obj_materials = materials.unwrap_or_else(|e| {
        warn!("no usable MTL for {} ({}), using default material", path.display(), e);
        Vec::new()
    });

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut images = Vec::new();
    let mut materials: Vec<MaterialData> = obj_materials
        .iter()
        .enumerate()
        .map(|(i, mtl)| {
            let diffuse = mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]);
            let diffuse_image = mtl.diffuse_texture.as_ref().and_then(|texture| {
                match load_image(&base_dir.join(texture)) {
                    Ok(image) => {
                        images.push(image);
                        Some(images.len() - 1)
                    }
                    Err(e) => {
                        warn!("ignoring diffuse texture of '{}': {}", mtl.name, e);
                        None
                    }
                }
            });
            MaterialData {
                name: if mtl.name.is_empty() {
                    format!("material_{}", i)
                } else {
                    mtl.name.clone()
                },
                base_color: [
                    diffuse[0],
                    diffuse[1],
                    diffuse[2],
                    mtl.dissolve.unwrap_or(1.0),
                ],
                diffuse_image,
                normal_image: None,
                alpha_cutoff: None,
            }
        })
        .collect();
    let default_material = materials.len();
    materials.push(MaterialData::default());

    let meshes = models
        .iter()
        .map(|m| {
            let mesh = &m.mesh;
            let positions: Vec<[f32; 3]> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect();
            let normals: Vec<[f32; 3]> = mesh
                .normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect();
            // OBJ puts v = 0 at the bottom of the image
            let tex_coords: Vec<[f32; 2]> = mesh
                .texcoords
                .chunks_exact(2)
                .map(|t| [t[0], 1.0 - t[1]])
                .collect();

            let material = mesh
                .material_id
                .filter(|&id| id < default_material)
                .unwrap_or(default_material);

            Mesh::from_streams(
                m.name.clone(),
                &positions,
                (!normals.is_empty()).then_some(normals.as_slice()),
                (!tex_coords.is_empty()).then_some(tex_coords.as_slice()),
                mesh.indices.clone(),
            )
            .with_material(Some(material))
        })
        .collect();

    Ok(Model {
        name: model_name(path),
        meshes,
        materials,
        images,
        gpu_materials: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gltf::image::Format;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("orbit-bloom-{}-{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_rgb_and_grey_expand_to_rgba() {
        let rgb = to_rgba8(Format::R8G8B8, 2, 1, &[10, 20, 30, 40, 50, 60]).unwrap();
        assert_eq!(rgb.get_pixel(1, 0).0, [40, 50, 60, 255]);

        let grey = to_rgba8(Format::R8, 1, 1, &[77]).unwrap();
        assert_eq!(grey.get_pixel(0, 0).0, [77, 77, 77, 255]);

        let grey_alpha = to_rgba8(Format::R8G8, 1, 1, &[5, 9]).unwrap();
        assert_eq!(grey_alpha.get_pixel(0, 0).0, [5, 5, 5, 9]);
    }

    #[test]
    fn test_sixteen_bit_keeps_high_byte() {
        let pixels = [0x34, 0x12, 0xff, 0x80, 0x00, 0x40, 0x00, 0xff];
        let image = to_rgba8(Format::R16G16B16A16, 1, 1, &pixels).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0x12, 0x80, 0x40, 0xff]);
    }

    #[test]
    fn test_short_or_float_images_are_rejected() {
        assert!(to_rgba8(Format::R8G8B8A8, 2, 2, &[0; 4]).is_err());
        assert!(matches!(
            to_rgba8(Format::R32G32B32FLOAT, 1, 1, &[0; 12]),
            Err(DemoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = Model::load(Path::new("building.fbx")).err().unwrap();
        assert!(matches!(err, DemoError::UnsupportedModel(_)));
    }

    #[test]
    fn test_obj_without_materials_gets_default() {
        let path = temp_file(
            "quad.obj",
            "o quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n",
        );
        let model = Model::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.meshes[0].material, Some(0));

        let mesh = &model.meshes[0];
        assert!((mesh.vertices[0].normal[2] - 1.0).abs() < 1e-6);
        assert!(mesh.vertices.iter().any(|v| v.tex_coords == [0.0, 1.0]));
    }

    #[test]
    fn test_gltf_node_transform_is_baked() {
        let path = temp_file(
            "triangle.gltf",
            r#"{
                "asset": { "version": "2.0" },
                "scene": 0,
                "scenes": [ { "nodes": [0] } ],
                "nodes": [ { "mesh": 0, "translation": [0.0, 0.0, 5.0] } ],
                "meshes": [ { "name": "tri", "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
                "accessors": [ {
                    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
                } ],
                "bufferViews": [ { "buffer": 0, "byteLength": 36 } ],
                "buffers": [ {
                    "byteLength": 36,
                    "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
                } ]
            }"#,
        );
        let model = Model::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 5.0]);
        // No material in the file: the appended default is used
        assert_eq!(mesh.material, Some(0));
        assert_eq!(model.materials[0], MaterialData::default());
        assert!((mesh.vertices[0].normal[2] - 1.0).abs() < 1e-6);
    }
}
