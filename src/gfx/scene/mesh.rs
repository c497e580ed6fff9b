use wgpu::util::DeviceExt;

use super::vertex::Vertex3D;
use crate::gfx::geometry::GeometryData;

/// Vertex and index buffers of an uploaded mesh
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Triangle mesh with CPU-side data and lazily created GPU buffers
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
    /// Index into the owning model's material list
    pub material: Option<usize>,
    pub gpu: Option<MeshBuffers>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            material: None,
            gpu: None,
        }
    }

    pub fn from_geometry(name: impl Into<String>, geometry: &GeometryData) -> Self {
        Self::new(name, geometry.to_vertices(), geometry.indices.clone())
    }

    /// Builds vertices from flat attribute streams
    ///
    /// Missing normals are computed from the faces; missing texture
    /// coordinates default to zero.
    pub fn from_streams(
        name: impl Into<String>,
        positions: &[[f32; 3]],
        normals: Option<&[[f32; 3]]>,
        tex_coords: Option<&[[f32; 2]]>,
        indices: Vec<u32>,
    ) -> Self {
        let computed;
        let normals = match normals {
            Some(n) if n.len() == positions.len() => n,
            _ => {
                computed = calculate_face_normals(positions, &indices);
                &computed[..]
            }
        };

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex3D {
                position: *position,
                normal: normals[i],
                tex_coords: tex_coords
                    .and_then(|uv| uv.get(i).copied())
                    .unwrap_or([0.0, 0.0]),
            })
            .collect();

        Self::new(name, vertices, indices)
    }

    pub fn with_material(mut self, material: Option<usize>) -> Self {
        self.material = material;
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn init_gpu_resources(&mut self, device: &wgpu::Device) {
        if self.gpu.is_some() {
            return;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.gpu = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        });
    }
}

/// Averaged face normals for meshes that ship without normals
pub fn calculate_face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let (v0, v1, v2) = (positions[i0], positions[i1], positions[i2]);

        let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

        let face_normal = [
            edge1[1] * edge2[2] - edge1[2] * edge2[1],
            edge1[2] * edge2[0] - edge1[0] * edge2[2],
            edge1[0] * edge2[1] - edge1[1] * edge2[0],
        ];

        for vertex_idx in [i0, i1, i2] {
            normals[vertex_idx][0] += face_normal[0];
            normals[vertex_idx][1] += face_normal[1];
            normals[vertex_idx][2] += face_normal[2];
        }
    }

    for normal in normals.iter_mut() {
        let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        if length > 0.0 {
            normal[0] /= length;
            normal[1] /= length;
            normal[2] /= length;
        } else {
            *normal = [0.0, 1.0, 0.0];
        }
    }

    normals
}

/// Draw helper for uploaded meshes
pub trait DrawMesh {
    fn draw_mesh(&mut self, mesh: &Mesh);
}

impl DrawMesh for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &Mesh) {
        let Some(buffers) = mesh.gpu.as_ref() else {
            log::trace!("skipping '{}': no GPU buffers", mesh.name);
            return;
        };
        self.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        self.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..buffers.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_normals_of_flat_quad() {
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let normals = calculate_face_normals(&positions, &[0, 1, 2, 2, 3, 0]);
        for n in normals {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unreferenced_vertex_gets_default_normal() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [5.0, 5.0, 5.0]];
        let normals = calculate_face_normals(&positions, &[0, 1, 2]);
        assert_eq!(normals[3], [0.0, 1.0, 0.0]);
        assert!((normals[0][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_streams_fills_missing_attributes() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mesh = Mesh::from_streams("tri", &positions, None, None, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices[1].tex_coords, [0.0, 0.0]);
        assert!((mesh.vertices[0].normal[2] - 1.0).abs() < 1e-6);
    }
}
