//! # Primitive Shape Generation
//!
//! All shapes are generated with outward normals and texture coordinates,
//! Y-up, counter-clockwise front faces.

use super::GeometryData;
use std::f32::consts::PI;

/// Generate a cube of edge length `size` centered at the origin
///
/// Each face has its own four vertices so normals stay flat per face.
pub fn generate_cube(size: f32) -> GeometryData {
    let mut data = GeometryData::new();
    let h = size * 0.5;

    #[rustfmt::skip]
    let positions = [
        // Front face (+Z)
        [-h, -h,  h], [ h, -h,  h], [ h,  h,  h], [-h,  h,  h],
        // Back face (-Z)
        [-h, -h, -h], [-h,  h, -h], [ h,  h, -h], [ h, -h, -h],
        // Left face (-X)
        [-h, -h, -h], [-h, -h,  h], [-h,  h,  h], [-h,  h, -h],
        // Right face (+X)
        [ h, -h,  h], [ h, -h, -h], [ h,  h, -h], [ h,  h,  h],
        // Top face (+Y)
        [-h,  h,  h], [ h,  h,  h], [ h,  h, -h], [-h,  h, -h],
        // Bottom face (-Y)
        [-h, -h, -h], [ h, -h, -h], [ h, -h,  h], [-h, -h,  h],
    ];

    #[rustfmt::skip]
    let tex_coords = [
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0],
        [1.0, 0.0], [0.0, 0.0], [0.0, 1.0], [1.0, 1.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
        [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0],
        [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0],
    ];

    let face_normals = [
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
        [-1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
    ];

    data.vertices = positions.to_vec();
    data.tex_coords = tex_coords.to_vec();
    data.normals = face_normals
        .iter()
        .flat_map(|n| std::iter::repeat(*n).take(4))
        .collect();

    for face in 0..6u32 {
        let base = face * 4;
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    data
}

/// Generate a UV sphere
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `rings` - Number of latitude bands (clamped to at least 2)
/// * `slices` - Number of longitude segments (clamped to at least 3)
pub fn generate_sphere(radius: f32, rings: u32, slices: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let rings = rings.max(2);
    let slices = slices.max(3);

    for ring in 0..=rings {
        let theta = ring as f32 * PI / rings as f32; // 0 to PI
        let (sin_theta, cos_theta) = theta.sin_cos();

        for slice in 0..=slices {
            let phi = slice as f32 * 2.0 * PI / slices as f32; // 0 to 2*PI
            let (sin_phi, cos_phi) = phi.sin_cos();

            let x = sin_theta * cos_phi;
            let y = cos_theta;
            let z = sin_theta * sin_phi;

            data.vertices.push([x * radius, y * radius, z * radius]);
            data.normals.push([x, y, z]);
            data.tex_coords
                .push([slice as f32 / slices as f32, ring as f32 / rings as f32]);
        }
    }

    for ring in 0..rings {
        for slice in 0..slices {
            let first = ring * (slices + 1) + slice;
            let second = first + slices + 1;

            data.indices.push(first);
            data.indices.push(first + 1);
            data.indices.push(second);

            data.indices.push(second);
            data.indices.push(first + 1);
            data.indices.push(second + 1);
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(data: &GeometryData, tri: usize) -> [f32; 3] {
        let [a, b, c] = [
            data.vertices[data.indices[tri * 3] as usize],
            data.vertices[data.indices[tri * 3 + 1] as usize],
            data.vertices[data.indices[tri * 3 + 2] as usize],
        ];
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    #[test]
    fn test_cube_generation() {
        let cube = generate_cube(2.0);
        assert_eq!(cube.vertices.len(), 24); // 6 faces * 4 vertices
        assert_eq!(cube.indices.len(), 36); // 6 faces * 2 triangles * 3 indices
        assert_eq!(cube.normals.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.vertices.iter().all(|v| v.iter().all(|c| c.abs() == 1.0)));
    }

    #[test]
    fn test_cube_winding_faces_outward() {
        let cube = generate_cube(1.0);
        for tri in 0..cube.triangle_count() {
            let normal = cube.normals[cube.indices[tri * 3] as usize];
            assert!(dot(triangle_normal(&cube, tri), normal) > 0.0, "triangle {}", tri);
        }
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = generate_sphere(0.2, 8, 6);
        assert_eq!(sphere.vertices.len(), 9 * 7);
        assert_eq!(sphere.indices.len(), 8 * 6 * 6);
        assert_eq!(sphere.vertices.len(), sphere.normals.len());
        assert_eq!(sphere.vertices.len(), sphere.tex_coords.len());
        for v in &sphere.vertices {
            let r = dot(*v, *v).sqrt();
            assert!((r - 0.2).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_winding_faces_outward() {
        let sphere = generate_sphere(1.0, 6, 8);
        for tri in 0..sphere.triangle_count() {
            let n = triangle_normal(&sphere, tri);
            // Degenerate triangles at the poles have zero area
            if dot(n, n) < 1e-10 {
                continue;
            }
            let center = sphere.vertices[sphere.indices[tri * 3 + 1] as usize];
            assert!(dot(n, center) > 0.0, "triangle {}", tri);
        }
    }

    #[test]
    fn test_sphere_clamps_resolution() {
        let sphere = generate_sphere(1.0, 0, 0);
        assert_eq!(sphere.vertices.len(), 3 * 4);
    }
}
