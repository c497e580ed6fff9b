//! Orbiting emissive lights
//!
//! Eight small spheres that are both visible emitters and the point lights of
//! the scene. Each one starts at a fixed position and spins around a fixed axis
//! through the origin; position is a closed-form function of the shared spin angle.

use cgmath::{InnerSpace, Matrix4, Rad, Vector3, Zero};

use crate::config::OrbitConfig;

pub const NUM_ORBITS: usize = 8;

/// Static description of one orbit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub color: [f32; 3],
    pub start: [f32; 3],
    pub axis: [f32; 3],
}

pub const ORBITS: [Orbit; NUM_ORBITS] = [
    // red
    Orbit { color: [1.0, 0.0, 0.0], start: [8.5, 1.7, 0.0], axis: [0.7071, 0.7071, 0.0] },
    // green
    Orbit { color: [0.0, 1.0, 0.0], start: [6.0, 1.7, 0.0], axis: [1.0, 0.0, 0.0] },
    // blue
    Orbit { color: [0.0, 0.0, 1.0], start: [3.5, 1.7, 0.0], axis: [-0.7071, 0.7071, 0.0] },
    // warm white
    Orbit { color: [0.9921, 0.9843, 0.8274], start: [1.0, 1.7, 0.0], axis: [0.0, 0.0, 1.0] },
    // yellow
    Orbit { color: [1.0, 1.0, 0.0], start: [-1.0, 1.7, 0.0], axis: [0.0, 0.0, 1.0] },
    // magenta
    Orbit { color: [1.0, 0.0, 1.0], start: [-3.5, 1.7, 0.0], axis: [-0.7071, 0.7071, 0.0] },
    // cyan
    Orbit { color: [0.0, 1.0, 1.0], start: [-6.0, 1.7, 0.0], axis: [1.0, 0.0, 0.0] },
    // orange
    Orbit { color: [1.0, 0.4, 0.0], start: [-8.5, 1.7, 0.0], axis: [0.7071, 0.7071, 0.0] },
];

/// Rotates `v` around `axis` by `angle` radians (Rodrigues' formula)
///
/// The axis does not need to be normalized. A zero axis leaves `v` unchanged.
pub fn rotate_by_axis_angle(v: Vector3<f32>, axis: Vector3<f32>, angle: f32) -> Vector3<f32> {
    if axis.magnitude2() <= f32::EPSILON {
        return v;
    }
    let k = axis.normalize();
    let (sin, cos) = angle.sin_cos();
    v * cos + k.cross(v) * sin + k * k.dot(v) * (1.0 - cos)
}

/// Perceived brightness of the sun texture, used to scale every orbit color
///
/// Rec. 709 luminance of an 8-bit color, boosted by 1.5 and compressed with a
/// 0.8 power.
pub fn sun_mask(rgb: [u8; 3]) -> f32 {
    let luminance =
        (0.2126 * rgb[0] as f32 + 0.7152 * rgb[1] as f32 + 0.0722 * rgb[2] as f32) / 255.0;
    (luminance * 1.5).powf(0.8)
}

/// Samples the center pixel of the sun texture
pub fn sun_mask_from_image(image: &image::RgbaImage) -> f32 {
    if image.width() == 0 || image.height() == 0 {
        return 0.0;
    }
    let pixel = image.get_pixel(image.width() / 2, image.height() / 2);
    sun_mask([pixel[0], pixel[1], pixel[2]])
}

/// Per-orbit lighting data uploaded every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSet {
    pub positions: [[f32; 3]; NUM_ORBITS],
    pub colors: [[f32; 3]; NUM_ORBITS],
    pub intensities: [f32; NUM_ORBITS],
}

/// Animated state of all orbits
#[derive(Debug, Clone)]
pub struct OrbitSystem {
    pub orbits: [Orbit; NUM_ORBITS],
    /// Current rotation in radians
    pub spin_angle: f32,
    /// Radians per second
    pub spin_speed: f32,
    pub body_scale: f32,
    pub intensity: f32,
    /// Color multiplier sampled from the sun texture
    pub color_mask: f32,
}

impl OrbitSystem {
    pub fn new(config: &OrbitConfig) -> Self {
        Self {
            orbits: ORBITS,
            spin_angle: 0.0,
            spin_speed: config.spin_speed,
            body_scale: config.body_scale,
            intensity: config.intensity,
            color_mask: 1.0,
        }
    }

    pub fn with_color_mask(mut self, mask: f32) -> Self {
        self.color_mask = mask;
        self
    }

    /// Advances the spin angle by `spin_speed * dt`
    pub fn advance(&mut self, dt: f32) {
        self.spin_angle += self.spin_speed * dt;
    }

    pub fn position(&self, index: usize) -> Vector3<f32> {
        let orbit = &self.orbits[index];
        rotate_by_axis_angle(orbit.start.into(), orbit.axis.into(), self.spin_angle)
    }

    pub fn positions(&self) -> [Vector3<f32>; NUM_ORBITS] {
        std::array::from_fn(|i| self.position(i))
    }

    /// Translate * rotate(axis, spin) * scale for the orbit body
    pub fn model_matrix(&self, index: usize) -> Matrix4<f32> {
        let axis: Vector3<f32> = self.orbits[index].axis.into();
        let rotation = if axis.is_zero() {
            Matrix4::from_scale(1.0)
        } else {
            Matrix4::from_axis_angle(axis.normalize(), Rad(self.spin_angle))
        };
        Matrix4::from_translation(self.position(index))
            * rotation
            * Matrix4::from_scale(self.body_scale)
    }

    /// Light color and emissive color of an orbit
    pub fn color(&self, index: usize) -> [f32; 3] {
        let c = self.orbits[index].color;
        [
            c[0] * self.color_mask,
            c[1] * self.color_mask,
            c[2] * self.color_mask,
        ]
    }

    pub fn light_set(&self) -> LightSet {
        let positions = self.positions();
        LightSet {
            positions: std::array::from_fn(|i| positions[i].into()),
            colors: std::array::from_fn(|i| self.color(i)),
            intensities: [self.intensity; NUM_ORBITS],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!(
            (a - b).magnitude() < 1e-4,
            "expected {:?} to be close to {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_rotation_quarter_turns() {
        let x = Vector3::unit_x();
        assert_close(rotate_by_axis_angle(x, Vector3::unit_z(), FRAC_PI_2), Vector3::unit_y());
        assert_close(rotate_by_axis_angle(x, Vector3::unit_y(), FRAC_PI_2), -Vector3::unit_z());
        assert_close(rotate_by_axis_angle(x, Vector3::unit_z(), PI), -Vector3::unit_x());
    }

    #[test]
    fn test_rotation_zero_angle_and_zero_axis() {
        let v = Vector3::new(8.5, 1.7, 0.0);
        assert_close(rotate_by_axis_angle(v, Vector3::new(0.7071, 0.7071, 0.0), 0.0), v);
        assert_close(rotate_by_axis_angle(v, Vector3::zero(), 1.3), v);
    }

    #[test]
    fn test_rotation_unnormalized_axis() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let a = rotate_by_axis_angle(v, Vector3::new(0.0, 0.0, 5.0), 0.7);
        let b = rotate_by_axis_angle(v, Vector3::unit_z(), 0.7);
        assert_close(a, b);
    }

    #[test]
    fn test_rotation_preserves_length_and_axis_component() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let v = Vector3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            );
            let axis = Vector3::new(
                rng.random_range(-1.0..1.0f32),
                rng.random_range(-1.0..1.0f32),
                rng.random_range(-1.0..1.0f32),
            );
            if axis.magnitude() < 0.05 {
                continue;
            }
            let angle = rng.random_range(-10.0..10.0f32);
            let rotated = rotate_by_axis_angle(v, axis, angle);

            assert!((rotated.magnitude() - v.magnitude()).abs() < 1e-3);
            let k = axis.normalize();
            assert!((rotated.dot(k) - v.dot(k)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_zero_speed_keeps_start_positions() {
        let mut system = OrbitSystem::new(&OrbitConfig::default());
        system.advance(0.016);
        system.advance(5.0);
        assert_eq!(system.spin_angle, 0.0);
        for (i, orbit) in ORBITS.iter().enumerate() {
            assert_close(system.position(i), orbit.start.into());
        }
    }

    #[test]
    fn test_advance_accumulates_speed_times_dt() {
        let mut system = OrbitSystem::new(&OrbitConfig {
            spin_speed: 2.0,
            ..OrbitConfig::default()
        });
        system.advance(0.25);
        system.advance(0.5);
        assert!((system.spin_angle - 1.5).abs() < 1e-6);

        // Orbit 3 spins around +Z from (1.0, 1.7, 0.0)
        let expected = rotate_by_axis_angle(Vector3::new(1.0, 1.7, 0.0), Vector3::unit_z(), 1.5);
        assert_close(system.position(3), expected);
    }

    #[test]
    fn test_model_matrix_places_scaled_body() {
        let system = OrbitSystem::new(&OrbitConfig::default());
        let m = system.model_matrix(0);
        // Translation column
        assert_close(Vector3::new(m.w.x, m.w.y, m.w.z), Vector3::new(8.5, 1.7, 0.0));
        // Uniform scale on the basis vectors when the angle is zero
        assert!((m.x.x - 0.2).abs() < 1e-6);
        assert!((m.y.y - 0.2).abs() < 1e-6);
        assert!((m.z.z - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_sun_mask() {
        assert_eq!(sun_mask([0, 0, 0]), 0.0);
        let white = sun_mask([255, 255, 255]);
        assert!((white - 1.5f32.powf(0.8)).abs() < 1e-4);
        let green = sun_mask([0, 255, 0]);
        assert!((green - (0.7152f32 * 1.5).powf(0.8)).abs() < 1e-4);
    }

    #[test]
    fn test_sun_mask_samples_center_pixel() {
        let mut img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
        assert!((sun_mask_from_image(&img) - sun_mask([255, 255, 255])).abs() < 1e-6);
    }

    #[test]
    fn test_light_set_scales_colors_by_mask() {
        let system = OrbitSystem::new(&OrbitConfig::default()).with_color_mask(0.5);
        let lights = system.light_set();
        assert_eq!(lights.colors[0], [0.5, 0.0, 0.0]);
        assert_eq!(lights.colors[7], [0.5, 0.2, 0.0]);
        assert_eq!(lights.intensities, [3.0; NUM_ORBITS]);
        assert_eq!(lights.positions[1], [6.0, 1.7, 0.0]);
    }
}
