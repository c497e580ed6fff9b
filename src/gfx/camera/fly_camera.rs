use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use cgmath::*;

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Keeps the look direction away from straight up/down so `look_at_rh` stays defined
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Free-flying perspective camera described by an eye and a look-at target
#[derive(Debug, Clone, Copy)]
pub struct FlyCamera {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
}

impl Camera for FlyCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.build_projection_matrix() * self.build_view_matrix()
    }
}

impl FlyCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            position: config.position.into(),
            target: config.target.into(),
            up: Vector3::unit_y(),
            aspect,
            fovy: Deg(config.fovy).into(),
            znear: config.znear,
            zfar: config.zfar,
            uniform: CameraUniform::default(),
        };
        camera.update_view_proj();
        camera
    }

    pub fn build_view_matrix(&self) -> Matrix4<f32> {
        let forward = self.forward();
        Matrix4::look_at_rh(
            Point3::from_vec(self.position),
            Point3::from_vec(self.position + forward),
            self.view_up(forward),
        )
    }

    /// `up`, or a substitute axis when looking straight along it
    fn view_up(&self, forward: Vector3<f32>) -> Vector3<f32> {
        if forward.cross(self.up).magnitude2() > 1e-6 {
            self.up
        } else if forward.cross(Vector3::unit_z()).magnitude2() > 1e-6 {
            Vector3::unit_z()
        } else {
            Vector3::unit_x()
        }
    }

    pub fn build_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// View matrix with the translation removed, for drawing the skybox around the eye
    pub fn rotation_only_view(&self) -> Matrix4<f32> {
        let mut view = self.build_view_matrix();
        view.w = Vector4::new(0.0, 0.0, 0.0, 1.0);
        view
    }

    pub fn forward(&self) -> Vector3<f32> {
        let dir = self.target - self.position;
        if dir.magnitude2() <= f32::EPSILON {
            -Vector3::unit_z()
        } else {
            dir.normalize()
        }
    }

    pub fn right(&self) -> Vector3<f32> {
        let forward = self.forward();
        forward.cross(self.view_up(forward)).normalize()
    }

    /// Distance between eye and target, never zero
    fn focus_distance(&self) -> f32 {
        (self.target - self.position).magnitude().max(0.001)
    }

    /// Turns the look direction around the eye
    ///
    /// Positive yaw turns right, positive pitch looks up. Pitch is clamped short
    /// of the poles; the eye-to-target distance is kept.
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        let forward = self.forward();
        let distance = self.focus_distance();

        let current_pitch = forward.y.clamp(-1.0, 1.0).asin();
        let current_yaw = forward.z.atan2(forward.x);

        let new_pitch = (current_pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let new_yaw = current_yaw + yaw;

        let direction = Vector3::new(
            new_pitch.cos() * new_yaw.cos(),
            new_pitch.sin(),
            new_pitch.cos() * new_yaw.sin(),
        );
        self.target = self.position + direction * distance;
    }

    /// Moves eye and target together, keeping the view direction
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.position += offset;
        self.target += offset;
    }

    /// Moves the eye toward (positive) or away from (negative) the target
    ///
    /// The eye never passes the target.
    pub fn move_to_target(&mut self, delta: f32) {
        let forward = self.forward();
        let distance = self.focus_distance();
        let step = delta.min(distance - 0.01);
        self.position += forward * step;
    }

    /// Places the eye without touching the target
    ///
    /// An eye dropped onto the target pushes the target ahead along the
    /// previous look direction.
    pub fn set_position(&mut self, position: Vector3<f32>) {
        let forward = self.forward();
        let distance = self.focus_distance();
        self.position = position;
        if (self.target - self.position).magnitude2() <= 1e-6 {
            self.target = self.position + forward * distance.max(1.0);
        }
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.position.x, self.position.y, self.position.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(self.build_view_projection_matrix());
        self.uniform.sky_view_proj =
            convert_matrix4_to_array(self.build_projection_matrix() * self.rotation_only_view());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> FlyCamera {
        FlyCamera::new(&CameraConfig::default(), 1000.0 / 650.0)
    }

    #[test]
    fn test_rotation_only_view_drops_translation() {
        let cam = camera();
        let view = cam.rotation_only_view();
        assert_eq!(view.w, Vector4::new(0.0, 0.0, 0.0, 1.0));

        let full = cam.build_view_matrix();
        assert_eq!(view.x, full.x);
        assert_eq!(view.y, full.y);
        assert_eq!(view.z, full.z);
    }

    #[test]
    fn test_rotate_keeps_distance_and_eye() {
        let mut cam = camera();
        let eye = cam.position;
        let distance = (cam.target - cam.position).magnitude();

        cam.rotate(0.4, -0.2);

        assert_eq!(cam.position, eye);
        assert!(((cam.target - cam.position).magnitude() - distance).abs() < 1e-4);
    }

    #[test]
    fn test_rotate_clamps_pitch() {
        let mut cam = camera();
        cam.rotate(0.0, 10.0);
        let forward = cam.forward();
        assert!(forward.y < 1.0);
        assert!(forward.y.asin() <= PITCH_LIMIT + 1e-4);

        cam.rotate(0.0, -20.0);
        assert!(cam.forward().y.asin() >= -PITCH_LIMIT - 1e-4);
    }

    #[test]
    fn test_translate_moves_target_with_eye() {
        let mut cam = camera();
        let before = cam.target - cam.position;
        cam.translate(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(cam.position, Vector3::new(0.0, 4.0, 2.5));
        assert!((cam.target - cam.position - before).magnitude() < 1e-6);
    }

    #[test]
    fn test_move_to_target_stops_before_target() {
        let mut cam = camera();
        cam.move_to_target(100.0);
        assert!((cam.target - cam.position).magnitude() > 0.0);
    }

    fn assert_finite(matrix: [[f32; 4]; 4]) {
        assert!(matrix.iter().flatten().all(|v| v.is_finite()), "{:?}", matrix);
    }

    #[test]
    fn test_eye_on_target_keeps_matrices_finite() {
        let mut cam = camera();
        let forward = cam.forward();
        cam.set_position(cam.target);
        cam.update_view_proj();

        assert!((cam.target - cam.position).magnitude() > 0.5);
        assert!((cam.forward() - forward).magnitude() < 1e-4);
        assert_finite(cam.uniform.view_proj);
        assert_finite(cam.uniform.sky_view_proj);
    }

    #[test]
    fn test_looking_straight_up_keeps_matrices_finite() {
        let mut cam = camera();
        cam.set_position(Vector3::new(0.0, -3.0, 0.0));
        cam.update_view_proj();

        assert_finite(cam.uniform.view_proj);
        assert_finite(cam.uniform.sky_view_proj);
        assert!(cam.right().magnitude().is_finite());
    }

    #[test]
    fn test_uniform_tracks_position() {
        let mut cam = camera();
        cam.set_position(Vector3::new(3.0, 1.0, 0.5));
        cam.update_view_proj();
        assert_eq!(cam.uniform.view_position, [3.0, 1.0, 0.5, 1.0]);
    }
}
