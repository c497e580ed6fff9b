use cgmath::{InnerSpace, Vector3, Zero};
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use super::fly_camera::FlyCamera;
use crate::config::CameraConfig;

/// World units moved per wheel line
const SCROLL_STEP: f32 = 0.5;

/// Free-look controller
///
/// The camera only moves while the right mouse button is held: mouse motion
/// turns the view, WASD flies along the view, Space and Left Control move
/// straight up and down, the wheel moves toward the target.
pub struct CameraController {
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    is_right_pressed: bool,
    is_forward_held: bool,
    is_backward_held: bool,
    is_left_held: bool,
    is_right_held: bool,
    is_up_held: bool,
    is_down_held: bool,
    mouse_delta: (f32, f32),
    scroll: f32,
}

impl CameraController {
    pub fn new(move_speed: f32, mouse_sensitivity: f32) -> Self {
        Self {
            move_speed,
            mouse_sensitivity,
            is_right_pressed: false,
            is_forward_held: false,
            is_backward_held: false,
            is_left_held: false,
            is_right_held: false,
            is_up_held: false,
            is_down_held: false,
            mouse_delta: (0.0, 0.0),
            scroll: 0.0,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.move_speed, config.mouse_sensitivity)
    }

    pub fn process_events(&mut self, event: &DeviceEvent, window: &Window) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.is_right_pressed {
                self.mouse_delta.0 += delta.0 as f32;
                self.mouse_delta.1 += delta.1 as f32;
                window.request_redraw();
            }
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Right {
            self.is_right_pressed = state == ElementState::Pressed;
        }
    }

    pub fn process_scroll(&mut self, delta: &MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, scroll) => *scroll,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                *scroll as f32 / 20.0
            }
        };
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent) {
        let pressed = event.state == ElementState::Pressed;
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match code {
            KeyCode::KeyW => self.is_forward_held = pressed,
            KeyCode::KeyS => self.is_backward_held = pressed,
            KeyCode::KeyA => self.is_left_held = pressed,
            KeyCode::KeyD => self.is_right_held = pressed,
            KeyCode::Space => self.is_up_held = pressed,
            KeyCode::ControlLeft => self.is_down_held = pressed,
            _ => (),
        }
    }

    /// Returns true while the free-look button is held
    pub fn is_active(&self) -> bool {
        self.is_right_pressed
    }

    /// Applies the input gathered since the last frame
    ///
    /// Input collected while the right button is up is discarded.
    pub fn update_camera(&mut self, camera: &mut FlyCamera, dt: f32) {
        let (dx, dy) = std::mem::take(&mut self.mouse_delta);
        let scroll = std::mem::take(&mut self.scroll);

        if !self.is_right_pressed {
            return;
        }

        if dx != 0.0 || dy != 0.0 {
            camera.rotate(dx * self.mouse_sensitivity, -dy * self.mouse_sensitivity);
        }

        let mut direction = Vector3::zero();
        let forward = camera.forward();
        let right = camera.right();
        if self.is_forward_held {
            direction += forward;
        }
        if self.is_backward_held {
            direction -= forward;
        }
        if self.is_right_held {
            direction += right;
        }
        if self.is_left_held {
            direction -= right;
        }
        if self.is_up_held {
            direction += Vector3::unit_y();
        }
        if self.is_down_held {
            direction -= Vector3::unit_y();
        }
        if direction.magnitude2() > 0.0 {
            camera.translate(direction.normalize() * self.move_speed * dt);
        }

        if scroll != 0.0 {
            camera.move_to_target(scroll * SCROLL_STEP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_without_right_button() {
        let mut controller = CameraController::new(5.4, 0.003);
        let mut camera = FlyCamera::new(&CameraConfig::default(), 1.0);
        let before = camera.position;

        controller.is_forward_held = true;
        controller.mouse_delta = (50.0, 10.0);
        controller.update_camera(&mut camera, 1.0);

        assert_eq!(camera.position, before);
        assert_eq!(controller.mouse_delta, (0.0, 0.0));
    }

    #[test]
    fn test_forward_moves_by_speed_times_dt() {
        let mut controller = CameraController::new(2.0, 0.003);
        controller.process_mouse_button(MouseButton::Right, ElementState::Pressed);
        controller.is_forward_held = true;

        let mut camera = FlyCamera::new(&CameraConfig::default(), 1.0);
        let before = camera.position;
        let forward = camera.forward();
        controller.update_camera(&mut camera, 0.5);

        let moved = camera.position - before;
        assert!((moved.magnitude() - 1.0).abs() < 1e-4);
        assert!(moved.normalize().dot(forward) > 0.999);
    }

    #[test]
    fn test_release_stops_free_look() {
        let mut controller = CameraController::new(2.0, 0.003);
        controller.process_mouse_button(MouseButton::Right, ElementState::Pressed);
        assert!(controller.is_active());
        controller.process_mouse_button(MouseButton::Right, ElementState::Released);
        assert!(!controller.is_active());
        controller.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(!controller.is_active());
    }
}
