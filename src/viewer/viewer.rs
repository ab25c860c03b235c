use cgmath::{vec2, vec3, Deg, InnerSpace, Matrix4, Vector3};
use glium::winit::keyboard::{KeyCode, ModifiersState};
use glium::{Frame, Surface};

use super::eye::Eye;
use super::scene_pass::{Display, ScenePass};
use super::BG_COLOR;
use crate::primitives::Primitives;
use crate::scene::{LocomotionState, Scene};

/// Camera move speed in world units per second.
const CAMERA_SPEED: f32 = 20.0;

/// How long to average the render rate over, in seconds.
const FPS_WINDOW: f64 = 2.0;

/// Rolling average of the render rate for the window title.
struct RenderRate {
    fps: f64,
    window: f64,
    frames: u32,
}

impl RenderRate {
    fn new() -> RenderRate {
        RenderRate { fps: 0.0, window: 0.0, frames: 0 }
    }

    fn tick(&mut self, dt: f64) {
        self.window += dt;
        self.frames += 1;
        if self.window >= FPS_WINDOW {
            self.fps = self.frames as f64 / self.window;
            self.window = 0.0;
            self.frames = 0;
        }
    }
}

/// Maps the world's axes (+Z up, +Y forward) onto GL camera conventions
/// (+Y up, -Z forward).
fn world_to_gl() -> Matrix4<f32> {
    Matrix4::from_angle_x(Deg(-90.0))
}

/// Ties together the scene, the camera, and the GL pass.
pub struct Viewer {
    scene: Scene,
    pass: ScenePass,
    eye: Eye,

    /// Accumulator for time; the scene ticks at a fixed rate regardless of
    /// the render framerate.
    time_acc: f64,
    render_rate: RenderRate,
    /// Direction of motion (for the WASD controls).
    move_vector: Vector3<f32>,
    aspect_ratio: f32,
}

impl Viewer {
    pub fn new(display: &Display, scene: Scene) -> Viewer {
        Viewer {
            scene,
            pass: ScenePass::new(display),
            eye: Default::default(),
            time_acc: 0.0,
            render_rate: RenderRate::new(),
            move_vector: vec3(0.0, 0.0, 0.0),
            aspect_ratio: 1.0,
        }
    }

    /// Update state with the delta-time since last update. Called once
    /// before each frame.
    pub fn update(&mut self, dt: f64) {
        self.render_rate.tick(dt);

        // Update the camera position
        let mag = self.move_vector.magnitude();
        if mag != 0.0 {
            let dv = CAMERA_SPEED * (self.move_vector / mag);
            self.eye.move_by((dt as f32) * dv);
        }

        self.time_acc += dt;

        // Don't let the accumulator get too full if we lag or something.
        if self.time_acc > 1.0 {
            self.time_acc = 1.0;
        }

        let tick = 1.0 / self.scene.config.tick_rate as f64;
        while self.time_acc > tick {
            self.scene.update();
            self.time_acc -= tick;
        }
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) {
        self.aspect_ratio = aspect_ratio as f32;
    }

    pub fn draw(&self, display: &Display, target: &mut Frame) {
        target.clear_color_srgb_and_depth(BG_COLOR, 1.0);

        let mut prims = Primitives::new();
        self.scene
            .render(&mut prims, self.eye.model_view() * world_to_gl());
        self.pass.draw(display, target, &prims, self.aspect_ratio);
    }

    /// Handle key press/release events.
    pub fn key(&mut self, code: KeyCode, pressed: bool, _modifiers: ModifiersState) {
        // Use WASD controls to update the move_vector.
        static MOVE_KEYS: [(KeyCode, KeyCode, usize); 3] = [
            // Key to move forward, key to move backward, affected component
            (KeyCode::KeyW, KeyCode::KeyS, 0),
            (KeyCode::KeyD, KeyCode::KeyA, 1),
            (KeyCode::KeyE, KeyCode::KeyQ, 2),
        ];
        for &(forward_key, backward_key, component) in &MOVE_KEYS {
            let x = if code == forward_key {
                1.0
            } else if code == backward_key {
                -1.0
            } else {
                continue;
            };
            self.move_vector[component] = if pressed { x } else { 0.0 };
        }

        if !pressed {
            return;
        }

        match code {
            // Locomotion events for the character
            KeyCode::ArrowUp => self.scene.event_forward(),
            KeyCode::ArrowDown => self.scene.event_backward(),
            KeyCode::ArrowLeft => self.scene.event_turn_left(),
            KeyCode::ArrowRight => self.scene.event_turn_right(),
            KeyCode::KeyR => self.scene.event_reset(),
            _ => (),
        }
    }

    /// Handle mouse drag while the LMB is clicked.
    pub fn mouse_drag(&mut self, (dx, dy): (f64, f64)) {
        self.eye.free_look(0.01 * vec2(dx as f32, dy as f32));
    }

    /// Handler for window blur (loss of focus).
    pub fn blur(&mut self) {
        // Stop moving.
        self.move_vector = vec3(0.0, 0.0, 0.0);
    }

    /// Write the window title.
    pub fn title(&self, s: &mut String) {
        use std::fmt::Write;

        let state = match self.scene.state() {
            LocomotionState::Resting => "Resting",
            LocomotionState::Running => "Running",
            LocomotionState::VeeringLeft => "Veering Left",
            LocomotionState::VeeringRight => "Veering Right",
        };
        write!(
            s,
            "ambler === {state} === frame {frame} === {fps:5.2}fps",
            state = state,
            frame = self.scene.frame_number(),
            fps = self.render_rate.fps,
        )
        .unwrap();
    }
}
