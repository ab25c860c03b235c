//! The animated world: terrain plus one character driven by a small
//! locomotion state machine.
//!
//! The scene advances on a fixed tick (24 Hz by default), one animation
//! frame per tick. External events (forward, backward, turn left/right,
//! reset) request state changes; every change of clip goes through a short
//! synthesized blend clip so poses never pop. Veering additionally slerps
//! the character's yaw from its old heading to the new one over the length
//! of the veer clip.
//!
//! The character's position follows its heading at the current speed,
//! clamped to a padded rectangle inside the terrain, and its elevation is
//! snapped to the terrain surface every tick.

use cgmath::{Matrix4, Vector3, vec3};
use std::path::{Path, PathBuf};

use crate::bvh::Bvh;
use crate::errors::Result;
use crate::primitives::Primitives;
use crate::quaternion::{slerp, Quaternion};
use crate::terrain::Terrain;

const GROUND_COLOR: [f32; 4] = [0.2, 0.5, 0.2, 1.0];
const BONE_COLOR: [f32; 4] = [0.6, 0.0, 0.54, 1.0];

/// The character's rest heading, in world space (+Z up).
fn forward() -> Vector3<f32> {
    vec3(0.0, 1.0, 0.0)
}

fn up() -> Vector3<f32> {
    vec3(0.0, 0.0, 1.0)
}

/// Asset locations and tuning parameters.
#[derive(Clone)]
pub struct Config {
    pub terrain_path: PathBuf,
    pub rest_path: PathBuf,
    pub run_path: PathBuf,
    pub veer_left_path: PathBuf,
    pub veer_right_path: PathBuf,

    /// Simulation ticks (= animation frames) per second.
    pub tick_rate: f32,
    /// Duration of a clip-to-clip blend.
    pub blend_seconds: f32,
    /// Duration of a veer, and of the heading slerp that runs under it.
    pub veer_seconds: f32,
    /// Total heading change of one veer, in degrees.
    pub veer_angle: f32,
    /// Speed gained when a run starts, in world units per tick.
    pub speed_delta: f32,
    /// Margin kept between the character and the terrain edge.
    pub terrain_padding: f32,
    pub terrain_xy_scale: f32,
    /// Scale applied to BVH offsets to bring the character to world size.
    pub character_scale: f32,
}

impl Config {
    pub fn with_asset_dir(dir: &Path) -> Config {
        Config {
            terrain_path: dir.join("randomland.dem"),
            rest_path: dir.join("stand.bvh"),
            run_path: dir.join("fast_run.bvh"),
            veer_left_path: dir.join("veer_left.bvh"),
            veer_right_path: dir.join("veer_right.bvh"),
            tick_rate: 24.0,
            blend_seconds: 0.5,
            veer_seconds: 1.375,
            veer_angle: 45.0,
            speed_delta: 1.0,
            terrain_padding: 16.0,
            terrain_xy_scale: 3.0,
            character_scale: 0.1,
        }
    }

    /// Never zero: a clip with no frames can't be sampled, so degenerate
    /// durations collapse to a single-frame cut.
    pub fn blend_frames(&self) -> u32 {
        ((self.tick_rate * self.blend_seconds).round() as u32).max(1)
    }

    pub fn veer_frames(&self) -> u32 {
        ((self.tick_rate * self.veer_seconds).round() as u32).max(1)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LocomotionState {
    Resting,
    Running,
    VeeringLeft,
    VeeringRight,
}

/// Which loaded clip the character is playing.
#[derive(Copy, Clone, PartialEq, Eq)]
enum ClipId {
    Rest,
    Run,
    VeerLeft,
    VeerRight,
}

pub struct Scene {
    pub config: Config,
    pub terrain: Terrain,

    rest_pose: Bvh,
    run_cycle: Bvh,
    veer_left_cycle: Bvh,
    veer_right_cycle: Bvh,

    current: ClipId,
    /// One-shot transition clip; while present it plays instead of the
    /// current clip and is dropped when it runs out.
    blend: Option<Bvh>,

    state: LocomotionState,
    location: Vector3<f32>,
    rotation: Quaternion,
    /// World units traveled per tick.
    speed: f32,
    /// Frame of the playing clip (or blend); drives clip sampling.
    frame_number: u32,
    /// Ticks since the current veer began; drives the heading slerp. Kept
    /// separate from `frame_number`, which resets when a blend hands off.
    veer_elapsed: u32,
    veer_from: Quaternion,
    veer_to: Quaternion,

    /// Half-extent of the walkable rectangle in x and y.
    terrain_range: (f32, f32),
}

impl Scene {
    /// Loads every asset named by the config.
    pub fn new(config: Config) -> Result<Scene> {
        let terrain = Terrain::read_file(&config.terrain_path, config.terrain_xy_scale)?;
        let rest_pose = Bvh::read_file(&config.rest_path)?;
        let run_cycle = Bvh::read_file(&config.run_path)?;
        let veer_left_cycle = Bvh::read_file(&config.veer_left_path)?;
        let veer_right_cycle = Bvh::read_file(&config.veer_right_path)?;

        Scene::with_assets(
            config,
            terrain,
            rest_pose,
            run_cycle,
            veer_left_cycle,
            veer_right_cycle,
        )
    }

    /// Builds a scene from already-loaded assets. All clips must share a
    /// joint count or blending between them would be meaningless.
    pub fn with_assets(
        config: Config,
        terrain: Terrain,
        rest_pose: Bvh,
        run_cycle: Bvh,
        veer_left_cycle: Bvh,
        veer_right_cycle: Bvh,
    ) -> Result<Scene> {
        let num_joints = rest_pose.num_joints();
        let all_match = run_cycle.num_joints() == num_joints
            && veer_left_cycle.num_joints() == num_joints
            && veer_right_cycle.num_joints() == num_joints;
        if !all_match {
            bail!("animation clips disagree about the number of joints");
        }

        let range_x = terrain.xy_scale * ((terrain.num_cols() - 1) as f32) / 2.0
            - config.terrain_padding;
        let range_y = terrain.xy_scale * ((terrain.num_rows() - 1) as f32) / 2.0
            - config.terrain_padding;

        let mut scene = Scene {
            config,
            terrain,
            rest_pose,
            run_cycle,
            veer_left_cycle,
            veer_right_cycle,
            current: ClipId::Rest,
            blend: None,
            state: LocomotionState::Resting,
            location: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::identity(),
            speed: 0.0,
            frame_number: 0,
            veer_elapsed: 0,
            veer_from: Quaternion::identity(),
            veer_to: Quaternion::identity(),
            terrain_range: (range_x, range_y),
        };
        scene.event_reset();
        Ok(scene)
    }

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn location(&self) -> Vector3<f32> {
        self.location
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    pub fn blend_active(&self) -> bool {
        self.blend.is_some()
    }

    fn clip(&self, id: ClipId) -> &Bvh {
        match id {
            ClipId::Rest => &self.rest_pose,
            ClipId::Run => &self.run_cycle,
            ClipId::VeerLeft => &self.veer_left_cycle,
            ClipId::VeerRight => &self.veer_right_cycle,
        }
    }

    /// Synthesizes a blend from the pose on screen right now into `target`
    /// and makes it the playing clip.
    fn start_blend(&mut self, target: ClipId) {
        let length = self.config.blend_frames() as usize;
        let source = match self.blend {
            Some(ref b) => b,
            None => self.clip(self.current),
        };
        let blend = source.blend(self.frame_number, self.clip(target), length);
        self.blend = Some(blend);
        self.current = target;
        self.frame_number = 0;
    }

    /// Start (or keep) running forward.
    pub fn event_forward(&mut self) {
        if self.state == LocomotionState::Running {
            return;
        }
        self.start_blend(ClipId::Run);
        self.state = LocomotionState::Running;
        self.speed = self.config.speed_delta;
        self.veer_elapsed = 0;
    }

    /// Stop and stand.
    pub fn event_backward(&mut self) {
        if self.state == LocomotionState::Resting {
            return;
        }
        self.start_blend(ClipId::Rest);
        self.state = LocomotionState::Resting;
        self.speed = 0.0;
        self.veer_elapsed = 0;
    }

    pub fn event_turn_left(&mut self) {
        if self.state == LocomotionState::VeeringLeft {
            return;
        }
        self.begin_veer(ClipId::VeerLeft, LocomotionState::VeeringLeft, 1.0);
    }

    pub fn event_turn_right(&mut self) {
        if self.state == LocomotionState::VeeringRight {
            return;
        }
        self.begin_veer(ClipId::VeerRight, LocomotionState::VeeringRight, -1.0);
    }

    fn begin_veer(&mut self, clip: ClipId, state: LocomotionState, direction: f32) {
        self.veer_from = self.rotation;
        // Half the veer angle: the axis-angle constructor applies 2θ.
        self.veer_to = self.rotation
            * Quaternion::from_axis_angle(up(), direction * self.config.veer_angle / 2.0);
        self.start_blend(clip);
        self.state = state;
        self.veer_elapsed = 0;
    }

    /// Back to the origin, at rest, facing the rest heading.
    pub fn event_reset(&mut self) {
        self.current = ClipId::Rest;
        self.blend = None;
        self.state = LocomotionState::Resting;
        self.rotation = Quaternion::identity();
        self.speed = 0.0;
        self.frame_number = 0;
        self.veer_elapsed = 0;
        self.location = vec3(0.0, 0.0, self.terrain.height_at(0.0, 0.0));
    }

    /// Advances the scene by one tick.
    pub fn update(&mut self) {
        self.frame_number += 1;

        // A finished blend hands off to the clip it was blending into.
        if let Some(ref blend) = self.blend {
            if self.frame_number >= blend.frame_count as u32 {
                self.frame_number = 0;
                self.blend = None;
            }
        }

        let veering = self.state == LocomotionState::VeeringLeft
            || self.state == LocomotionState::VeeringRight;
        if veering {
            self.veer_elapsed += 1;
            let veer_frames = self.config.veer_frames();
            if self.veer_elapsed < veer_frames {
                let t = self.veer_elapsed as f32 / veer_frames as f32;
                self.rotation = slerp(self.veer_from, self.veer_to, t);
            } else {
                // Veer complete: land exactly on the target heading and
                // blend back into the ongoing gait.
                self.rotation = self.veer_to;
                self.veer_elapsed = 0;
                if self.speed > 0.0 {
                    self.start_blend(ClipId::Run);
                    self.state = LocomotionState::Running;
                } else {
                    self.start_blend(ClipId::Rest);
                    self.state = LocomotionState::Resting;
                }
            }
        }

        // Walk along the heading, staying inside the padded rectangle, and
        // stick to the terrain surface.
        let direction = (self.rotation.matrix() * forward().extend(0.0)).truncate();
        let (range_x, range_y) = self.terrain_range;
        let x = (self.location.x + self.speed * direction.x).max(-range_x).min(range_x);
        let y = (self.location.y + self.speed * direction.y).max(-range_y).min(range_y);
        self.location = vec3(x, y, self.terrain.height_at(x, y));
    }

    /// Emits the terrain and the character's current pose.
    pub fn render(&self, prims: &mut Primitives, view: Matrix4<f32>) {
        prims.begin(GROUND_COLOR);
        self.terrain.render(prims, &view);
        prims.end();

        prims.begin(BONE_COLOR);
        let character =
            view * Matrix4::from_translation(self.location) * self.rotation.matrix();
        let clip = match self.blend {
            Some(ref b) => b,
            None => self.clip(self.current),
        };
        clip.render(prims, character, self.config.character_scale, self.frame_number);
        prims.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1.0e-5, "{} != {}", a, b);
    }

    fn test_config() -> Config {
        let mut config = Config::with_asset_dir(Path::new("assets"));
        config.terrain_xy_scale = 1.0;
        config
    }

    fn test_scene(config: Config) -> Scene {
        // A flat 201x201 grid at spacing 1: half-extent 100, so with the
        // default padding the walkable range is 84.
        let terrain = Terrain::from_grid(vec![vec![0.0; 201]; 201], 1.0).unwrap();
        let clip = || Bvh::read_str(crate::bvh::TEST_CLIP).unwrap();
        Scene::with_assets(config, terrain, clip(), clip(), clip(), clip()).unwrap()
    }

    #[test]
    fn starts_at_rest_on_the_terrain() {
        let scene = test_scene(test_config());
        assert_eq!(scene.state(), LocomotionState::Resting);
        assert_eq!(scene.speed(), 0.0);
        assert_eq!(scene.frame_number(), 0);
        assert!(!scene.blend_active());
        assert_close(scene.location().z, scene.terrain.height_at(0.0, 0.0));
    }

    #[test]
    fn rejects_mismatched_clips() {
        let terrain = Terrain::from_grid(vec![vec![0.0; 3]; 3], 1.0).unwrap();
        let clip = || Bvh::read_str(crate::bvh::TEST_CLIP).unwrap();
        let one_joint = Bvh::read_str(
            "HIERARCHY\nROOT Hips\n{\nOFFSET 0 0 0\nCHANNELS 3 Zrotation Xrotation Yrotation\n}\n\
             MOTION\nFrames: 1\nFrame Time: 0.04\n0 0 0\n",
        ).unwrap();
        let config = test_config();
        assert!(
            Scene::with_assets(config, terrain, clip(), one_joint, clip(), clip()).is_err()
        );
    }

    #[test]
    fn forward_blends_into_a_run() {
        let mut scene = test_scene(test_config());
        scene.event_forward();

        assert_eq!(scene.state(), LocomotionState::Running);
        assert_eq!(scene.speed(), 1.0);
        assert!(scene.blend_active());
        assert_eq!(scene.frame_number(), 0);

        // The blend plays out over blend_frames ticks, then hands off to
        // the run cycle with the frame counter rewound.
        let blend_frames = scene.config.blend_frames();
        for _ in 0..blend_frames - 1 {
            scene.update();
            assert!(scene.blend_active());
        }
        scene.update();
        assert!(!scene.blend_active());
        assert_eq!(scene.frame_number(), 0);
    }

    #[test]
    fn running_moves_forward_and_clamps_to_the_terrain() {
        let mut config = test_config();
        config.speed_delta = 150.0;
        let mut scene = test_scene(config);

        scene.event_forward();
        scene.update();

        // One step of 150 along +y clamps exactly to the padded range.
        let location = scene.location();
        assert_eq!(location.x, 0.0);
        assert_eq!(location.y, 84.0);
    }

    #[test]
    fn backward_comes_to_rest() {
        let mut scene = test_scene(test_config());
        scene.event_forward();
        for _ in 0..20 {
            scene.update();
        }
        let y_before = scene.location().y;
        assert!(y_before > 0.0);

        scene.event_backward();
        assert_eq!(scene.state(), LocomotionState::Resting);
        assert_eq!(scene.speed(), 0.0);
        assert!(scene.blend_active());

        scene.update();
        assert_close(scene.location().y, y_before);
    }

    #[test]
    fn events_are_no_ops_in_their_own_state() {
        let mut scene = test_scene(test_config());

        // Backward at rest changes nothing.
        scene.event_backward();
        assert!(!scene.blend_active());

        // A second forward doesn't restart the blend.
        scene.event_forward();
        for _ in 0..3 {
            scene.update();
        }
        let frame = scene.frame_number();
        scene.event_forward();
        assert_eq!(scene.frame_number(), frame);
    }

    #[test]
    fn veer_turns_the_heading_over_its_full_duration() {
        let mut scene = test_scene(test_config());
        scene.event_forward();
        for _ in 0..50 {
            scene.update();
        }
        assert_eq!(scene.state(), LocomotionState::Running);

        scene.event_turn_left();
        assert_eq!(scene.state(), LocomotionState::VeeringLeft);
        assert!(scene.blend_active());

        // The veer lasts exactly veer_frames ticks, then the run resumes.
        let veer_frames = scene.config.veer_frames();
        assert_eq!(veer_frames, 33);
        for _ in 0..veer_frames - 1 {
            scene.update();
            assert_eq!(scene.state(), LocomotionState::VeeringLeft);
        }
        scene.update();
        assert_eq!(scene.state(), LocomotionState::Running);
        assert!(scene.blend_active());

        // The heading ends up rotated 45 degrees to the left.
        let direction = (scene.rotation.matrix() * forward().extend(0.0)).truncate();
        let expected = 45.0_f32.to_radians();
        assert_close(direction.x, -expected.sin());
        assert_close(direction.y, expected.cos());
    }

    #[test]
    fn repeated_turn_in_the_same_direction_is_ignored() {
        let mut scene = test_scene(test_config());
        scene.event_forward();
        scene.event_turn_left();
        for _ in 0..5 {
            scene.update();
        }
        // This must not restart the veer timer.
        scene.event_turn_left();
        for _ in 0..scene.config.veer_frames() - 5 {
            scene.update();
        }
        assert_eq!(scene.state(), LocomotionState::Running);
    }

    #[test]
    fn veer_at_rest_returns_to_rest() {
        let mut scene = test_scene(test_config());
        scene.event_turn_right();
        assert_eq!(scene.state(), LocomotionState::VeeringRight);

        for _ in 0..scene.config.veer_frames() {
            scene.update();
        }
        assert_eq!(scene.state(), LocomotionState::Resting);
        assert_eq!(scene.speed(), 0.0);

        // Heading rotated 45 degrees to the right.
        let direction = (scene.rotation.matrix() * forward().extend(0.0)).truncate();
        let expected = 45.0_f32.to_radians();
        assert_close(direction.x, expected.sin());
        assert_close(direction.y, expected.cos());
    }

    #[test]
    fn last_event_wins() {
        let mut scene = test_scene(test_config());
        scene.event_forward();
        scene.event_turn_left();
        assert_eq!(scene.state(), LocomotionState::VeeringLeft);
        scene.event_backward();
        assert_eq!(scene.state(), LocomotionState::Resting);

        // The cancelled veer leaves no residue: ticks pass without the
        // heading moving.
        for _ in 0..40 {
            scene.update();
        }
        let direction = (scene.rotation.matrix() * forward().extend(0.0)).truncate();
        assert_close(direction.x, 0.0);
        assert_close(direction.y, 1.0);
    }

    #[test]
    fn degenerate_blend_duration_collapses_to_a_cut() {
        use cgmath::SquareMatrix;

        // Durations that round to zero frames must still yield a sampleable
        // transition clip.
        let mut config = test_config();
        config.blend_seconds = 0.0;
        config.veer_seconds = 0.0;
        assert_eq!(config.blend_frames(), 1);
        assert_eq!(config.veer_frames(), 1);

        let mut scene = test_scene(config);
        scene.event_forward();

        // Rendering before the first tick samples the one-frame blend.
        let mut prims = Primitives::new();
        scene.render(&mut prims, Matrix4::identity());
        assert!(prims.num_triangles() > 0);

        scene.update();
        assert_eq!(scene.state(), LocomotionState::Running);
        assert!(!scene.blend_active());

        // A one-frame veer ends on its first tick.
        scene.event_turn_left();
        scene.update();
        assert_eq!(scene.state(), LocomotionState::Running);
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut scene = test_scene(test_config());
        scene.event_forward();
        for _ in 0..30 {
            scene.update();
        }
        scene.event_turn_right();
        for _ in 0..5 {
            scene.update();
        }

        scene.event_reset();
        assert_eq!(scene.state(), LocomotionState::Resting);
        assert_eq!(scene.speed(), 0.0);
        assert_eq!(scene.frame_number(), 0);
        assert!(!scene.blend_active());
        let location = scene.location();
        assert_eq!(location.x, 0.0);
        assert_eq!(location.y, 0.0);
    }
}
