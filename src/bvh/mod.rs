//! Motion-capture clips in the BVH format.
//!
//! A clip is a skeleton (a tree of joints, each with a rest offset from its
//! parent) plus a time series of per-joint Euler rotations, one entry per
//! frame. The joint tree is stored as an arena: joints live in a flat vector
//! in parse order and refer to their children by index, with a parallel
//! parent-index table (root maps to -1). That makes indexed access O(1) and
//! lets synthesized blend clips share the skeleton through an `Rc` while
//! owning only their small rotation window.
//!
//! Format reference: <https://research.cs.wisc.edu/graphics/Courses/cs-838-1999/Jeff/BVH.html>

mod read;

use cgmath::{Deg, InnerSpace, Matrix4, Vector3, Zero, vec3};
use std::f32::consts::PI;
use std::rc::Rc;

use crate::primitives::Primitives;
use crate::quaternion::rotate_between;

pub type JointIdx = u16;

/// Parent index of the root joint.
pub const NO_PARENT: i32 = -1;

const CYLINDER_RADIUS: f32 = 0.2;
const CYLINDER_SLICES: u32 = 10;

pub struct Joint {
    pub name: String,
    /// Rest-pose translation from the parent, in bone space.
    pub offset: Vector3<f32>,
    /// Channel list in the order the file declares it.
    pub channels: Vec<Channel>,
    pub children: Vec<JointIdx>,
}

/// The immutable part of a clip, shared between a loaded clip and any blend
/// clips synthesized from it.
pub struct Skeleton {
    /// All joints in parse order; a joint's index is its position here.
    pub joints: Vec<Joint>,
    /// joints[i]'s parent is joints[parents[i]]; NO_PARENT for the root.
    pub parents: Vec<i32>,
    /// Per-joint rest translations (constant across frames).
    pub translations: Vec<Vector3<f32>>,
}

pub struct Bvh {
    pub skeleton: Rc<Skeleton>,
    pub frame_count: usize,
    /// Seconds per frame, as declared by the file.
    pub frame_time: f32,
    /// Euler angles in degrees, indexed by frame then joint.
    pub rotations: Vec<Vec<Vector3<f32>>>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Channel {
    XPosition,
    YPosition,
    ZPosition,
    XRotation,
    YRotation,
    ZRotation,
}

impl Channel {
    fn from_token(token: &str) -> crate::errors::Result<Channel> {
        Ok(match token {
            "Xposition" => Channel::XPosition,
            "Yposition" => Channel::YPosition,
            "Zposition" => Channel::ZPosition,
            "Xrotation" => Channel::XRotation,
            "Yrotation" => Channel::YRotation,
            "Zrotation" => Channel::ZRotation,
            _ => bail!("unknown channel {:?}", token),
        })
    }

    /// Which rotation axis this channel drives; None for position channels
    /// (only rest offsets supply translation in this model).
    pub fn rotation_axis(self) -> Option<usize> {
        match self {
            Channel::XRotation => Some(0),
            Channel::YRotation => Some(1),
            Channel::ZRotation => Some(2),
            _ => None,
        }
    }
}

impl Bvh {
    pub fn num_joints(&self) -> usize {
        self.skeleton.joints.len()
    }

    /// Total clip duration in seconds.
    pub fn duration(&self) -> f32 {
        self.frame_count as f32 * self.frame_time
    }

    /// Emits the pose at `frame` as oriented bone cylinders.
    ///
    /// `frame` is taken modulo the frame count, so playback loops forever.
    /// The BVH convention is right-handed with +Y up; a basis change maps it
    /// to our world (+Z up, +Y forward) before any joint transform applies.
    pub fn render(&self, prims: &mut Primitives, view: Matrix4<f32>, scale: f32, frame: u32) {
        let base = Matrix4::from_angle_z(Deg(180.0)) * Matrix4::from_angle_x(Deg(-90.0));
        self.render_joint(prims, &view, base, 0, scale, frame);
    }

    fn render_joint(
        &self,
        prims: &mut Primitives,
        view: &Matrix4<f32>,
        parent_matrix: Matrix4<f32>,
        joint: JointIdx,
        scale: f32,
        frame: u32,
    ) {
        let skeleton = &self.skeleton;
        let frame_index = frame as usize % self.frame_count;
        let rotation = self.rotations[frame_index][joint as usize];

        let translation =
            Matrix4::from_translation(scale * skeleton.translations[joint as usize]);
        // Negated to match the capture convention's handedness.
        let rotation = Matrix4::from_angle_x(Deg(-rotation.x))
            * Matrix4::from_angle_y(Deg(-rotation.y))
            * Matrix4::from_angle_z(Deg(-rotation.z));

        let joint_matrix = parent_matrix * translation * rotation;
        let joint_view = view * joint_matrix;

        for &child in &skeleton.joints[joint as usize].children {
            // The bone runs from this joint's local origin to the scaled
            // child offset.
            let bone_end = scale * skeleton.translations[child as usize];
            render_oriented_cylinder(prims, &joint_view, Vector3::zero(), bone_end);
            self.render_joint(prims, view, joint_matrix, child, scale, frame);
        }
    }

    /// Synthesizes a one-shot transition clip of `length` frames blending
    /// this clip's pose at `frame` into `target`'s pose at frame 0, eased
    /// in and out. The skeleton and rest translations are shared; only the
    /// small rotation window is owned.
    pub fn blend(&self, frame: u32, target: &Bvh, length: usize) -> Bvh {
        let source = &self.rotations[frame as usize % self.frame_count];
        let destination = &target.rotations[0];

        let mut rotations = Vec::with_capacity(length);
        for f in 0..length {
            let t = ease_in_out(f as f32 / length as f32);
            let frame_rotations = source
                .iter()
                .zip(destination)
                .map(|(&a, &b)| a * (1.0 - t) + b * t)
                .collect();
            rotations.push(frame_rotations);
        }

        Bvh {
            skeleton: Rc::clone(&self.skeleton),
            frame_count: length,
            frame_time: self.frame_time,
            rotations,
        }
    }
}

/// The ease-in/ease-out weight curve `t² / (2(t² − t) + 1)`.
pub fn ease_in_out(t: f32) -> f32 {
    let sq = t * t;
    sq / (2.0 * (sq - t) + 1.0)
}

fn render_oriented_cylinder(
    prims: &mut Primitives,
    view: &Matrix4<f32>,
    start: Vector3<f32>,
    end: Vector3<f32>,
) {
    let axis = end - start;
    let length = axis.magnitude();
    if length == 0.0 {
        return;
    }

    // Cylinders are modeled along +Z; rotate onto the bone vector.
    let cylinder_view = view * rotate_between(vec3(0.0, 0.0, 1.0), axis / length);
    render_cylinder(prims, &cylinder_view, CYLINDER_RADIUS, length, CYLINDER_SLICES);
}

fn render_cylinder(
    prims: &mut Primitives,
    view: &Matrix4<f32>,
    radius: f32,
    length: f32,
    slices: u32,
) {
    for i in 0..slices {
        let theta = i as f32 * 2.0 * PI / slices as f32;
        let next_theta = (i + 1) as f32 * 2.0 * PI / slices as f32;
        let mid_theta = 0.5 * (theta + next_theta);

        let center_up = vec3(0.0, 0.0, length);
        let edge1 = vec3(radius * theta.cos(), radius * theta.sin(), length);
        let edge2 = vec3(radius * next_theta.cos(), radius * next_theta.sin(), length);
        let edge3 = vec3(radius * next_theta.cos(), radius * next_theta.sin(), 0.0);
        let edge4 = vec3(radius * theta.cos(), radius * theta.sin(), 0.0);
        let center_bottom = Vector3::zero();

        let normal_up = vec3(0.0, 0.0, 1.0);
        let normal_edge = vec3(mid_theta.cos(), mid_theta.sin(), 0.0);
        let normal_bottom = vec3(0.0, 0.0, -1.0);

        // Top cap, two side triangles, bottom cap.
        prims.push_tri(view, center_up, edge1, edge2, normal_up);
        prims.push_tri(view, edge2, edge1, edge4, normal_edge);
        prims.push_tri(view, edge2, edge4, edge3, normal_edge);
        prims.push_tri(view, edge3, edge4, center_bottom, normal_bottom);
    }
}

/// Small three-joint clip used by tests here and in `scene`.
#[cfg(test)]
pub(crate) static TEST_CLIP: &str = "\
HIERARCHY
ROOT Hips
{
    OFFSET 0.0 0.0 0.0
    CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
    JOINT Chest
    {
        OFFSET 0.0 5.0 0.0
        CHANNELS 3 Zrotation Xrotation Yrotation
        JOINT Head
        {
            OFFSET 0.0 4.0 0.0
            CHANNELS 3 Zrotation Xrotation Yrotation
            End Site
            {
                OFFSET 0.0 2.0 0.0
            }
        }
    }
}
MOTION
Frames: 2
Frame Time: 0.0416667
1.0 2.0 3.0 10.0 20.0 30.0 40.0 50.0 60.0 70.0 80.0 90.0
1.0 2.0 3.0 11.0 21.0 31.0 41.0 51.0 61.0 71.0 81.0 91.0
";

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    fn test_clip() -> Bvh {
        Bvh::read_str(TEST_CLIP).unwrap()
    }

    #[test]
    fn joint_indices_follow_parse_order() {
        let clip = test_clip();
        let skeleton = &clip.skeleton;

        assert_eq!(clip.num_joints(), 3);
        assert_eq!(skeleton.joints[0].name, "Hips");
        assert_eq!(skeleton.joints[1].name, "Chest");
        assert_eq!(skeleton.joints[2].name, "Head");
        assert_eq!(skeleton.parents, vec![NO_PARENT, 0, 1]);
        assert_eq!(skeleton.joints[0].children, vec![1]);
        assert_eq!(skeleton.joints[1].children, vec![2]);
        assert_eq!(skeleton.joints[2].children, vec![]);
    }

    #[test]
    fn channels_and_offsets_parse() {
        let clip = test_clip();
        let skeleton = &clip.skeleton;

        assert_eq!(skeleton.joints[0].channels.len(), 6);
        assert_eq!(skeleton.joints[1].channels.len(), 3);
        assert_eq!(skeleton.translations[1], vec3(0.0, 5.0, 0.0));
        assert_eq!(skeleton.translations[2], vec3(0.0, 4.0, 0.0));
    }

    #[test]
    fn rotations_land_on_declared_axes() {
        let clip = test_clip();
        assert_eq!(clip.frame_count, 2);
        assert!((clip.frame_time - 0.0416667).abs() < 1.0e-6);

        // Hips channels are Zrotation Xrotation Yrotation: the values
        // 10, 20, 30 map to z, x, y.
        assert_eq!(clip.rotations[0][0], vec3(20.0, 30.0, 10.0));
        assert_eq!(clip.rotations[0][1], vec3(50.0, 60.0, 40.0));
        assert_eq!(clip.rotations[1][2], vec3(81.0, 91.0, 71.0));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Bvh::read_str("").is_err());
        assert!(Bvh::read_str("HIERARCHY\nROOT Hips\n").is_err());
        assert!(Bvh::read_str(&TEST_CLIP.replace("Zrotation", "Wrotation")).is_err());
        assert!(Bvh::read_str(&TEST_CLIP.replace("Frames: 2", "Frames: 3")).is_err());
        // A frame line with a missing value.
        assert!(Bvh::read_str(&TEST_CLIP.replace(" 91.0", "")).is_err());
    }

    #[test]
    fn missing_file_reports_an_error() {
        assert!(Bvh::read_file(std::path::Path::new("/no/such/clip.bvh")).is_err());
    }

    #[test]
    fn playback_loops() {
        let clip = test_clip();
        let mut a = Primitives::new();
        let mut b = Primitives::new();
        a.begin([1.0; 4]);
        clip.render(&mut a, Matrix4::identity(), 1.0, 1);
        a.end();
        b.begin([1.0; 4]);
        clip.render(&mut b, Matrix4::identity(), 1.0, 1 + 3 * clip.frame_count as u32);
        b.end();

        assert_eq!(a.vertices.len(), b.vertices.len());
        for (va, vb) in a.vertices.iter().zip(&b.vertices) {
            assert_eq!(va.position, vb.position);
            assert_eq!(va.normal, vb.normal);
        }
    }

    #[test]
    fn render_emits_one_cylinder_per_bone() {
        let clip = test_clip();
        let mut prims = Primitives::new();
        prims.begin([1.0; 4]);
        clip.render(&mut prims, Matrix4::identity(), 1.0, 0);
        prims.end();

        // Two bones (Hips->Chest, Chest->Head), 4 triangles per slice.
        let per_cylinder = 4 * CYLINDER_SLICES as usize;
        assert_eq!(prims.num_triangles(), 2 * per_cylinder);
    }

    #[test]
    fn blend_interpolates_toward_target() {
        let clip = test_clip();
        let target = Bvh::read_str(&TEST_CLIP.replace("40.0", "140.0")).unwrap();
        let length = 12;

        let blend = clip.blend(1, &target, length);

        assert_eq!(blend.frame_count, length);
        assert_eq!(blend.num_joints(), clip.num_joints());
        // Frame 0 is exactly the source pose (ease(0) = 0).
        assert_eq!(blend.rotations[0], clip.rotations[1]);

        // Every blend frame matches the eased lerp.
        for f in 0..length {
            let t = ease_in_out(f as f32 / length as f32);
            for j in 0..blend.num_joints() {
                let expected = clip.rotations[1][j] * (1.0 - t) + target.rotations[0][j] * t;
                let got = blend.rotations[f][j];
                assert!((got - expected).magnitude() < 1.0e-4);
            }
        }

        // The last frame is nearly (not exactly) the target's frame 0.
        let t_last = ease_in_out((length - 1) as f32 / length as f32);
        assert!(t_last > 0.95);
    }

    #[test]
    fn blend_shares_the_skeleton() {
        let clip = test_clip();
        let blend = clip.blend(0, &clip, 12);
        assert!(Rc::ptr_eq(&clip.skeleton, &blend.skeleton));
    }

    #[test]
    fn ease_curve_endpoints() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1.0e-6);
        // Slow start, fast middle.
        assert!(ease_in_out(0.25) < 0.25);
        assert!(ease_in_out(0.75) > 0.75);
    }
}
