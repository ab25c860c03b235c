//! Recursive-descent parser for the BVH text format.
//!
//! The format has two sections. `HIERARCHY` nests joint blocks:
//!
//! ```text
//! ROOT Hips
//! {
//!     OFFSET 0.0 0.0 0.0
//!     CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
//!     JOINT Chest
//!     {
//!         ...
//!         End Site
//!         {
//!             OFFSET 0.0 7.0 0.0
//!         }
//!     }
//! }
//! ```
//!
//! `MOTION` gives a frame count, a frame duration, and then one line of
//! floats per frame, split across joints in hierarchy order by each joint's
//! channel count.

use cgmath::{Vector3, vec3, Zero};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::bvh::{Bvh, Channel, Joint, JointIdx, Skeleton, NO_PARENT};
use crate::errors::{Result, ResultExt};

impl Bvh {
    pub fn read_file(path: &Path) -> Result<Bvh> {
        let text = fs::read_to_string(path)
            .chain_err(|| format!("couldn't read {}", path.display()))?;
        Bvh::read_str(&text)
            .chain_err(|| format!("bad BVH data in {}", path.display()))
    }

    pub fn read_str(text: &str) -> Result<Bvh> {
        let mut lines = Lines { iter: text.lines() };

        let mut skeleton: Option<Skeleton> = None;

        loop {
            let tokens = match lines.try_next() {
                Some(t) => t,
                None => break,
            };
            match tokens.first().cloned() {
                Some("HIERARCHY") => {
                    let header = lines.next()?;
                    let mut builder = SkeletonBuilder {
                        joints: vec![],
                        parents: vec![],
                    };
                    read_joint(&mut lines, &header, NO_PARENT, &mut builder)?;
                    skeleton = Some(builder.finish());
                }
                Some("MOTION") => {
                    let skeleton = match skeleton {
                        Some(s) => s,
                        None => bail!("MOTION section before HIERARCHY"),
                    };
                    return read_motion(&mut lines, skeleton);
                }
                _ => (),
            }
        }

        bail!("no MOTION section")
    }
}

/// Line-by-line token cursor over the input.
struct Lines<'a> {
    iter: std::str::Lines<'a>,
}

impl<'a> Lines<'a> {
    /// Next line, tokenized; None at end of input.
    fn try_next(&mut self) -> Option<Vec<&'a str>> {
        self.iter
            .next()
            .map(|line| line.split_whitespace().collect())
    }

    /// Next line, tokenized; running out of input is an error.
    fn next(&mut self) -> Result<Vec<&'a str>> {
        match self.try_next() {
            Some(t) => Ok(t),
            None => bail!("file ended early"),
        }
    }
}

struct SkeletonBuilder {
    joints: Vec<Joint>,
    parents: Vec<i32>,
}

impl SkeletonBuilder {
    fn finish(self) -> Skeleton {
        let translations = self.joints.iter().map(|j| j.offset).collect();
        Skeleton {
            joints: self.joints,
            parents: self.parents,
            translations,
        }
    }
}

/// Parses one `ROOT`/`JOINT` block (given its header tokens) and all its
/// descendants. The new joint takes the next sequential index, so indices
/// equal parse order.
fn read_joint(
    lines: &mut Lines,
    header: &[&str],
    parent: i32,
    builder: &mut SkeletonBuilder,
) -> Result<JointIdx> {
    let name = match header.get(1) {
        Some(&name) => name.to_string(),
        None => bail!("joint is missing a name"),
    };

    let id = builder.joints.len() as JointIdx;
    builder.joints.push(Joint {
        name,
        offset: Vector3::zero(),
        channels: vec![],
        children: vec![],
    });
    builder.parents.push(parent);

    let open = lines.next()?;
    if open.first() != Some(&"{") {
        bail!("expected {{ after joint {}", builder.joints[id as usize].name);
    }

    loop {
        let tokens = lines.next()?;
        match tokens.first().cloned() {
            Some("OFFSET") => {
                if tokens.len() < 4 {
                    bail!("OFFSET needs three components");
                }
                let x = tokens[1].parse::<f32>()?;
                let y = tokens[2].parse::<f32>()?;
                let z = tokens[3].parse::<f32>()?;
                builder.joints[id as usize].offset = vec3(x, y, z);
            }
            Some("CHANNELS") => {
                let count = match tokens.get(1) {
                    Some(t) => t.parse::<usize>()?,
                    None => bail!("CHANNELS needs a count"),
                };
                if tokens.len() < 2 + count {
                    bail!("CHANNELS declares {} names but lists fewer", count);
                }
                let channels = tokens[2..2 + count]
                    .iter()
                    .map(|t| Channel::from_token(t))
                    .collect::<Result<Vec<Channel>>>()?;
                builder.joints[id as usize].channels = channels;
            }
            Some("JOINT") => {
                let child = read_joint(lines, &tokens, id as i32, builder)?;
                builder.joints[id as usize].children.push(child);
            }
            Some("End") => {
                // End sites carry no joint; skip the block ({, OFFSET, }).
                for _ in 0..3 {
                    lines.next()?;
                }
            }
            Some("}") => break,
            _ => bail!("unexpected line in joint block: {:?}", tokens),
        }
    }

    Ok(id)
}

fn read_motion(lines: &mut Lines, skeleton: Skeleton) -> Result<Bvh> {
    let frames_line = lines.next()?;
    if frames_line.first() != Some(&"Frames:") || frames_line.len() < 2 {
        bail!("expected a Frames: line");
    }
    let frame_count = frames_line[1].parse::<usize>()?;
    if frame_count == 0 {
        bail!("clip has no frames");
    }

    // "Frame Time:" tokenizes into three pieces.
    let time_line = lines.next()?;
    if time_line.first() != Some(&"Frame") || time_line.len() < 3 {
        bail!("expected a Frame Time: line");
    }
    let frame_time = time_line[2].parse::<f32>()?;

    let num_channels: usize = skeleton.joints.iter().map(|j| j.channels.len()).sum();

    let mut rotations = Vec::with_capacity(frame_count);
    for _ in 0..frame_count {
        let tokens = lines.next().chain_err(|| "fewer frame lines than declared")?;
        let mut floats = Vec::with_capacity(num_channels);
        for token in &tokens {
            floats.push(token.parse::<f32>()?);
        }
        if floats.len() != num_channels {
            bail!(
                "frame has {} values but the skeleton has {} channels",
                floats.len(),
                num_channels
            );
        }
        rotations.push(frame_rotations(&skeleton, &floats));
    }

    Ok(Bvh {
        skeleton: Rc::new(skeleton),
        frame_count,
        frame_time,
        rotations,
    })
}

/// Splits one frame's float vector across joints in parse order. Only
/// rotation channels are retained, and each value lands on its channel's
/// declared axis, not its column position.
fn frame_rotations(skeleton: &Skeleton, floats: &[f32]) -> Vec<Vector3<f32>> {
    let mut rotations = Vec::with_capacity(skeleton.joints.len());
    let mut pos = 0;
    for joint in &skeleton.joints {
        let mut rotation = Vector3::zero();
        for (k, channel) in joint.channels.iter().enumerate() {
            if let Some(axis) = channel.rotation_axis() {
                rotation[axis] = floats[pos + k];
            }
        }
        pos += joint.channels.len();
        rotations.push(rotation);
    }
    rotations
}
