//! Prints summaries of animation and terrain files.

use std::path::Path;

use crate::bvh::{Bvh, NO_PARENT};
use crate::cli::Args;
use crate::errors::Result;
use crate::surface::TriangleSoup;
use crate::terrain::Terrain;

pub fn main(args: &Args) -> Result<()> {
    for free_arg in &args.free_args {
        let path = Path::new(free_arg);
        // Report bad files and keep going with the rest.
        if let Err(e) = info_file(path) {
            error!("error in {}: {}", path.display(), e);
        }
    }
    Ok(())
}

fn info_file(path: &Path) -> Result<()> {
    let extension = path.extension().and_then(|e| e.to_str());
    match extension {
        Some("bvh") => bvh_info(path),
        Some("dem") => terrain_info(path),
        Some("tri") => surface_info(path),
        _ => {
            warn!(
                "skipping {}: don't know this extension (expected .bvh, .dem, or .tri)",
                path.display(),
            );
            Ok(())
        }
    }
}

fn bvh_info(path: &Path) -> Result<()> {
    let clip = Bvh::read_file(path)?;

    println!("{}:", path.display());
    println!(
        "  {} frames at {} s/frame ({:.2} s)",
        clip.frame_count,
        clip.frame_time,
        clip.duration(),
    );
    println!("  {} joints:", clip.num_joints());
    println!("    Id  Parent  Channels  Name");
    for (id, joint) in clip.skeleton.joints.iter().enumerate() {
        let parent = clip.skeleton.parents[id];
        let parent = if parent == NO_PARENT {
            "-".to_string()
        } else {
            parent.to_string()
        };
        println!(
            "    {:<4}{:<8}{:<10}{}",
            id,
            parent,
            joint.channels.len(),
            joint.name,
        );
    }
    Ok(())
}

fn terrain_info(path: &Path) -> Result<()> {
    // Unit spacing: extents below are in grid units.
    let terrain = Terrain::read_file(path, 1.0)?;

    let mut min = std::f32::INFINITY;
    let mut max = std::f32::NEG_INFINITY;
    for row in &terrain.height_values {
        for &h in row {
            min = min.min(h);
            max = max.max(h);
        }
    }

    println!("{}:", path.display());
    println!("  {} x {} samples", terrain.num_rows(), terrain.num_cols());
    println!(
        "  {} x {} cells, {} triangles",
        terrain.num_rows() - 1,
        terrain.num_cols() - 1,
        terrain.surface.num_triangles(),
    );
    println!("  elevation range [{}, {}]", min, max);
    Ok(())
}

fn surface_info(path: &Path) -> Result<()> {
    let soup = TriangleSoup::read_file(path)?;

    println!("{}:", path.display());
    println!("  {} triangles", soup.num_triangles());

    if !soup.vertices.is_empty() {
        let mut lo = soup.vertices[0];
        let mut hi = soup.vertices[0];
        for v in &soup.vertices {
            lo.x = lo.x.min(v.x);
            lo.y = lo.y.min(v.y);
            lo.z = lo.z.min(v.z);
            hi.x = hi.x.max(v.x);
            hi.y = hi.y.max(v.y);
            hi.z = hi.z.max(v.z);
        }
        println!(
            "  bounds [{}, {}, {}] to [{}, {}, {}]",
            lo.x, lo.y, lo.z, hi.x, hi.y, hi.z,
        );
    }
    Ok(())
}
