mod eye;
mod main_loop;
mod scene_pass;
mod viewer;

use crate::cli::Args;
use crate::errors::Result;
use crate::scene::{Config, Scene};
use std::path::PathBuf;

pub const WINDOW_WIDTH: u32 = 1024;
pub const WINDOW_HEIGHT: u32 = 768;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 4000.0;
pub const FOV_Y: f32 = 1.1;
/// Sky color.
pub const BG_COLOR: (f32, f32, f32, f32) = (0.7, 0.7, 1.0, 1.0);

pub fn main(args: &Args) -> Result<()> {
    let asset_dir = args
        .asset_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("assets"));
    let config = Config::with_asset_dir(&asset_dir);
    let scene = Scene::new(config)?;

    main_loop::main_loop(scene);
    Ok(())
}
