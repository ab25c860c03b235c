#![recursion_limit = "1024"] // for error_chain

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate glium;
#[macro_use]
extern crate log;

mod bvh;
mod cli;
mod errors;
mod info;
mod logger;
mod primitives;
mod quaternion;
mod scene;
mod surface;
mod terrain;
mod version;
mod viewer;

use crate::errors::Result;
use std::process::exit;

fn main() {
    let args = cli::parse_cli_args();

    let log_level = match args.verbose {
        true => log::Level::Debug,
        false => log::Level::Info,
    };
    logger::init(log_level);

    let res: Result<()> = match args.subcommand {
        "view" => viewer::main(&args),
        "info" => info::main(&args),
        _ => unreachable!(),
    };

    if let Err(ref e) = res {
        error!("{}", e);
        for cause in e.iter().skip(1) {
            error!("caused by: {}", cause);
        }
        exit(1);
    }
}
