//! CLI argument parsing.
//!
//! The option surface is small (one option with an argument, one flag), so
//! this is a hand-rolled loop rather than a parser library. Handles
//! `--assets <dir>`, `--assets=<dir>`, `-a <dir>` and the `--verbose` flag.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::exit;

pub struct Args {
    pub subcommand: &'static str,
    pub free_args: Vec<OsString>,
    pub asset_dir: Option<PathBuf>,
    pub verbose: bool,
}

pub fn parse_cli_args() -> Args {
    // wild expands wildcards in args for us on Windows.
    let mut argv = wild::args_os();
    let _exe_name = argv.next();

    let arg = match argv.next() {
        Some(x) => x,
        None => show_usage_and_exit(),
    };
    let arg = match arg.to_str() {
        Some(x) => x,
        None => {
            error!("don't understand {:?}", arg);
            info!("use `ambler help` for help");
            exit(1);
        }
    };

    match arg {
        "v" | "view" => parse_command("view", argv),
        "i" | "info" => parse_command("info", argv),
        "help" => help(argv),
        "-h" | "--help" => show_usage_and_exit(),
        "-V" | "--version" => version(),
        _ => {
            error!("don't understand {}", arg);
            info!("use `ambler help` for help");
            exit(1);
        }
    }
}

fn parse_command(subcommand: &'static str, mut argv: impl Iterator<Item = OsString>) -> Args {
    let mut args = Args {
        subcommand,
        free_args: vec![],
        asset_dir: None,
        verbose: false,
    };

    while let Some(os_arg) = argv.next() {
        let arg = match os_arg.to_str() {
            Some(s) => s,
            None => {
                args.free_args.push(os_arg);
                continue;
            }
        };
        match arg {
            "-h" | "--help" => match subcommand {
                "view" => show_view_help_and_exit(),
                _ => show_info_help_and_exit(),
            },
            "-v" | "--verbose" => {
                args.verbose = true;
            }
            "-a" | "--assets" => {
                let dir = match argv.next() {
                    Some(d) => d,
                    None => {
                        error!("expected a directory after --assets");
                        suggest_help_and_exit();
                    }
                };
                set_asset_dir(&mut args, dir.into());
            }
            _ if arg.starts_with("--assets=") => {
                set_asset_dir(&mut args, arg["--assets=".len()..].into());
            }
            _ if arg.starts_with('-') => {
                error!("don't understand option {}", arg);
                suggest_help_and_exit();
            }
            _ => args.free_args.push(os_arg),
        }
    }

    match subcommand {
        "view" => {
            if !args.free_args.is_empty() {
                error!("view takes no input files; use --assets to pick the asset directory");
                suggest_help_and_exit();
            }
        }
        _ => {
            if args.free_args.is_empty() {
                error!("give me some input files");
                suggest_help_and_exit();
            }
        }
    }

    args
}

fn set_asset_dir(args: &mut Args, dir: PathBuf) {
    if args.asset_dir.is_some() {
        error!("you already passed --assets");
        suggest_help_and_exit();
    }
    args.asset_dir = Some(dir);
}

fn help(mut argv: impl Iterator<Item = OsString>) -> ! {
    let arg = argv.next();
    let arg = arg.as_ref().and_then(|arg| arg.to_str());
    match arg {
        Some("view") => show_view_help_and_exit(),
        Some("info") => show_info_help_and_exit(),
        _ => show_usage_and_exit(),
    }
}

fn version() -> ! {
    crate::version::print_version_info();
    exit(0)
}

fn show_usage_and_exit() -> ! {
    print!(concat!(
        "\n",
        "  Usage: ambler <command> ...\n",
        "\n",
        "  Viewer for BVH motion-capture animation over height-field terrain.\n",
        "\n",
        "  Example:\n",
        "\n",
        "    # open the viewer on the default assets\n",
        "    ambler view\n",
        "    # inspect a clip\n",
        "    ambler info assets/fast_run.bvh\n",
        "\n",
        "  Commands:\n",
        "\n",
        "    view           Open the animation viewer\n",
        "    info           Display info for BVH/terrain/surface files\n",
        "    help           Display help\n",
        "\n",
        "  Run `ambler help COMMAND` for more information on specific commands.\n",
        "\n",
    ));
    exit(0);
}

fn show_view_help_and_exit() -> ! {
    print!(concat!(
        "\n",
        "  Usage: ambler view [-a <dir>]\n",
        "\n",
        "  Open the animation viewer.\n",
        "\n",
        "  Controls:\n",
        "\n",
        "    WASD/EQ        move the camera\n",
        "    left mouse     grab to look around\n",
        "    up/down        run forward / come to rest\n",
        "    left/right     veer left / veer right\n",
        "    R              put the character back at the origin\n",
        "\n",
        "  Options:\n",
        "    -a, --assets <dir>        asset directory (default: assets)\n",
        "    -v, --verbose             noisier logging\n",
        "    -h, --help                show help\n",
        "\n",
    ));
    exit(0)
}

fn show_info_help_and_exit() -> ! {
    print!(concat!(
        "\n",
        "  Usage: ambler info <input...>\n",
        "\n",
        "  Display info for the given files. The format is picked by\n",
        "  extension: .bvh for animation clips, .dem for terrain grids,\n",
        "  .tri for triangle soups.\n",
        "\n",
        "  Options:\n",
        "    -v, --verbose             noisier logging\n",
        "    -h, --help                show help\n",
        "\n",
    ));
    exit(0)
}

fn suggest_help_and_exit() -> ! {
    info!("Pass --help if you need help.");
    exit(1)
}
