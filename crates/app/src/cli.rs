use anyhow::{Result, bail};

use crate::{extract, map};

const USAGE: &str = "Usage: memory-map [serve|extract|help] [args...]\n\n\
Commands:\n  \
serve    Start the map server (default when no command is given)\n  \
extract  Print GPS coordinates for media files\n  \
help     Show this message";

pub fn handle_commands(args: &[String]) -> Result<bool> {
    match args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            map::run_from_args(args)?;
            Ok(true)
        }
        Some("extract") => {
            extract::run(args)?;
            Ok(true)
        }
        Some("help") | Some("--help") | Some("-h") => {
            println!("{USAGE}");
            Ok(true)
        }
        Some(other) => {
            bail!("Unrecognised command {other:?}\n\n{USAGE}");
        }
        None => Ok(false),
    }
}
