use std::path::PathBuf;

use clap::Parser;

mod analysis;
mod app;
mod audio;
mod config;
mod library;
mod logging;
mod runtime;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "bandstand",
    version,
    about = "A terminal music player with a live spectrum visualizer",
    long_about = "Plays the given files (directories are searched for audio files) and shows \
a live spectrum of what is playing. Paste a path into the terminal to queue more."
)]
struct Cli {
    /// Audio files or directories, played in the order given
    paths: Vec<PathBuf>,

    /// Run without opening an audio device
    #[arg(long)]
    no_audio: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long, conflicts_with_all = ["paths", "no_audio"])]
    dump_config: bool,
}

fn dump_config() -> anyhow::Result<()> {
    let settings = match config::Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bandstand: failed to load config, showing defaults: {e}");
            config::Settings::default()
        }
    };
    print!("{}", settings.to_toml()?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        return dump_config();
    }
    runtime::run(runtime::Options {
        paths: cli.paths,
        no_audio: cli.no_audio,
    })
}
