mod app;
mod data;
mod layout;
mod util;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use app::LoadRequest;
use data::OrbitSources;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Where PNG screenshots taken with `s` are written.
    #[arg(long, default_value = ".", global = true)]
    screenshot_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Contributors orbiting a central repository, linked to the repos they work on.
    Orbit {
        /// Directory holding the default CSV files.
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
        #[arg(long)]
        contributors: Option<PathBuf>,
        #[arg(long)]
        repositories: Option<PathBuf>,
        #[arg(long)]
        links: Option<PathBuf>,
        /// Contributors drawn as fillers outside the rings; optional.
        #[arg(long)]
        remaining: Option<PathBuf>,
        /// `owner/name` of the repository placed at the centre.
        #[arg(long)]
        central_repo: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Commits of one repository packed into monthly circles.
    Timeline {
        #[arg(long)]
        commits: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Command {
    fn into_request(self) -> LoadRequest {
        match self {
            Self::Orbit {
                data_dir,
                contributors,
                repositories,
                links,
                remaining,
                central_repo,
                seed,
            } => {
                let defaults = OrbitSources::in_dir(&data_dir);
                LoadRequest::Orbit {
                    sources: OrbitSources {
                        contributors: contributors.unwrap_or(defaults.contributors),
                        repositories: repositories.unwrap_or(defaults.repositories),
                        links: links.unwrap_or(defaults.links),
                        remaining: remaining.unwrap_or(defaults.remaining),
                    },
                    central_repo,
                    seed,
                }
            }
            Self::Timeline { commits } => LoadRequest::Timeline { commits },
        }
    }
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    let _ = TermLogger::init(
        args.log_level.into(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    let request = args.command.into_request();
    let screenshot_dir = args.screenshot_dir;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "repo-orbits",
        options,
        Box::new(move |cc| Ok(Box::new(app::RepoOrbitsApp::new(cc, request, screenshot_dir)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_paths_default_into_data_dir() {
        let args = Args::parse_from([
            "repo-orbits",
            "orbit",
            "--data-dir",
            "data",
            "--links",
            "other/links.csv",
            "--seed",
            "7",
        ]);
        let LoadRequest::Orbit { sources, seed, central_repo } = args.command.into_request() else {
            panic!("expected an orbit request");
        };
        assert_eq!(sources.contributors, PathBuf::from("data/top_contributors.csv"));
        assert_eq!(sources.links, PathBuf::from("other/links.csv"));
        assert_eq!(sources.remaining, PathBuf::from("data/remaining_contributors.csv"));
        assert_eq!(seed, Some(7));
        assert!(central_repo.is_none());
    }

    #[test]
    fn log_level_is_global() {
        let args = Args::parse_from(["repo-orbits", "timeline", "--commits", "c.csv", "--log-level", "debug"]);
        assert!(matches!(args.log_level, LogLevel::Debug));
        assert!(matches!(args.command, Command::Timeline { .. }));
        assert_eq!(args.screenshot_dir, PathBuf::from("."));
    }

    #[test]
    fn screenshot_dir_follows_the_subcommand() {
        let args = Args::parse_from(["repo-orbits", "orbit", "--screenshot-dir", "shots"]);
        assert_eq!(args.screenshot_dir, PathBuf::from("shots"));
    }
}
