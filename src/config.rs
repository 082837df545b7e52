//! Configuration management for tscircuit-fab
//!
//! This module handles CLI argument parsing for the three commands and the
//! logging setup they share.

use crate::error::{FabError, Result};
use anyhow::{anyhow, Context};
use clap::builder::styling;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgMatches, ColorChoice, Command};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Exporter program used when neither `--exporter` nor `TSCI_BIN` is given
pub const DEFAULT_EXPORTER: &str = "tsci";

/// Staging directory of the packaging pipeline, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Archive written by the packaging pipeline, relative to the working directory
pub const DEFAULT_ZIP_NAME: &str = "output.zip";

/// Background of PCB renders
pub const DEFAULT_BACKGROUND: &str = "#1e1e1e";

/// EasyEDA component API
pub const DEFAULT_EASYEDA_API: &str = "https://easyeda.com/api/products";

fn styles() -> styling::Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Blue.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

fn base_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(clap::ArgAction::SetTrue),
        )
}

fn exporter_arg() -> Arg {
    Arg::new("exporter")
        .long("exporter")
        .env("TSCI_BIN")
        .help("Program used to export the project to circuit JSON")
        .value_parser(value_parser!(String))
        .default_value(DEFAULT_EXPORTER)
}

/// Build the packaging CLI
pub fn build_package_cli() -> Command {
    base_command(
        "tscircuit-fab",
        "Export a tscircuit project to Gerber, drill, BOM and pick-and-place files in output.zip",
    )
    .arg(
        Arg::new("entry")
            .help("tscircuit entry file")
            .value_parser(value_parser!(PathBuf))
            .required(true),
    )
    .arg(exporter_arg())
    .arg(
        Arg::new("output_dir")
            .long("output-dir")
            .help("Staging directory for the generated files")
            .value_parser(value_parser!(PathBuf))
            .default_value(DEFAULT_OUTPUT_DIR),
    )
    .arg(
        Arg::new("zip_name")
            .long("zip-name")
            .help("Path of the output ZIP archive")
            .value_parser(value_parser!(PathBuf))
            .default_value(DEFAULT_ZIP_NAME),
    )
    .arg(
        Arg::new("no_progress")
            .long("no-progress")
            .help("Disable progress indicators")
            .action(clap::ArgAction::SetTrue),
    )
}

/// Build the SVG rendering CLI
pub fn build_svg_cli() -> Command {
    base_command("tscircuit-svg", "Render a tscircuit project to an SVG image")
        .arg(
            Arg::new("entry")
                .help("tscircuit entry file")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("output")
                .help("SVG file to write")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(exporter_arg())
        .arg(
            Arg::new("schematic")
                .long("schematic")
                .help("Render the schematic instead of the PCB")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("background")
                .long("background")
                .help("Background color of the PCB render")
                .value_parser(value_parser!(String))
                .default_value(DEFAULT_BACKGROUND),
        )
        .arg(
            Arg::new("no_aspect_ratio")
                .long("no-aspect-ratio")
                .help("Use a fixed 4:3 canvas instead of the board's aspect ratio")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Build the EasyEDA import CLI
pub fn build_import_cli() -> Command {
    base_command(
        "easyeda-import",
        "Fetch an EasyEDA part and write it as a tscircuit component",
    )
    .arg(
        Arg::new("part_number")
            .help("EasyEDA / LCSC part number, e.g. C46499")
            .value_parser(value_parser!(String))
            .required(true),
    )
    .arg(
        Arg::new("output_dir")
            .help("Directory for the generated .tsx file")
            .value_parser(value_parser!(PathBuf))
            .default_value("."),
    )
    .arg(
        Arg::new("api_url")
            .long("api-url")
            .help("Base URL of the EasyEDA component API")
            .value_parser(value_parser!(String))
            .default_value(DEFAULT_EASYEDA_API),
    )
}

/// Parse `args` with `command`, mapping usage errors to [`FabError::MissingArgument`].
///
/// `--help` and `--version` print and exit with status 0 like any clap program.
fn parse_matches<I, T>(command: Command, args: I) -> Result<ArgMatches>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match command.try_get_matches_from(args) {
        Ok(matches) => Ok(matches),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            ErrorKind::MissingRequiredArgument
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                Err(FabError::MissingArgument {
                    usage: e.render().to_string().trim_end().to_string(),
                }
                .into())
            }
            _ => Err(anyhow!(e.render().to_string().trim_end().to_string())),
        },
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to determine the working directory")
}

fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow!("Argument '{}' is required", id))
}

/// Set up tracing; `RUST_LOG` takes precedence over the verbose flag
pub fn init_logging(verbose: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "info" } else { "warn" })
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Settings of the packaging pipeline
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// tscircuit entry file
    pub entry: PathBuf,

    /// Directory the temp file, staging directory and archive live in
    pub work_dir: PathBuf,

    /// Staging directory, relative paths resolve against `work_dir`
    pub output_dir: PathBuf,

    /// Output archive, relative paths resolve against `work_dir`
    pub zip_path: PathBuf,

    /// Exporter program
    pub exporter: String,

    /// Enable verbose logging
    pub verbose: bool,

    /// Disable progress bars
    pub no_progress: bool,
}

impl PackageConfig {
    /// Defaults for `entry` inside `work_dir`
    pub fn new(entry: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            work_dir: work_dir.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            zip_path: PathBuf::from(DEFAULT_ZIP_NAME),
            exporter: DEFAULT_EXPORTER.to_string(),
            verbose: false,
            no_progress: false,
        }
    }

    /// Parse process arguments and initialize logging
    pub fn from_args() -> Result<Self> {
        let config = Self::try_from_args(std::env::args_os())?;
        init_logging(config.verbose);
        if config.verbose {
            info!("Configuration: {:?}", config);
        }
        Ok(config)
    }

    pub fn try_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = parse_matches(build_package_cli(), args)?;

        Ok(Self {
            entry: required(&matches, "entry")?,
            work_dir: current_dir()?,
            output_dir: required(&matches, "output_dir")?,
            zip_path: required(&matches, "zip_name")?,
            exporter: required(&matches, "exporter")?,
            verbose: matches.get_flag("verbose"),
            no_progress: matches.get_flag("no_progress"),
        })
    }

    /// Staging directory resolved against the working directory
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.work_dir.join(&self.output_dir)
    }

    /// Archive path resolved against the working directory
    pub fn resolved_zip_path(&self) -> PathBuf {
        self.work_dir.join(&self.zip_path)
    }

    /// Reject a staging directory that would swallow the project.
    ///
    /// The staging directory is created by the run and deleted after it. It
    /// must not exist yet, and must not be or contain the working directory,
    /// the entry file or the archive.
    pub fn validate(&self) -> Result<()> {
        let base = absolute(&self.work_dir, Path::new("."));
        let staging = absolute(&base, &self.output_dir);

        let protected = [
            ("working directory", base.clone()),
            ("entry file", absolute(&base, &self.entry)),
            ("archive", absolute(&base, &self.zip_path)),
        ];
        for (what, path) in protected {
            if path.starts_with(&staging) {
                return Err(FabError::InvalidOutputDir {
                    path: self.resolved_output_dir(),
                    reason: format!("it would contain the {} {}", what, path.display()),
                }
                .into());
            }
        }

        if fs::symlink_metadata(&staging).is_ok() {
            return Err(FabError::ResourceConflict {
                path: self.resolved_output_dir(),
            }
            .into());
        }
        Ok(())
    }
}

/// `path` against `base`, canonical where it exists, with `.` and `..` folded
fn absolute(base: &Path, path: &Path) -> PathBuf {
    let joined = base.join(path);
    let joined = fs::canonicalize(&joined).unwrap_or(joined);

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// Settings of the SVG renderer
#[derive(Debug, Clone)]
pub struct SvgConfig {
    pub entry: PathBuf,
    pub output: PathBuf,
    pub work_dir: PathBuf,
    pub exporter: String,
    pub schematic: bool,
    pub background: String,
    pub match_board_aspect_ratio: bool,
    pub verbose: bool,
}

impl SvgConfig {
    pub fn new(
        entry: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            entry: entry.into(),
            output: output.into(),
            work_dir: work_dir.into(),
            exporter: DEFAULT_EXPORTER.to_string(),
            schematic: false,
            background: DEFAULT_BACKGROUND.to_string(),
            match_board_aspect_ratio: true,
            verbose: false,
        }
    }

    pub fn from_args() -> Result<Self> {
        let config = Self::try_from_args(std::env::args_os())?;
        init_logging(config.verbose);
        Ok(config)
    }

    pub fn try_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = parse_matches(build_svg_cli(), args)?;

        Ok(Self {
            entry: required(&matches, "entry")?,
            output: required(&matches, "output")?,
            work_dir: current_dir()?,
            exporter: required(&matches, "exporter")?,
            schematic: matches.get_flag("schematic"),
            background: required(&matches, "background")?,
            match_board_aspect_ratio: !matches.get_flag("no_aspect_ratio"),
            verbose: matches.get_flag("verbose"),
        })
    }
}

/// Settings of the EasyEDA importer
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub part_number: String,
    pub output_dir: PathBuf,
    pub api_url: String,
    pub verbose: bool,
}

impl ImportConfig {
    pub fn from_args() -> Result<Self> {
        let config = Self::try_from_args(std::env::args_os())?;
        init_logging(config.verbose);
        Ok(config)
    }

    pub fn try_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = parse_matches(build_import_cli(), args)?;

        Ok(Self {
            part_number: required(&matches, "part_number")?,
            output_dir: required(&matches, "output_dir")?,
            api_url: required(&matches, "api_url")?,
            verbose: matches.get_flag("verbose"),
        })
    }
}
