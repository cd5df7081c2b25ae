use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "annotation-finder")]
#[command(
    about = "Print the values of a method annotation found in the class files of a tar.gz of jars"
)]
pub struct Cli {
    /// Archive to scan: .tar.gz, .tgz, .tar, .jar, .zip or a single .class
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Annotation type, as a descriptor or a dotted name [default: io.airlift.configuration.Config]
    #[arg(short = 'a', long, value_name = "TYPE")]
    pub annotation: Option<String>,

    /// JSON config file [default: <config dir>/annotation-finder/config.json]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Stop after this many values
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
