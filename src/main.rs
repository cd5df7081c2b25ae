use annotation_finder::archive::class_entries;
use annotation_finder::cli::{Cli, OutputFormat};
use annotation_finder::config::resolve_settings;
use annotation_finder::matcher::{Extractor, Finding, MatchedValue};
use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;
use std::io::{self, Write};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = resolve_settings(&cli)?;
    debug!(
        "target {} in {} (jar suffixes: {:?})",
        settings.target_descriptor,
        cli.archive.display(),
        settings.walk.jar_suffixes
    );

    let extractor = Extractor::new(settings.target_descriptor);
    let mut entries = class_entries(cli.archive.clone(), settings.walk);
    let mut scan = extractor.scan(entries.by_ref());

    let mut out = io::stdout().lock();
    let mut emitted = 0usize;
    let limit = cli.limit.unwrap_or(usize::MAX);

    while emitted < limit {
        let Some(finding) = scan.next() else {
            break;
        };
        match finding? {
            Finding::Value { path, matched } => {
                match write_value(&mut out, cli.format, &path, &matched) {
                    Ok(()) => emitted += 1,
                    // e.g. piped into `head`
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => break,
                    Err(e) => return Err(e.into()),
                }
            }
            Finding::Failed(diagnostic) => {
                warn!("{}: {}", diagnostic.path, diagnostic.error);
            }
        }
    }

    let scan_stats = scan.stats();
    match entries.stats() {
        Some(walk_stats) => info!(
            "{} tar entries, {} jars, {} class files: {} parsed, {} failed, {} values",
            walk_stats.tar_entries,
            walk_stats.jars,
            walk_stats.class_entries,
            scan_stats.classes_parsed,
            scan_stats.classes_failed,
            scan_stats.values
        ),
        None => info!(
            "stopped after {emitted} values ({} class files parsed, {} failed)",
            scan_stats.classes_parsed, scan_stats.classes_failed
        ),
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[derive(Debug, Serialize)]
struct JsonValue<'a> {
    entry: &'a str,
    class: &'a str,
    method: &'a str,
    descriptor: &'a str,
    element: &'a str,
    visible: bool,
    kind: &'static str,
    value: String,
}

fn write_value(
    out: &mut impl Write,
    format: OutputFormat,
    path: &str,
    matched: &MatchedValue,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", matched.value),
        OutputFormat::Json => {
            let line = serde_json::to_string(&JsonValue {
                entry: path,
                class: &matched.class_name,
                method: &matched.method_name,
                descriptor: &matched.method_descriptor,
                element: &matched.element_name,
                visible: matched.visible,
                kind: matched.value.kind(),
                value: matched.value.to_string(),
            })?;
            writeln!(out, "{line}")
        }
    }
}
