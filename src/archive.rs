//! Walking nested archives down to class-file entries.
//!
//! A `.tar.gz` is read as a stream: each tar entry ending in a jar suffix is
//! buffered in memory and opened as a zip, and every `.class` inside it is
//! handed to the sink. Framing errors in any layer end the walk.

use anyhow::{Context, Result, bail};
use flate2::read::MultiGzDecoder;
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::JoinHandle;
use zip::ZipArchive;

use crate::matcher::ClassEntry;

pub const CLASS_SUFFIX: &str = ".class";

/// Upper bound on buffer preallocation from a size declared in an archive
/// header. Larger entries still read fine, they just grow the buffer.
const PREALLOC_LIMIT: u64 = 16 << 20;

fn read_entry(mut reader: impl Read, declared_size: u64) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(declared_size.min(PREALLOC_LIMIT) as usize);
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Tar entries with one of these suffixes are opened as zip archives.
    pub jar_suffixes: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            jar_suffixes: vec![".jar".to_string()],
        }
    }
}

impl WalkOptions {
    fn is_jar(&self, name: &str) -> bool {
        self.jar_suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub tar_entries: usize,
    pub jars: usize,
    pub class_entries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    TarGz,
    Tar,
    Jar,
    Class,
}

impl InputKind {
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(InputKind::TarGz)
        } else if name.ends_with(".tar") {
            Ok(InputKind::Tar)
        } else if name.ends_with(".jar") || name.ends_with(".zip") {
            Ok(InputKind::Jar)
        } else if name.ends_with(CLASS_SUFFIX) {
            Ok(InputKind::Class)
        } else {
            bail!(
                "Unrecognized input type (expected .tar.gz, .tgz, .tar, .jar, .zip or .class): {}",
                path.display()
            )
        }
    }
}

/// Walks `path`, calling `sink` for each class file in encounter order.
/// The sink may return `Break` to stop early.
pub fn walk(
    path: &Path,
    options: &WalkOptions,
    sink: &mut dyn FnMut(ClassEntry) -> ControlFlow<()>,
) -> Result<WalkStats> {
    let kind = InputKind::detect(path)?;
    let file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
    let mut stats = WalkStats::default();

    let flow = match kind {
        InputKind::TarGz => {
            let reader = MultiGzDecoder::new(BufReader::new(file));
            walk_tar(reader, options, sink, &mut stats)?
        }
        InputKind::Tar => walk_tar(BufReader::new(file), options, sink, &mut stats)?,
        InputKind::Jar => {
            // SAFETY: The file is opened read-only and outlives the mapping.
            let mmap = unsafe { Mmap::map(&file) }
                .with_context(|| format!("Failed to mmap jar: {}", path.display()))?;
            let name = path.to_string_lossy();
            walk_jar(&name, Cursor::new(&mmap[..]), sink, &mut stats)?
        }
        InputKind::Class => {
            let mut bytes = Vec::new();
            BufReader::new(file)
                .read_to_end(&mut bytes)
                .with_context(|| format!("Failed to read class file: {}", path.display()))?;
            stats.class_entries += 1;
            sink(ClassEntry {
                path: path.to_string_lossy().to_string(),
                bytes,
            })
        }
    };

    if flow.is_break() {
        debug!("walk stopped by consumer after {} class files", stats.class_entries);
    }
    Ok(stats)
}

fn walk_tar<R: Read>(
    reader: R,
    options: &WalkOptions,
    sink: &mut dyn FnMut(ClassEntry) -> ControlFlow<()>,
    stats: &mut WalkStats,
) -> Result<ControlFlow<()>> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries().context("Failed to read tar stream")? {
        let mut entry = entry.context("Failed to read tar entry header")?;
        stats.tar_entries += 1;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry
            .path()
            .context("Invalid tar entry path")?
            .to_string_lossy()
            .to_string();

        if options.is_jar(&name) {
            let size = entry.size();
            let buf = read_entry(&mut entry, size)
                .with_context(|| format!("Failed to read tar entry: {name}"))?;
            if walk_jar(&name, Cursor::new(buf), sink, stats)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        } else if name.ends_with(CLASS_SUFFIX) {
            let size = entry.size();
            let bytes = read_entry(&mut entry, size)
                .with_context(|| format!("Failed to read tar entry: {name}"))?;
            stats.class_entries += 1;
            if sink(ClassEntry { path: name, bytes }).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
    }
    Ok(ControlFlow::Continue(()))
}

fn walk_jar<R: Read + Seek>(
    jar_name: &str,
    reader: R,
    sink: &mut dyn FnMut(ClassEntry) -> ControlFlow<()>,
    stats: &mut WalkStats,
) -> Result<ControlFlow<()>> {
    let mut archive = ZipArchive::new(reader)
        .with_context(|| format!("Failed to read zip structure: {jar_name}"))?;
    stats.jars += 1;
    debug!("opened {jar_name} ({} entries)", archive.len());

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry #{i} in {jar_name}"))?;
        if entry.is_dir() || !entry.name().ends_with(CLASS_SUFFIX) {
            continue;
        }

        let path = format!("{jar_name}!/{}", entry.name());
        let size = entry.size();
        let bytes =
            read_entry(&mut entry, size).with_context(|| format!("Failed to inflate {path}"))?;
        stats.class_entries += 1;
        if sink(ClassEntry { path, bytes }).is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

enum Message {
    Entry(ClassEntry),
    Done(Result<WalkStats>),
}

/// Pull-style view of [`walk`]: the walk runs on its own thread and hands
/// entries over a bounded channel. Dropping the iterator stops the walk at
/// the next entry.
pub struct ClassEntries {
    rx: Receiver<Message>,
    handle: Option<JoinHandle<()>>,
    stats: Option<WalkStats>,
    finished: bool,
}

const CHANNEL_CAPACITY: usize = 16;

pub fn class_entries(path: PathBuf, options: WalkOptions) -> ClassEntries {
    let (tx, rx) = mpsc::sync_channel::<Message>(CHANNEL_CAPACITY);
    let handle = std::thread::spawn(move || run_walker(&path, &options, tx));
    ClassEntries {
        rx,
        handle: Some(handle),
        stats: None,
        finished: false,
    }
}

fn run_walker(path: &Path, options: &WalkOptions, tx: SyncSender<Message>) {
    let result = walk(path, options, &mut |entry| {
        if tx.send(Message::Entry(entry)).is_ok() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    });
    let _ = tx.send(Message::Done(result));
}

impl ClassEntries {
    /// Walk statistics, available once the iterator has been exhausted.
    pub fn stats(&self) -> Option<WalkStats> {
        self.stats
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Iterator for ClassEntries {
    type Item = Result<ClassEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(Message::Entry(entry)) => Some(Ok(entry)),
            Ok(Message::Done(Ok(stats))) => {
                self.finished = true;
                self.stats = Some(stats);
                self.join();
                None
            }
            Ok(Message::Done(Err(e))) => {
                self.finished = true;
                self.join();
                Some(Err(e))
            }
            Err(_) => {
                self.finished = true;
                self.join();
                Some(Err(anyhow::anyhow!("Archive walker stopped unexpectedly")))
            }
        }
    }
}
