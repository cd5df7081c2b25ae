//! Matching decoded annotations against a target descriptor, and the lazy
//! scan that turns a stream of class entries into printable values.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::annotation::{
    AnnotationValue, DecodedAnnotation, ElementValuePair, decode_method_annotations,
};
use crate::class_file::ClassFile;
use crate::error::{ClassFileError, Result};

/// One class file pulled out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// e.g. `lib/http-server.jar!/io/airlift/http/server/HttpServerConfig.class`
    pub path: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedValue {
    pub class_name: String,
    pub method_name: String,
    pub method_descriptor: String,
    pub element_name: String,
    pub visible: bool,
    pub value: AnnotationValue,
}

/// Element-value pairs of every annotation whose type is exactly `target`,
/// in annotation order and then pair order.
pub fn matching_pairs<'a>(
    annotations: &'a [DecodedAnnotation],
    target: &'a str,
) -> impl Iterator<Item = (&'a DecodedAnnotation, &'a ElementValuePair)> + 'a {
    annotations
        .iter()
        .filter(move |a| a.type_descriptor == target)
        .flat_map(|a| a.element_value_pairs.iter().map(move |p| (a, p)))
}

#[derive(Debug, Clone)]
pub struct Extractor {
    target: String,
}

impl Extractor {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Values of the target annotation across all methods of one class file,
    /// in method declaration order. Class literals and unsupported values
    /// are left out. A class that fails anywhere yields no values at all.
    ///
    /// `this_class` is only resolved once a value matches; if it does not
    /// resolve the values keep an empty class name.
    pub fn extract(&self, bytes: &[u8]) -> Result<Vec<MatchedValue>> {
        let class = ClassFile::parse(bytes)?;
        let mut class_name: Option<String> = None;

        let mut out = Vec::new();
        for method in class.methods() {
            let method = method?;
            let annotations = decode_method_annotations(&method, class.constant_pool())?;
            for (annotation, pair) in matching_pairs(&annotations, &self.target) {
                if !pair.value.is_scalar() {
                    continue;
                }
                let class_name = class_name.get_or_insert_with(|| match class.class_name() {
                    Ok(name) => name.to_string(),
                    Err(e) => {
                        debug!("unresolved this_class: {e}");
                        String::new()
                    }
                });
                out.push(MatchedValue {
                    class_name: class_name.clone(),
                    method_name: method.name.to_string(),
                    method_descriptor: method.descriptor.to_string(),
                    element_name: pair.name.clone(),
                    visible: annotation.visible,
                    value: pair.value.clone(),
                });
            }
        }
        Ok(out)
    }

    /// Lazily extracts from every entry in turn. Class files that fail to
    /// parse show up as [`Finding::Failed`] and the scan carries on; an error
    /// from `entries` itself is yielded once and ends the scan.
    pub fn scan<I>(&self, entries: I) -> Scan<'_, I>
    where
        I: Iterator<Item = anyhow::Result<ClassEntry>>,
    {
        Scan {
            extractor: self,
            entries,
            pending: VecDeque::new(),
            stats: ScanStats::default(),
            done: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub path: String,
    pub error: ClassFileError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Value { path: String, matched: MatchedValue },
    Failed(Diagnostic),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub classes_parsed: usize,
    pub classes_failed: usize,
    pub values: usize,
}

pub struct Scan<'e, I> {
    extractor: &'e Extractor,
    entries: I,
    pending: VecDeque<Finding>,
    stats: ScanStats,
    done: bool,
}

impl<I> Scan<'_, I> {
    pub fn stats(&self) -> ScanStats {
        self.stats
    }
}

impl<I> Iterator for Scan<'_, I>
where
    I: Iterator<Item = anyhow::Result<ClassEntry>>,
{
    type Item = anyhow::Result<Finding>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(finding) = self.pending.pop_front() {
                return Some(Ok(finding));
            }
            if self.done {
                return None;
            }

            let entry = match self.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };

            trace!("parsing {} ({} bytes)", entry.path, entry.bytes.len());
            match self.extractor.extract(&entry.bytes) {
                Ok(values) => {
                    self.stats.classes_parsed += 1;
                    self.stats.values += values.len();
                    self.pending
                        .extend(values.into_iter().map(|matched| Finding::Value {
                            path: entry.path.clone(),
                            matched,
                        }));
                }
                Err(error) => {
                    self.stats.classes_failed += 1;
                    self.pending.push_back(Finding::Failed(Diagnostic {
                        path: entry.path,
                        error,
                    }));
                }
            }
        }
    }
}
