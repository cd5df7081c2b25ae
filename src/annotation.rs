//! Decoding of `RuntimeVisibleAnnotations` and `RuntimeInvisibleAnnotations`.
//!
//! Every element_value kind is walked so the cursor stays aligned, but only
//! constants, strings, enum constants and class literals are kept. Nested
//! annotations and arrays come back as [`AnnotationValue::Unsupported`].

use std::fmt;

use crate::class_file::{MethodDescriptor, RawAttribute};
use crate::constant_pool::ConstantPool;
use crate::error::{ClassFileError, Result};
use crate::reader::ByteReader;

pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    EnumConstant {
        type_descriptor: String,
        const_name: String,
    },
    ClassLiteral(String),
    /// A nested annotation (`@`) or an array (`[`).
    Unsupported { tag: u8 },
}

impl AnnotationValue {
    /// Whether the value has a textual form worth printing.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            AnnotationValue::ClassLiteral(_) | AnnotationValue::Unsupported { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnnotationValue::Byte(_) => "byte",
            AnnotationValue::Char(_) => "char",
            AnnotationValue::Short(_) => "short",
            AnnotationValue::Integer(_) => "int",
            AnnotationValue::Long(_) => "long",
            AnnotationValue::Float(_) => "float",
            AnnotationValue::Double(_) => "double",
            AnnotationValue::Boolean(_) => "boolean",
            AnnotationValue::String(_) => "string",
            AnnotationValue::EnumConstant { .. } => "enum",
            AnnotationValue::ClassLiteral(_) => "class",
            AnnotationValue::Unsupported { .. } => "unsupported",
        }
    }
}

/// Renders the value the way `String.valueOf` would on the JVM.
/// Enum constants print their constant name, strings print unquoted.
impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Byte(v) => write!(f, "{v}"),
            AnnotationValue::Char(v) => write!(f, "{v}"),
            AnnotationValue::Short(v) => write!(f, "{v}"),
            AnnotationValue::Integer(v) => write!(f, "{v}"),
            AnnotationValue::Long(v) => write!(f, "{v}"),
            AnnotationValue::Float(v) => {
                f.write_str(&java_floating_text(*v as f64, format!("{v}"), format!("{v:e}")))
            }
            AnnotationValue::Double(v) => {
                f.write_str(&java_floating_text(*v, format!("{v}"), format!("{v:e}")))
            }
            AnnotationValue::Boolean(v) => write!(f, "{v}"),
            AnnotationValue::String(v) => f.write_str(v),
            AnnotationValue::EnumConstant { const_name, .. } => f.write_str(const_name),
            AnnotationValue::ClassLiteral(descriptor) => f.write_str(descriptor),
            AnnotationValue::Unsupported { tag } => write!(f, "<unsupported {}>", *tag as char),
        }
    }
}

// `plain` and `sci` are the shortest round-trip forms of the original width,
// so an f32 does not pick up f64 noise digits.
fn java_floating_text(v: f64, plain: String, sci: String) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        if mantissa.contains('.') {
            format!("{mantissa}E{exponent}")
        } else {
            format!("{mantissa}.0E{exponent}")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementValuePair {
    pub name: String,
    pub value: AnnotationValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAnnotation {
    pub type_descriptor: String,
    /// `true` when read from `RuntimeVisibleAnnotations`.
    pub visible: bool,
    pub element_value_pairs: Vec<ElementValuePair>,
}

/// All annotations on a method: visible ones first, then invisible ones,
/// each in the order they appear in their attribute.
pub fn decode_method_annotations(
    method: &MethodDescriptor<'_>,
    pool: &ConstantPool,
) -> Result<Vec<DecodedAnnotation>> {
    let mut out = Vec::new();
    for (name, visible) in [
        (RUNTIME_VISIBLE_ANNOTATIONS, true),
        (RUNTIME_INVISIBLE_ANNOTATIONS, false),
    ] {
        for attribute in method.attributes_named(name) {
            out.extend(decode_annotations_attribute(attribute, pool, visible)?);
        }
    }
    Ok(out)
}

pub fn decode_annotations_attribute(
    attribute: &RawAttribute<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<Vec<DecodedAnnotation>> {
    let mut r = ByteReader::new(attribute.info);
    let truncated = |detail: String| ClassFileError::TruncatedAttribute {
        name: attribute.name.to_string(),
        declared: attribute.info.len(),
        detail,
    };

    let decoded = read_annotations(&mut r, pool, visible).map_err(|e| match e {
        ClassFileError::UnexpectedEnd { offset, needed } => {
            truncated(format!("content needs {needed} more bytes at offset {offset}"))
        }
        other => other,
    })?;

    if !r.is_empty() {
        return Err(truncated(format!(
            "content ends after {} bytes",
            r.position()
        )));
    }
    Ok(decoded)
}

fn read_annotations(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<Vec<DecodedAnnotation>> {
    let num_annotations = r.read_u16()?;
    (0..num_annotations)
        .map(|_| read_annotation(r, pool, visible, 0))
        .collect()
}

fn read_annotation(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    visible: bool,
    depth: usize,
) -> Result<DecodedAnnotation> {
    let type_descriptor = pool.utf8(r.read_u16()?)?.to_string();
    let num_pairs = r.read_u16()?;
    let mut element_value_pairs = Vec::with_capacity(num_pairs as usize);
    for _ in 0..num_pairs {
        let name = pool.utf8(r.read_u16()?)?.to_string();
        let value = read_element_value(r, pool, depth)?;
        element_value_pairs.push(ElementValuePair { name, value });
    }
    Ok(DecodedAnnotation {
        type_descriptor,
        visible,
        element_value_pairs,
    })
}

fn read_element_value(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<AnnotationValue> {
    if depth > MAX_NESTING {
        return Err(ClassFileError::NestingTooDeep(MAX_NESTING));
    }

    let tag = r.read_u8()?;
    let value = match tag {
        b'B' => AnnotationValue::Byte(pool.integer(r.read_u16()?)? as i8),
        b'C' => {
            let unit = pool.integer(r.read_u16()?)? as u16;
            AnnotationValue::Char(
                char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
            )
        }
        b'S' => AnnotationValue::Short(pool.integer(r.read_u16()?)? as i16),
        b'I' => AnnotationValue::Integer(pool.integer(r.read_u16()?)?),
        b'J' => AnnotationValue::Long(pool.long(r.read_u16()?)?),
        b'F' => AnnotationValue::Float(pool.float(r.read_u16()?)?),
        b'D' => AnnotationValue::Double(pool.double(r.read_u16()?)?),
        b'Z' => AnnotationValue::Boolean(pool.integer(r.read_u16()?)? != 0),
        b's' => AnnotationValue::String(pool.utf8(r.read_u16()?)?.to_string()),
        b'e' => {
            let type_descriptor = pool.utf8(r.read_u16()?)?.to_string();
            let const_name = pool.utf8(r.read_u16()?)?.to_string();
            AnnotationValue::EnumConstant {
                type_descriptor,
                const_name,
            }
        }
        b'c' => AnnotationValue::ClassLiteral(pool.utf8(r.read_u16()?)?.to_string()),
        b'@' => {
            read_annotation(r, pool, true, depth + 1)?;
            AnnotationValue::Unsupported { tag }
        }
        b'[' => {
            let num_values = r.read_u16()?;
            for _ in 0..num_values {
                read_element_value(r, pool, depth + 1)?;
            }
            AnnotationValue::Unsupported { tag }
        }
        _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
    };
    Ok(value)
}
