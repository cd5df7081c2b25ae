//! Constant pool decoding.
//!
//! The pool is 1-indexed; index 0 is never valid. `CONSTANT_Long` and
//! `CONSTANT_Double` entries take two slots, the second of which is stored as
//! [`Constant::Unusable`] so that later indices stay aligned with the file.

use crate::error::{ClassFileError, Result};
use crate::mutf8;
use crate::reader::ByteReader;

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELD_REF: u8 = 9;
pub const TAG_METHOD_REF: u8 = 10;
pub const TAG_INTERFACE_METHOD_REF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    /// Any other well-formed entry. Its payload is skipped, only the tag is kept.
    Other { tag: u8 },
    /// Second slot of a long or double.
    Unusable,
}

impl Constant {
    pub fn kind(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class { .. } => "Class",
            Constant::String { .. } => "String",
            Constant::Other { .. } => "Other",
            Constant::Unusable => "Unusable",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    // slot 0 of this vec is pool index 1
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Reads `constant_pool_count` and the entries that follow it.
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        let count = r.read_u16().map_err(truncated_pool)?;
        if count == 0 {
            return Err(ClassFileError::MalformedConstantPool(
                "constant_pool_count is 0".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(count as usize - 1);
        let mut index: u16 = 1;
        while index < count {
            let constant = parse_constant(r, index)?;
            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            index += 1;
            if wide {
                if index >= count {
                    return Err(ClassFileError::MalformedConstantPool(format!(
                        "wide constant at index {} overruns constant_pool_count {count}",
                        index - 1
                    )));
                }
                entries.push(Constant::Unusable);
                index += 1;
            }
        }

        Ok(Self { entries })
    }

    /// Number of usable and unusable slots, i.e. `constant_pool_count - 1`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        if index == 0 {
            return Err(ClassFileError::InvalidConstantIndex(index));
        }
        match self.entries.get(index as usize - 1) {
            None | Some(Constant::Unusable) => Err(ClassFileError::InvalidConstantIndex(index)),
            Some(c) => Ok(c),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(wrong_kind(index, "Utf8", other)),
        }
    }

    pub fn integer(&self, index: u16) -> Result<i32> {
        match self.get(index)? {
            Constant::Integer(v) => Ok(*v),
            other => Err(wrong_kind(index, "Integer", other)),
        }
    }

    pub fn float(&self, index: u16) -> Result<f32> {
        match self.get(index)? {
            Constant::Float(v) => Ok(*v),
            other => Err(wrong_kind(index, "Float", other)),
        }
    }

    pub fn long(&self, index: u16) -> Result<i64> {
        match self.get(index)? {
            Constant::Long(v) => Ok(*v),
            other => Err(wrong_kind(index, "Long", other)),
        }
    }

    pub fn double(&self, index: u16) -> Result<f64> {
        match self.get(index)? {
            Constant::Double(v) => Ok(*v),
            other => Err(wrong_kind(index, "Double", other)),
        }
    }

    /// Resolves a `CONSTANT_Class` to its internal name, e.g. `java/lang/Object`.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(wrong_kind(index, "Class", other)),
        }
    }
}

fn parse_constant(r: &mut ByteReader<'_>, index: u16) -> Result<Constant> {
    let tag = r.read_u8().map_err(truncated_pool)?;
    let constant = match tag {
        TAG_UTF8 => {
            let len = r.read_u16().map_err(truncated_pool)?;
            let bytes = r.read_bytes(len as usize).map_err(truncated_pool)?;
            let s = mutf8::decode(bytes).map_err(|e| {
                ClassFileError::MalformedConstantPool(format!("Utf8 entry {index}: {e}"))
            })?;
            Constant::Utf8(s)
        }
        TAG_INTEGER => Constant::Integer(r.read_i32().map_err(truncated_pool)?),
        TAG_FLOAT => Constant::Float(r.read_f32().map_err(truncated_pool)?),
        TAG_LONG => Constant::Long(r.read_i64().map_err(truncated_pool)?),
        TAG_DOUBLE => Constant::Double(r.read_f64().map_err(truncated_pool)?),
        TAG_CLASS => Constant::Class {
            name_index: r.read_u16().map_err(truncated_pool)?,
        },
        TAG_STRING => Constant::String {
            string_index: r.read_u16().map_err(truncated_pool)?,
        },
        TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
            r.skip(2).map_err(truncated_pool)?;
            Constant::Other { tag }
        }
        TAG_METHOD_HANDLE => {
            r.skip(3).map_err(truncated_pool)?;
            Constant::Other { tag }
        }
        TAG_FIELD_REF
        | TAG_METHOD_REF
        | TAG_INTERFACE_METHOD_REF
        | TAG_NAME_AND_TYPE
        | TAG_DYNAMIC
        | TAG_INVOKE_DYNAMIC => {
            r.skip(4).map_err(truncated_pool)?;
            Constant::Other { tag }
        }
        _ => return Err(ClassFileError::UnsupportedConstantTag { tag, index }),
    };
    Ok(constant)
}

fn truncated_pool(e: ClassFileError) -> ClassFileError {
    ClassFileError::MalformedConstantPool(e.to_string())
}

fn wrong_kind(index: u16, expected: &str, found: &Constant) -> ClassFileError {
    ClassFileError::MalformedConstantPool(format!(
        "expected {expected} at index {index}, found {}",
        found.kind()
    ))
}
