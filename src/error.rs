use thiserror::Error;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

/// Failure while parsing a single class file.
///
/// These never abort a scan: the entry that produced one is reported and
/// the walk moves on to the next entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassFileError {
    #[error("not a class file (magic 0x{0:08X})")]
    NotAClassFile(u32),
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedClassVersion { major: u16, minor: u16 },
    #[error("malformed constant pool: {0}")]
    MalformedConstantPool(String),
    #[error("invalid constant pool index {0}")]
    InvalidConstantIndex(u16),
    #[error("unsupported constant pool tag {tag} at index {index}")]
    UnsupportedConstantTag { tag: u8, index: u16 },
    #[error("truncated attribute {name}: declared {declared} bytes, {detail}")]
    TruncatedAttribute {
        name: String,
        declared: usize,
        detail: String,
    },
    #[error("invalid element_value tag {0:#04x}")]
    InvalidElementValueTag(u8),
    #[error("element values nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("unexpected end of class file at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEnd { offset: usize, needed: usize },
}
