//! Structural walk of a class file down to its method table.
//!
//! Only what is needed to reach method attributes is decoded. Access flags,
//! interfaces and fields are stepped over by their declared counts and sizes.
//! Method attributes are kept as raw byte ranges borrowed from the input.

use crate::constant_pool::ConstantPool;
use crate::error::{ClassFileError, Result};
use crate::reader::ByteReader;

pub const MAGIC: u32 = 0xCAFE_BABE;
/// JDK 1.0.2
pub const MIN_MAJOR_VERSION: u16 = 45;
/// JDK 25
pub const MAX_MAJOR_VERSION: u16 = 69;
/// Minor version marking a class compiled with `--enable-preview`.
const PREVIEW_MINOR_VERSION: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub name: &'a str,
    pub info: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor<'a> {
    pub name: &'a str,
    pub descriptor: &'a str,
    pub attributes: Vec<RawAttribute<'a>>,
}

impl<'a> MethodDescriptor<'a> {
    pub fn attributes_named<'s>(
        &'s self,
        name: &'s str,
    ) -> impl Iterator<Item = &'s RawAttribute<'a>> + 's {
        self.attributes.iter().filter(move |a| a.name == name)
    }
}

/// A class file whose header and constant pool have been read.
///
/// Methods are decoded on demand through [`ClassFile::methods`].
#[derive(Debug)]
pub struct ClassFile<'a> {
    major: u16,
    minor: u16,
    pool: ConstantPool,
    this_class: u16,
    methods_count: u16,
    methods: ByteReader<'a>,
}

impl<'a> ClassFile<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);

        let magic = r.read_u32().map_err(|_| ClassFileError::NotAClassFile(leading_u32(bytes)))?;
        if magic != MAGIC {
            return Err(ClassFileError::NotAClassFile(magic));
        }

        let minor = r.read_u16()?;
        let major = r.read_u16()?;
        check_version(major, minor)?;

        let pool = ConstantPool::parse(&mut r)?;

        let _access_flags = r.read_u16()?;
        let this_class = r.read_u16()?;
        let _super_class = r.read_u16()?;

        let interfaces_count = r.read_u16()?;
        r.skip(interfaces_count as usize * 2)?;

        let fields_count = r.read_u16()?;
        for _ in 0..fields_count {
            // access_flags, name_index, descriptor_index
            r.skip(6)?;
            skip_attributes(&mut r)?;
        }

        let methods_count = r.read_u16()?;

        Ok(Self {
            major,
            minor,
            pool,
            this_class,
            methods_count,
            methods: r,
        })
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major, self.minor)
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.pool
    }

    /// Internal name of the class, e.g. `io/airlift/http/server/HttpServerConfig`.
    pub fn class_name(&self) -> Result<&str> {
        self.pool.class_name(self.this_class)
    }

    pub fn methods_count(&self) -> u16 {
        self.methods_count
    }

    /// Methods in declaration order. The iterator stops after the first error.
    pub fn methods(&self) -> Methods<'_> {
        Methods {
            pool: &self.pool,
            r: self.methods.clone(),
            remaining: self.methods_count,
        }
    }
}

pub struct Methods<'c> {
    pool: &'c ConstantPool,
    r: ByteReader<'c>,
    remaining: u16,
}

impl<'c> Methods<'c> {
    fn read_method(&mut self) -> Result<MethodDescriptor<'c>> {
        let _access_flags = self.r.read_u16()?;
        let name = self.pool.utf8(self.r.read_u16()?)?;
        let descriptor = self.pool.utf8(self.r.read_u16()?)?;

        let attributes_count = self.r.read_u16()?;
        let mut attributes = Vec::with_capacity(attributes_count as usize);
        for _ in 0..attributes_count {
            let name = self.pool.utf8(self.r.read_u16()?)?;
            let len = self.r.read_u32()?;
            let info = self.r.read_bytes(len as usize)?;
            attributes.push(RawAttribute { name, info });
        }

        Ok(MethodDescriptor {
            name,
            descriptor,
            attributes,
        })
    }
}

impl<'c> Iterator for Methods<'c> {
    type Item = Result<MethodDescriptor<'c>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.read_method() {
            Ok(m) => {
                self.remaining -= 1;
                Some(Ok(m))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

fn check_version(major: u16, minor: u16) -> Result<()> {
    let supported = match major {
        MIN_MAJOR_VERSION..=55 => true,
        // Java 12+ only allows 0 or the preview marker as minor version
        56..=MAX_MAJOR_VERSION => minor == 0 || minor == PREVIEW_MINOR_VERSION,
        _ => false,
    };
    if !supported {
        return Err(ClassFileError::UnsupportedClassVersion { major, minor });
    }
    Ok(())
}

fn skip_attributes(r: &mut ByteReader<'_>) -> Result<()> {
    let count = r.read_u16()?;
    for _ in 0..count {
        let _name_index = r.read_u16()?;
        let len = r.read_u32()?;
        r.skip(len as usize)?;
    }
    Ok(())
}

fn leading_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, b| (acc << 8) | *b as u32)
}
