//! Class-file assembly for tests.
//!
//! Only depends on std so integration tests can pull it in with `#[path]`.
#![allow(dead_code)]

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PoolBuilder {
    bytes: Vec<u8>,
    next: u16,
    utf8s: HashMap<String, u16>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            utf8s: HashMap::new(),
        }
    }

    pub fn raw(&mut self, tag: u8, payload: &[u8]) -> u16 {
        let index = self.next;
        self.bytes.push(tag);
        self.bytes.extend_from_slice(payload);
        self.next += if tag == 5 || tag == 6 { 2 } else { 1 };
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        if let Some(index) = self.utf8s.get(s) {
            return *index;
        }
        let mut payload = (s.len() as u16).to_be_bytes().to_vec();
        payload.extend_from_slice(s.as_bytes());
        let index = self.raw(1, &payload);
        self.utf8s.insert(s.to_string(), index);
        index
    }

    pub fn integer(&mut self, v: i32) -> u16 {
        self.raw(3, &v.to_be_bytes())
    }

    pub fn float(&mut self, v: f32) -> u16 {
        self.raw(4, &v.to_be_bytes())
    }

    pub fn long(&mut self, v: i64) -> u16 {
        self.raw(5, &v.to_be_bytes())
    }

    pub fn double(&mut self, v: f64) -> u16 {
        self.raw(6, &v.to_be_bytes())
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.raw(7, &name_index.to_be_bytes())
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let string_index = self.utf8(s);
        self.raw(8, &string_index.to_be_bytes())
    }

    /// `constant_pool_count` followed by the entries.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.next.to_be_bytes().to_vec();
        out.extend_from_slice(&self.bytes);
        out
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(String),
    Enum(String, String),
    Class(String),
    Nested(Annotation),
    Array(Vec<Value>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub descriptor: String,
    pub pairs: Vec<(String, Value)>,
}

impl Annotation {
    pub fn new(descriptor: &str) -> Self {
        Self {
            descriptor: descriptor.to_string(),
            pairs: Vec::new(),
        }
    }

    pub fn pair(mut self, name: &str, value: Value) -> Self {
        self.pairs.push((name.to_string(), value));
        self
    }

    fn encode(&self, pool: &mut PoolBuilder, out: &mut Vec<u8>) {
        out.extend_from_slice(&pool.utf8(&self.descriptor).to_be_bytes());
        out.extend_from_slice(&(self.pairs.len() as u16).to_be_bytes());
        for (name, value) in &self.pairs {
            out.extend_from_slice(&pool.utf8(name).to_be_bytes());
            encode_value(value, pool, out);
        }
    }
}

fn encode_value(value: &Value, pool: &mut PoolBuilder, out: &mut Vec<u8>) {
    let (tag, index) = match value {
        Value::Byte(v) => (b'B', pool.integer(*v as i32)),
        Value::Char(v) => (b'C', pool.integer(*v as i32)),
        Value::Short(v) => (b'S', pool.integer(*v as i32)),
        Value::Int(v) => (b'I', pool.integer(*v)),
        Value::Long(v) => (b'J', pool.long(*v)),
        Value::Float(v) => (b'F', pool.float(*v)),
        Value::Double(v) => (b'D', pool.double(*v)),
        Value::Bool(v) => (b'Z', pool.integer(*v as i32)),
        Value::Str(v) => (b's', pool.utf8(v)),
        Value::Class(v) => (b'c', pool.utf8(v)),
        Value::Enum(desc, name) => {
            out.push(b'e');
            out.extend_from_slice(&pool.utf8(desc).to_be_bytes());
            out.extend_from_slice(&pool.utf8(name).to_be_bytes());
            return;
        }
        Value::Nested(annotation) => {
            out.push(b'@');
            annotation.encode(pool, out);
            return;
        }
        Value::Array(values) => {
            out.push(b'[');
            out.extend_from_slice(&(values.len() as u16).to_be_bytes());
            for v in values {
                encode_value(v, pool, out);
            }
            return;
        }
    };
    out.push(tag);
    out.extend_from_slice(&index.to_be_bytes());
}

/// Encodes a `Runtime(In)VisibleAnnotations` payload.
pub fn annotations_payload(annotations: &[Annotation], pool: &mut PoolBuilder) -> Vec<u8> {
    let mut out = (annotations.len() as u16).to_be_bytes().to_vec();
    for a in annotations {
        a.encode(pool, &mut out);
    }
    out
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub descriptor: String,
    pub visible: Vec<Annotation>,
    pub invisible: Vec<Annotation>,
    /// Attributes written verbatim, before the annotation attributes.
    pub raw_attributes: Vec<(String, Vec<u8>)>,
    /// Emit the invisible attribute before the visible one.
    pub invisible_first: bool,
}

impl Method {
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            visible: Vec::new(),
            invisible: Vec::new(),
            raw_attributes: Vec::new(),
            invisible_first: false,
        }
    }

    pub fn visible(mut self, annotation: Annotation) -> Self {
        self.visible.push(annotation);
        self
    }

    pub fn invisible(mut self, annotation: Annotation) -> Self {
        self.invisible.push(annotation);
        self
    }

    pub fn raw_attribute(mut self, name: &str, payload: Vec<u8>) -> Self {
        self.raw_attributes.push((name.to_string(), payload));
        self
    }

    pub fn invisible_first(mut self) -> Self {
        self.invisible_first = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ClassBuilder {
    pub name: String,
    pub major: u16,
    pub minor: u16,
    pub interfaces: Vec<String>,
    pub fields: Vec<(String, String, Vec<Annotation>)>,
    pub methods: Vec<Method>,
    /// Constants added to the pool before anything else.
    pub leading_longs: Vec<i64>,
    /// Written in place of the real `this_class` index.
    pub this_class: Option<u16>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            major: 52,
            minor: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            leading_longs: Vec::new(),
            this_class: None,
        }
    }

    pub fn version(mut self, major: u16, minor: u16) -> Self {
        self.major = major;
        self.minor = minor;
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str, annotations: Vec<Annotation>) -> Self {
        self.fields
            .push((name.to_string(), descriptor.to_string(), annotations));
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn this_class_index(mut self, index: u16) -> Self {
        self.this_class = Some(index);
        self
    }

    pub fn leading_long(mut self, v: i64) -> Self {
        self.leading_longs.push(v);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::new();
        for v in &self.leading_longs {
            pool.long(*v);
        }

        let mut body = Vec::new();
        // ACC_PUBLIC | ACC_SUPER
        body.extend_from_slice(&0x0021u16.to_be_bytes());
        let this_class = pool.class(&self.name);
        body.extend_from_slice(&self.this_class.unwrap_or(this_class).to_be_bytes());
        body.extend_from_slice(&pool.class("java/lang/Object").to_be_bytes());

        body.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for i in &self.interfaces {
            body.extend_from_slice(&pool.class(i).to_be_bytes());
        }

        body.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for (name, descriptor, annotations) in &self.fields {
            body.extend_from_slice(&0x0002u16.to_be_bytes());
            body.extend_from_slice(&pool.utf8(name).to_be_bytes());
            body.extend_from_slice(&pool.utf8(descriptor).to_be_bytes());
            let mut attributes = Vec::new();
            if !annotations.is_empty() {
                attributes.push((
                    "RuntimeVisibleAnnotations".to_string(),
                    annotations_payload(annotations, &mut pool),
                ));
            }
            write_attributes(&attributes, &mut pool, &mut body);
        }

        body.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for m in &self.methods {
            body.extend_from_slice(&0x0001u16.to_be_bytes());
            body.extend_from_slice(&pool.utf8(&m.name).to_be_bytes());
            body.extend_from_slice(&pool.utf8(&m.descriptor).to_be_bytes());

            let mut attributes = m.raw_attributes.clone();
            let visible = (!m.visible.is_empty()).then(|| {
                (
                    "RuntimeVisibleAnnotations".to_string(),
                    annotations_payload(&m.visible, &mut pool),
                )
            });
            let invisible = (!m.invisible.is_empty()).then(|| {
                (
                    "RuntimeInvisibleAnnotations".to_string(),
                    annotations_payload(&m.invisible, &mut pool),
                )
            });
            if m.invisible_first {
                attributes.extend(invisible);
                attributes.extend(visible);
            } else {
                attributes.extend(visible);
                attributes.extend(invisible);
            }
            write_attributes(&attributes, &mut pool, &mut body);
        }

        let source_file = pool.utf8(&format!(
            "{}.java",
            self.name.rsplit('/').next().unwrap_or(&self.name)
        ));
        let attributes = vec![("SourceFile".to_string(), source_file.to_be_bytes().to_vec())];
        write_attributes(&attributes, &mut pool, &mut body);

        let mut out = 0xCAFEBABEu32.to_be_bytes().to_vec();
        out.extend_from_slice(&self.minor.to_be_bytes());
        out.extend_from_slice(&self.major.to_be_bytes());
        out.extend_from_slice(&pool.to_bytes());
        out.extend_from_slice(&body);
        out
    }
}

fn write_attributes(attributes: &[(String, Vec<u8>)], pool: &mut PoolBuilder, out: &mut Vec<u8>) {
    out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
    for (name, payload) in attributes {
        out.extend_from_slice(&pool.utf8(name).to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
    }
}

/// `Foo.getPort()` carrying `@io.airlift.configuration.Config("http-port")`.
pub fn config_class(class: &str, method: &str, property: &str) -> Vec<u8> {
    ClassBuilder::new(class)
        .method(Method::new("<init>", "()V"))
        .method(
            Method::new(method, "()Ljava/lang/String;").visible(
                Annotation::new("Lio/airlift/configuration/Config;")
                    .pair("value", Value::str(property)),
            ),
        )
        .build()
}
