//! Minimal managed PE32 images for exercising a real metadata reader.
//!
//! The output has one `.text` section holding the CLI header, an optional `ret` method
//! body, the manifest resource blobs and the metadata root with the five standard
//! streams. Only the tables the classifier and the reference extractor look at are
//! emitted; every heap and table index is two bytes wide.
#![allow(dead_code)]

const TEXT_RVA: u32 = 0x2000;
const FILE_ALIGNMENT: u32 = 0x200;
const SECTION_ALIGNMENT: u32 = 0x2000;
const CLI_HEADER_SIZE: usize = 72;
const PE_OFFSET: usize = 0x80;
const OPTIONAL_HEADER_SIZE: u16 = 224;

const TABLE_MODULE: u8 = 0x00;
const TABLE_TYPE_REF: u8 = 0x01;
const TABLE_TYPE_DEF: u8 = 0x02;
const TABLE_FIELD: u8 = 0x04;
const TABLE_METHOD_DEF: u8 = 0x06;
const TABLE_CONSTANT: u8 = 0x0B;
const TABLE_ASSEMBLY: u8 = 0x20;
const TABLE_ASSEMBLY_REF: u8 = 0x23;
const TABLE_MANIFEST_RESOURCE: u8 = 0x28;

/// public abstract sealed beforefieldinit, i.e. a C# static class.
const STATIC_CLASS: u32 = 0x0010_0181;
/// public static literal hasdefault
const CONST_FIELD: u16 = 0x8056;
/// public static hidebysig
const STATIC_METHOD: u16 = 0x0096;
const ELEMENT_TYPE_I4: u8 = 0x08;
/// tiny header (code size 1) followed by `ret`
const RET_BODY: [u8; 2] = [0x06, 0x2A];

/// Description of one managed image.
#[derive(Debug, Clone)]
pub struct ClrImage {
    assembly: String,
    version: [u16; 4],
    launch_type: Option<String>,
    release: Option<i32>,
    resources: Vec<(String, Vec<u8>)>,
    references: Vec<String>,
}

impl ClrImage {
    /// A library: assembly manifest and `<Module>` only, no entry point.
    pub fn library(assembly: &str, version: [u16; 4]) -> Self {
        Self {
            assembly: assembly.to_string(),
            version,
            launch_type: None,
            release: None,
            resources: Vec::new(),
            references: Vec::new(),
        }
    }

    /// An executable whose entry point `Main` is declared on `launch_type`, with
    /// `Terraria.Main::curRelease` set to `release`. References `mscorlib`.
    pub fn executable(assembly: &str, launch_type: &str, version: [u16; 4], release: i32) -> Self {
        Self {
            launch_type: Some(launch_type.to_string()),
            release: Some(release),
            references: vec!["mscorlib".to_string()],
            ..Self::library(assembly, version)
        }
    }

    pub fn with_resource(mut self, name: &str, data: Vec<u8>) -> Self {
        self.resources.push((name.to_string(), data));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut heaps = Heaps::new();
        let extension = if self.launch_type.is_some() { "exe" } else { "dll" };
        let module_name = heaps.string(&format!("{}.{extension}", self.assembly));

        let mut tables = Tables::default();
        tables.row(TABLE_MODULE, |r| {
            r.u16(0).u16(module_name).u16(1).u16(0).u16(0);
        });

        let object_base = if self.references.is_empty() {
            0
        } else {
            let (object, system) = (heaps.string("Object"), heaps.string("System"));
            // ResolutionScope: AssemblyRef row 1.
            tables.row(TABLE_TYPE_REF, |r| {
                r.u16((1 << 2) | 2).u16(object).u16(system);
            });
            // TypeDefOrRef: TypeRef row 1.
            (1 << 2) | 1
        };

        let module_type = heaps.string("<Module>");
        tables.row(TABLE_TYPE_DEF, |r| {
            r.u32(0).u16(module_type).u16(0).u16(0).u16(1).u16(1);
        });
        if let Some(launch) = &self.launch_type {
            let (namespace, name) = launch.rsplit_once('.').unwrap_or(("", launch.as_str()));
            let (name, namespace) = (heaps.string(name), heaps.string(namespace));
            tables.row(TABLE_TYPE_DEF, |r| {
                r.u32(STATIC_CLASS).u16(name).u16(namespace).u16(object_base).u16(1).u16(1);
            });
        }
        if let Some(release) = self.release {
            let (name, namespace) = (heaps.string("Main"), heaps.string("Terraria"));
            let methods = if self.launch_type.is_some() { 2 } else { 1 };
            tables.row(TABLE_TYPE_DEF, |r| {
                r.u32(STATIC_CLASS).u16(name).u16(namespace).u16(object_base);
                r.u16(1).u16(methods);
            });

            let field = heaps.string("curRelease");
            let signature = heaps.blob(&[0x06, ELEMENT_TYPE_I4]);
            tables.row(TABLE_FIELD, |r| {
                r.u16(CONST_FIELD).u16(field).u16(signature);
            });
            let value = heaps.blob(&release.to_le_bytes());
            // HasConstant: Field row 1.
            tables.row(TABLE_CONSTANT, |r| {
                r.u8(ELEMENT_TYPE_I4).u8(0).u16(1 << 2).u16(value);
            });
        }

        let body_offset = CLI_HEADER_SIZE;
        let il: &[u8] = if self.launch_type.is_some() { &RET_BODY } else { &[] };
        if self.launch_type.is_some() {
            let (name, signature) = (heaps.string("Main"), heaps.blob(&[0x00, 0x00, 0x01]));
            tables.row(TABLE_METHOD_DEF, |r| {
                r.u32(TEXT_RVA + body_offset as u32).u16(0).u16(STATIC_METHOD).u16(name);
                r.u16(signature).u16(1);
            });
        }

        let assembly_name = heaps.string(&self.assembly);
        let [major, minor, build, revision] = self.version;
        tables.row(TABLE_ASSEMBLY, |r| {
            r.u32(0x8004).u16(major).u16(minor).u16(build).u16(revision);
            r.u32(0).u16(0).u16(assembly_name).u16(0);
        });
        for reference in &self.references {
            let name = heaps.string(reference);
            tables.row(TABLE_ASSEMBLY_REF, |r| {
                r.u16(4).u16(0).u16(0).u16(0).u32(0).u16(0).u16(name).u16(0).u16(0);
            });
        }

        let mut resource_blob = Vec::new();
        for (name, data) in &self.resources {
            let name = heaps.string(name);
            let offset = resource_blob.len() as u32;
            // Implementation 0: embedded in this file.
            tables.row(TABLE_MANIFEST_RESOURCE, |r| {
                r.u32(offset).u32(1).u16(name).u16(0);
            });
            resource_blob.extend_from_slice(&(data.len() as u32).to_le_bytes());
            resource_blob.extend_from_slice(data);
            pad_to(&mut resource_blob, 8);
        }

        let metadata = metadata_root(&tables.stream(), &heaps);

        let resources_offset = align(body_offset + il.len(), 8);
        let metadata_offset = align(resources_offset + resource_blob.len(), 4);
        let mut text = vec![0u8; metadata_offset];
        text[body_offset..body_offset + il.len()].copy_from_slice(il);
        text[resources_offset..resources_offset + resource_blob.len()]
            .copy_from_slice(&resource_blob);
        text.extend_from_slice(&metadata);

        let entry_point = if self.launch_type.is_some() { 0x0600_0001 } else { 0 };
        let (resources_rva, resources_size) = if resource_blob.is_empty() {
            (0, 0)
        } else {
            (TEXT_RVA + resources_offset as u32, resource_blob.len() as u32)
        };
        let mut cli = Writer::default();
        cli.u32(CLI_HEADER_SIZE as u32).u16(2).u16(5);
        cli.u32(TEXT_RVA + metadata_offset as u32).u32(metadata.len() as u32);
        // ILONLY
        cli.u32(1).u32(entry_point);
        cli.u32(resources_rva).u32(resources_size);
        cli.0.resize(CLI_HEADER_SIZE, 0);
        text[..CLI_HEADER_SIZE].copy_from_slice(&cli.0);

        pe_image(&text, self.launch_type.is_none())
    }
}

fn align(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

fn pad_to(buf: &mut Vec<u8>, to: usize) {
    buf.resize(align(buf.len(), to), 0);
}

/// Little-endian byte writer.
#[derive(Default)]
struct Writer(Vec<u8>);

impl Writer {
    fn u8(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }

    fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u64(&mut self, v: u64) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.0.extend_from_slice(v);
        self
    }
}

/// `#Strings` and `#Blob` heaps with deduplicated entries.
struct Heaps {
    strings: Vec<u8>,
    blobs: Vec<u8>,
}

impl Heaps {
    fn new() -> Self {
        Self { strings: vec![0], blobs: vec![0] }
    }

    fn string(&mut self, value: &str) -> u16 {
        if value.is_empty() {
            return 0;
        }
        let needle: Vec<u8> = value.bytes().chain(std::iter::once(0)).collect();
        let mut start = 0;
        for chunk in self.strings.split_inclusive(|b| *b == 0) {
            if chunk == needle.as_slice() {
                return start as u16;
            }
            start += chunk.len();
        }
        let index = self.strings.len() as u16;
        self.strings.extend_from_slice(&needle);
        index
    }

    fn blob(&mut self, value: &[u8]) -> u16 {
        assert!(value.len() < 0x80, "only one-byte blob lengths are emitted");
        let index = self.blobs.len() as u16;
        self.blobs.push(value.len() as u8);
        self.blobs.extend_from_slice(value);
        index
    }
}

/// Table rows grouped by table id.
#[derive(Default)]
struct Tables {
    rows: std::collections::BTreeMap<u8, Vec<Vec<u8>>>,
}

impl Tables {
    fn row(&mut self, table: u8, fill: impl FnOnce(&mut Writer)) {
        let mut row = Writer::default();
        fill(&mut row);
        self.rows.entry(table).or_default().push(row.0);
    }

    /// The `#~` stream: header, row counts, then rows in table id order.
    fn stream(&self) -> Vec<u8> {
        let valid = self.rows.keys().fold(0u64, |mask, id| mask | (1 << id));
        let mut out = Writer::default();
        out.u32(0).u8(2).u8(0).u8(0).u8(1).u64(valid).u64(0x0000_1600_3301_FA00);
        for rows in self.rows.values() {
            out.u32(rows.len() as u32);
        }
        for row in self.rows.values().flatten() {
            out.bytes(row);
        }
        pad_to(&mut out.0, 4);
        out.0
    }
}

fn metadata_root(tables: &[u8], heaps: &Heaps) -> Vec<u8> {
    let mut strings = heaps.strings.clone();
    pad_to(&mut strings, 4);
    let mut blobs = heaps.blobs.clone();
    pad_to(&mut blobs, 4);
    let user_strings = vec![0u8; 4];
    let guids: Vec<u8> = (1..=16).collect();
    let streams: [(&str, &[u8]); 5] = [
        ("#~", tables),
        ("#Strings", &strings),
        ("#US", &user_strings),
        ("#GUID", &guids),
        ("#Blob", &blobs),
    ];

    let version = b"v4.0.30319\0\0";
    let header_size = 16
        + version.len()
        + 4
        + streams.iter().map(|(name, _)| 8 + align(name.len() + 1, 4)).sum::<usize>();

    let mut out = Writer::default();
    out.u32(0x424A_5342).u16(1).u16(1).u32(0).u32(version.len() as u32).bytes(version);
    out.u16(0).u16(streams.len() as u16);
    let mut offset = header_size;
    for (name, data) in &streams {
        out.u32(offset as u32).u32(data.len() as u32).bytes(name.as_bytes());
        out.0.resize(align(out.0.len() + 1, 4), 0);
        offset += data.len();
    }
    for (_, data) in &streams {
        out.bytes(data);
    }
    out.0
}

/// Wrap `text` into a single-section PE32 image with the CLI header at its start.
fn pe_image(text: &[u8], dll: bool) -> Vec<u8> {
    let raw_size = align(text.len(), FILE_ALIGNMENT as usize) as u32;
    let image_size = TEXT_RVA + align(text.len(), SECTION_ALIGNMENT as usize) as u32;

    let mut out = Writer::default();
    out.bytes(b"MZ");
    out.0.resize(0x3C, 0);
    out.u32(PE_OFFSET as u32);
    out.0.resize(PE_OFFSET, 0);

    // COFF header: i386, one section, executable image (+ dll).
    let characteristics = if dll { 0x2102 } else { 0x0102 };
    out.bytes(b"PE\0\0").u16(0x014C).u16(1).u32(0).u32(0).u32(0);
    out.u16(OPTIONAL_HEADER_SIZE).u16(characteristics);

    // PE32 optional header.
    out.u16(0x010B).u8(8).u8(0).u32(raw_size).u32(0).u32(0);
    out.u32(0).u32(TEXT_RVA).u32(0).u32(0x0040_0000);
    out.u32(SECTION_ALIGNMENT).u32(FILE_ALIGNMENT);
    out.u16(4).u16(0).u16(0).u16(0).u16(4).u16(0);
    out.u32(0).u32(image_size).u32(FILE_ALIGNMENT).u32(0);
    // console subsystem; dynamic base, nx compat, no seh, terminal server aware
    out.u16(3).u16(0x8540);
    out.u32(0x0010_0000).u32(0x1000).u32(0x0010_0000).u32(0x1000).u32(0).u32(16);
    for directory in 0..16 {
        if directory == 14 {
            out.u32(TEXT_RVA).u32(CLI_HEADER_SIZE as u32);
        } else {
            out.u32(0).u32(0);
        }
    }

    out.bytes(b".text\0\0\0").u32(text.len() as u32).u32(TEXT_RVA);
    out.u32(raw_size).u32(FILE_ALIGNMENT).u32(0).u32(0).u16(0).u16(0);
    out.u32(0x6000_0020);
    out.0.resize(FILE_ALIGNMENT as usize, 0);

    out.bytes(text);
    out.0.resize(FILE_ALIGNMENT as usize + raw_size as usize, 0);
    out.0
}
