use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::ClassFile;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const DEFAULT_MANIFEST: &str = concat!(
    "Manifest-Version: 1.0\r\n",
    "Created-By: classfile-materializer\r\n",
    "\r\n"
);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum JarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("class parse error: {0}")]
    ClassParse(#[from] binrw::Error),
    #[error("entry not found: {0}")]
    MissingEntry(String),
}

pub type JarResult<T> = Result<T, JarError>;

// ---------------------------------------------------------------------------
// JarFile
// ---------------------------------------------------------------------------

/// In-memory representation of a JAR (ZIP) archive.
///
/// Entries are stored as a `BTreeMap<String, Vec<u8>>` mapping entry paths to
/// raw bytes, so writing is deterministic in entry order.
#[derive(Clone, Debug, Default)]
pub struct JarFile {
    entries: BTreeMap<String, Vec<u8>>,
}

impl JarFile {
    /// Create an empty JAR.
    pub fn new() -> Self {
        JarFile {
            entries: BTreeMap::new(),
        }
    }

    /// Create a JAR holding only a minimal `META-INF/MANIFEST.MF`.
    pub fn with_default_manifest() -> Self {
        let mut jar = JarFile::new();
        jar.set_entry(MANIFEST_PATH, DEFAULT_MANIFEST.as_bytes().to_vec());
        jar
    }

    // -- Reading --

    /// Read a JAR from any reader.
    pub fn read<R: Read + Seek>(reader: R) -> JarResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut entries = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.insert(name, data);
        }

        Ok(JarFile { entries })
    }

    /// Read a JAR from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> JarResult<Self> {
        Self::read(Cursor::new(bytes))
    }

    /// Read a JAR from a file path.
    pub fn open(path: impl AsRef<Path>) -> JarResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::read(std::io::BufReader::new(file))
    }

    // -- Writing --

    /// Write the JAR to any writer using Deflated compression.
    pub fn write<W: Write + Seek>(&self, writer: W) -> JarResult<()> {
        let mut zip_writer = zip::ZipWriter::new(writer);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.entries {
            zip_writer.start_file(name.as_str(), options)?;
            zip_writer.write_all(data)?;
        }

        zip_writer.finish()?;
        Ok(())
    }

    /// Serialize the JAR to a byte vector.
    pub fn to_bytes(&self) -> JarResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.write(&mut buf)?;
        Ok(buf.into_inner())
    }

    /// Write the JAR to a file path.
    pub fn save(&self, path: impl AsRef<Path>) -> JarResult<()> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file))
    }

    // -- Entry access --

    /// Iterate over all entry paths (sorted).
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Iterate over `.class` entry paths only.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.entry_names().filter(|n| n.ends_with(".class"))
    }

    pub fn get_entry(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(|v| v.as_slice())
    }

    /// Insert or replace an entry.
    pub fn set_entry(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(path.into(), data);
    }

    pub fn contains_entry(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -- ClassFile integration --

    /// Parse a `.class` entry into a `ClassFile`.
    pub fn parse_class(&self, path: &str) -> JarResult<ClassFile> {
        let data = self
            .get_entry(path)
            .ok_or_else(|| JarError::MissingEntry(path.to_string()))?;
        Ok(ClassFile::from_bytes(data)?)
    }

    /// Parse all `.class` entries. Returns a vec of `(path, result)` pairs.
    pub fn parse_all_classes(&self) -> Vec<(String, JarResult<ClassFile>)> {
        self.class_names()
            .map(|name| (name.to_string(), self.parse_class(name)))
            .collect()
    }

    /// Store raw class bytes under the entry path for `internal_name`.
    pub fn set_class_bytes(&mut self, internal_name: &str, bytes: Vec<u8>) {
        self.set_entry(format!("{internal_name}.class"), bytes);
    }
}
