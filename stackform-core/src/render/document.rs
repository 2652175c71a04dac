//! Rendered documents and how they reach storage.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

/// Byte encoding of a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
    /// MessagePack with named fields.
    MessagePack,
}

impl Encoding {
    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Yaml => "yml",
            Encoding::MessagePack => "msgpack",
        }
    }

    /// Returns true for human-readable encodings.
    pub fn is_text(&self) -> bool {
        !matches!(self, Encoding::MessagePack)
    }
}

/// A fully rendered template.
///
/// The renderer never touches the filesystem; callers persist a document
/// with [`write_to`](Self::write_to) or [`persist`](Self::persist).
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    encoding: Encoding,
    bytes: Vec<u8>,
}

impl Document {
    pub(crate) fn new(encoding: Encoding, bytes: Vec<u8>) -> Self {
        Self { encoding, bytes }
    }

    /// Encoding of the bytes.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the document, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The document as text, for text encodings.
    pub fn as_text(&self) -> Option<&str> {
        if self.encoding.is_text() {
            std::str::from_utf8(&self.bytes).ok()
        } else {
            None
        }
    }

    /// Write the whole document to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.bytes)?;
        writer.flush()
    }

    /// Write the document to `path`.
    ///
    /// The bytes go to a temporary file in the same directory, which is then
    /// renamed over `path`. If anything fails, `path` is left as it was.
    pub fn persist(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        self.write_to(file.as_file_mut())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;

        info!(path = %path.display(), bytes = self.bytes.len(), "persisted template");
        Ok(())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("encoding", &self.encoding)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_view_only_for_text_encodings() {
        let yaml = Document::new(Encoding::Yaml, b"Resources: {}\n".to_vec());
        assert_eq!(yaml.as_text(), Some("Resources: {}\n"));

        let packed = Document::new(Encoding::MessagePack, vec![0x80]);
        assert_eq!(packed.as_text(), None);
    }

    #[test]
    fn write_to_copies_every_byte() {
        let document = Document::new(Encoding::Json, b"{}".to_vec());
        let mut sink = Vec::new();
        document.write_to(&mut sink).unwrap();
        assert_eq!(sink, b"{}");
    }

    #[test]
    fn persist_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        std::fs::write(&path, "old").unwrap();

        Document::new(Encoding::Json, b"{\"new\":true}".to_vec())
            .persist(&path)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"new\":true}");
    }

    #[test]
    fn persist_into_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("template.json");

        let result = Document::new(Encoding::Json, b"{}".to_vec()).persist(&path);
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
