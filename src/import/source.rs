use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::errors::PipelineError;

/// Upper bound for the read buffer regardless of the configured chunk size.
const MAX_READ_BUFFER: usize = 8 * 1024 * 1024;

enum SourceKind {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
}

/// A finite input for an import run: a local file, an in-memory buffer or an
/// arbitrary reader with an optional declared size.
pub struct ImportSource {
    kind: SourceKind,
    name: Option<String>,
    content_type: Option<String>,
    declared_size: Option<u64>,
}

impl fmt::Debug for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SourceKind::Path(p) => format!("path({})", p.display()),
            SourceKind::Bytes(b) => format!("bytes({})", b.len()),
            SourceKind::Reader(_) => "reader".to_string(),
        };
        f.debug_struct("ImportSource")
            .field("kind", &kind)
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("declared_size", &self.declared_size)
            .finish()
    }
}

impl ImportSource {
    pub fn path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self { kind: SourceKind::Path(path), name, content_type: None, declared_size: None }
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self { kind: SourceKind::Bytes(data), name: None, content_type: None, declared_size: Some(size) }
    }

    pub fn reader(reader: impl Read + Send + 'static, declared_size: Option<u64>) -> Self {
        Self { kind: SourceKind::Reader(Box::new(reader)), name: None, content_type: None, declared_size }
    }

    /// File name used for format detection, e.g. `upload.csv`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub(crate) fn open(self, chunk_size: usize) -> Result<OpenedSource, PipelineError> {
        let capacity = chunk_size.clamp(8 * 1024, MAX_READ_BUFFER);
        let (inner, size): (Box<dyn Read + Send>, Option<u64>) = match self.kind {
            SourceKind::Path(p) => {
                let file = File::open(&p)?;
                let len = file.metadata()?.len();
                (Box::new(file), Some(self.declared_size.unwrap_or(len)))
            }
            SourceKind::Bytes(b) => (Box::new(Cursor::new(b)), self.declared_size),
            SourceKind::Reader(r) => (r, self.declared_size),
        };
        Ok(OpenedSource {
            reader: BufReader::with_capacity(capacity, inner),
            size,
            name: self.name,
            content_type: self.content_type,
        })
    }
}

impl From<Vec<u8>> for ImportSource {
    fn from(data: Vec<u8>) -> Self {
        Self::bytes(data)
    }
}

impl From<&Path> for ImportSource {
    fn from(path: &Path) -> Self {
        Self::path(path)
    }
}

impl From<PathBuf> for ImportSource {
    fn from(path: PathBuf) -> Self {
        Self::path(path)
    }
}

pub(crate) struct OpenedSource {
    pub reader: BufReader<Box<dyn Read + Send>>,
    pub size: Option<u64>,
    pub name: Option<String>,
    pub content_type: Option<String>,
}

/// Read the whole input, failing once more than `limit` bytes arrive.
pub(crate) fn read_bounded<R: Read>(reader: R, limit: u64) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buf).map_err(PipelineError::Io)?;
    let size = buf.len() as u64;
    if size > limit {
        return Err(PipelineError::SizeLimitExceeded { size, limit });
    }
    Ok(buf)
}

/// Strip a UTF-8 byte order mark if present.
pub(crate) fn skip_bom<R: io::BufRead>(reader: &mut R) -> io::Result<()> {
    let buf = reader.fill_buf()?;
    if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        reader.consume(3);
    }
    Ok(())
}
