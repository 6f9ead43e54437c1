use crate::domain::model::ProductRecord;
use crate::domain::ports::RecordSink;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io::{self, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

const ARRAY_CLOSE: &[u8] = b"\n]\n";
const RECORD_SEPARATOR: &[u8] = b",\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A single JSON array holding every record.
    #[default]
    Array,
    /// Records written back to back, each followed by `,\n`.
    Concatenated,
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "array" => Ok(OutputFormat::Array),
            "concatenated" => Ok(OutputFormat::Concatenated),
            other => Err(EtlError::InvalidConfigValueError {
                field: "scrape.format".to_string(),
                value: other.to_string(),
                reason: "Valid values: array, concatenated".to_string(),
            }),
        }
    }
}

/// 4-space indent like `PrettyFormatter`, but `"key":value` with no space
/// after the colon, matching files written by earlier runs.
struct RecordFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl Formatter for RecordFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b":")
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

/// Pretty JSON with 4-space indent and sorted keys. Non-ASCII text is written as-is.
pub fn to_pretty_json(record: &ProductRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = RecordFormatter {
        inner: PrettyFormatter::with_indent(b"    "),
    };
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record.serialize(&mut serializer)?;
    Ok(buf)
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Keeps the output file a valid JSON array after every append.
///
/// The closing bracket is rewritten on each append instead of holding records
/// in memory.
pub struct JsonArraySink {
    path: PathBuf,
    file: File,
    written: usize,
}

impl JsonArraySink {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        file.write_all(b"[]\n").await?;
        file.flush().await?;

        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonArraySink {
    async fn append(&mut self, record: &ProductRecord) -> Result<()> {
        let body = to_pretty_json(record)?;
        let mut chunk = Vec::with_capacity(body.len() + 8);

        if self.written == 0 {
            // 覆蓋掉初始的 "[]\n"
            self.file.seek(SeekFrom::Start(0)).await?;
            chunk.extend_from_slice(b"[\n");
        } else {
            self.file
                .seek(SeekFrom::End(-(ARRAY_CLOSE.len() as i64)))
                .await?;
            chunk.extend_from_slice(RECORD_SEPARATOR);
        }
        chunk.extend_from_slice(&body);
        chunk.extend_from_slice(ARRAY_CLOSE);

        self.file.write_all(&chunk).await?;
        self.file.flush().await?;
        self.written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<String> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        tracing::debug!("{} records in {}", self.written, self.path.display());
        Ok(self.path.display().to_string())
    }
}

/// Pure append: each record is followed by `,\n` and earlier content is never
/// read. The resulting file is not a JSON document on its own.
pub struct ConcatenatedSink {
    path: PathBuf,
    file: File,
}

impl ConcatenatedSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path).await?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self { path, file })
    }
}

#[async_trait::async_trait]
impl RecordSink for ConcatenatedSink {
    async fn append(&mut self, record: &ProductRecord) -> Result<()> {
        let mut chunk = to_pretty_json(record)?;
        chunk.extend_from_slice(RECORD_SEPARATOR);
        self.file.write_all(&chunk).await?;
        self.file.flush().await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<String> {
        self.file.flush().await?;
        Ok(self.path.display().to_string())
    }
}

/// Either sink, picked at runtime from the configured format.
pub enum FileSink {
    Array(JsonArraySink),
    Concatenated(ConcatenatedSink),
}

impl FileSink {
    pub async fn open(path: impl AsRef<Path>, format: OutputFormat) -> Result<Self> {
        Ok(match format {
            OutputFormat::Array => FileSink::Array(JsonArraySink::create(path).await?),
            OutputFormat::Concatenated => {
                FileSink::Concatenated(ConcatenatedSink::open(path).await?)
            }
        })
    }
}

#[async_trait::async_trait]
impl RecordSink for FileSink {
    async fn append(&mut self, record: &ProductRecord) -> Result<()> {
        match self {
            FileSink::Array(sink) => sink.append(record).await,
            FileSink::Concatenated(sink) => sink.append(record).await,
        }
    }

    async fn finish(&mut self) -> Result<String> {
        match self {
            FileSink::Array(sink) => sink.finish().await,
            FileSink::Concatenated(sink) => sink.finish().await,
        }
    }
}
