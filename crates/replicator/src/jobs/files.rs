//! Disk I/O jobs
//!
//! [`FileJob`] writes one new file per dispatch, [`FillJob`] keeps
//! appending to a single file until cancelled, and [`write_file`] is the
//! one-shot single-file mode.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::job::{Job, JobContext, JobError, Payload};
use crate::stats::DomainCounters;

/// How many bytes each file receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SizePolicy {
    /// Exactly this many bytes
    Fixed { bytes: u64 },
    /// Uniformly random in `[0, max)`
    Random { max: u64 },
}

impl SizePolicy {
    /// Draw the size of the next file
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            SizePolicy::Fixed { bytes } => bytes,
            SizePolicy::Random { max } if max == 0 => 0,
            SizePolicy::Random { max } => rng.gen_range(0..max),
        }
    }

    /// Largest size this policy can produce
    pub fn upper_bound(&self) -> u64 {
        match *self {
            SizePolicy::Fixed { bytes } => bytes,
            SizePolicy::Random { max } => max.saturating_sub(1),
        }
    }
}

/// What the bytes in each file look like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPolicy {
    /// Fresh random bytes for every write
    Random,
    /// One random buffer generated up front and reused for every write
    Repeated,
}

/// Largest single write; bodies of any size stream through a buffer this big
const WRITE_CHUNK: usize = 64 * 1024;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Buffer length needed to write `size` bytes in chunks
fn chunk_len(size: u64) -> usize {
    usize::try_from(size).map_or(WRITE_CHUNK, |size| size.min(WRITE_CHUNK))
}

/// Source of the bytes streamed into a file
enum Body<'a> {
    /// Refill the buffer with fresh random bytes for every chunk
    Random(Vec<u8>),
    /// Write the same bytes for every chunk
    Repeated(&'a [u8]),
}

impl<'a> Body<'a> {
    fn random(size: u64) -> Self {
        Body::Random(vec![0u8; chunk_len(size)])
    }

    fn next_chunk(&mut self, remaining: u64) -> Result<&[u8], JobError> {
        let buf: &[u8] = match self {
            Body::Random(buf) => {
                rand::thread_rng().fill_bytes(buf.as_mut_slice());
                buf.as_slice()
            }
            Body::Repeated(buf) => *buf,
        };
        if buf.is_empty() {
            return Err(JobError::Invalid(format!(
                "no content buffer for {} remaining bytes",
                remaining
            )));
        }
        let len = chunk_len(remaining).min(buf.len());
        Ok(&buf[..len])
    }
}

/// Stream `size` bytes from `body` into `file`
///
/// `written` is updated after every chunk, so callers can still read it
/// when a later chunk fails.
async fn write_chunked(
    file: &mut tokio::fs::File,
    size: u64,
    mut body: Body<'_>,
    written: &mut u64,
) -> Result<(), JobError> {
    let mut remaining = size;
    while remaining > 0 {
        let chunk = body.next_chunk(remaining)?;
        file.write_all(chunk).await?;
        remaining -= chunk.len() as u64;
        *written += chunk.len() as u64;
    }
    Ok(())
}

async fn write_body(path: &Path, size: u64, body: Body<'_>) -> Result<u64, JobError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0;
    write_chunked(&mut file, size, body, &mut written).await?;
    file.flush().await?;
    Ok(written)
}

/// A file written by a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWritten {
    pub path: PathBuf,
    pub bytes: u64,
}

impl fmt::Display for FileWritten {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} bytes", self.path.display(), self.bytes)
    }
}

impl Payload for FileWritten {
    fn tally(&self, counters: &mut DomainCounters) {
        counters.add_written(self.bytes);
    }
}

/// Write one file of `size` random bytes at `path`
pub async fn write_file(path: impl AsRef<Path>, size: u64) -> Result<FileWritten, JobError> {
    let path = path.as_ref();
    let bytes = write_body(path, size, Body::random(size)).await?;
    Ok(FileWritten {
        path: path.to_path_buf(),
        bytes,
    })
}

/// Input for one file write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    pub path: PathBuf,
    pub size: u64,
}

/// Writes one new, uniquely named file per dispatch under `root`
///
/// Files are streamed in chunks of at most 64 KiB, so memory use does not
/// grow with the configured size.
#[derive(Debug)]
pub struct FileJob {
    root: PathBuf,
    size: SizePolicy,
    content: ContentPolicy,
    repeated: Vec<u8>,
}

impl FileJob {
    pub fn new(root: impl Into<PathBuf>, size: SizePolicy, content: ContentPolicy) -> Self {
        let repeated = match content {
            ContentPolicy::Repeated => random_bytes(chunk_len(size.upper_bound())),
            ContentPolicy::Random => Vec::new(),
        };

        Self {
            root: root.into(),
            size,
            content,
            repeated,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Job for FileJob {
    const KIND: &'static str = "files";
    type Input = FileInput;
    type Output = FileWritten;

    fn next_input(&self) -> Self::Input {
        let name = Uuid::now_v7().to_string();
        FileInput {
            path: self.root.join(name),
            size: self.size.sample(&mut rand::thread_rng()),
        }
    }

    async fn execute(&self, _ctx: &JobContext, input: FileInput) -> Result<FileWritten, JobError> {
        let body = match self.content {
            ContentPolicy::Random => Body::random(input.size),
            ContentPolicy::Repeated => Body::Repeated(&self.repeated),
        };
        let bytes = write_body(&input.path, input.size, body).await?;

        Ok(FileWritten {
            path: input.path,
            bytes,
        })
    }
}

/// Appends `chunk`-sized writes to one file until the run is cancelled
///
/// The file is truncated once at construction; every dispatch appends, so
/// a re-dispatch after a failed write continues the same file. A failed
/// dispatch is an error result, and the bytes it appended before failing
/// are logged but not added to the run's byte counter.
#[derive(Debug)]
pub struct FillJob {
    path: PathBuf,
    chunk: u64,
    content: ContentPolicy,
}

impl FillJob {
    /// Create (or truncate) the target file
    pub fn create(
        path: impl Into<PathBuf>,
        chunk: u64,
        content: ContentPolicy,
    ) -> std::io::Result<Self> {
        if chunk == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "fill chunk size must be at least 1 byte",
            ));
        }

        let path = path.into();
        std::fs::File::create(&path)?;
        Ok(Self {
            path,
            chunk,
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append_until_cancelled(
        &self,
        ctx: &JobContext,
        written: &mut u64,
    ) -> Result<(), JobError> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await?;

        let repeated = match self.content {
            ContentPolicy::Repeated => random_bytes(chunk_len(self.chunk)),
            ContentPolicy::Random => Vec::new(),
        };

        while !ctx.is_cancelled() {
            let body = match self.content {
                ContentPolicy::Random => Body::random(self.chunk),
                ContentPolicy::Repeated => Body::Repeated(&repeated),
            };
            write_chunked(&mut file, self.chunk, body, written).await?;
            file.sync_data().await?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Job for FillJob {
    const KIND: &'static str = "fill";
    type Input = ();
    type Output = FileWritten;

    fn next_input(&self) -> Self::Input {}

    async fn execute(&self, ctx: &JobContext, _input: ()) -> Result<FileWritten, JobError> {
        let mut written = 0u64;
        if let Err(error) = self.append_until_cancelled(ctx, &mut written).await {
            warn!(
                path = %self.path.display(),
                bytes = written,
                %error,
                "Fill write failed"
            );
            return Err(error);
        }

        Ok(FileWritten {
            path: self.path.clone(),
            bytes: written,
        })
    }
}
