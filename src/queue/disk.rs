//! Durable FIFO queue backed by an append-only file
//!
//! Each record is stored as a frame: a little-endian `u32` payload length
//! followed by the payload. The read position is persisted in a sidecar
//! `<file>.head` on close, so a clean close/open cycle resumes exactly where
//! consumption stopped. After a crash, records popped since the last clean
//! close are delivered again.

use crate::queue::{FifoQueue, QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const FRAME_HEADER_LEN: u64 = 4;

/// Largest payload a single frame can carry
pub const MAX_RECORD_LEN: usize = u32::MAX as usize;

/// Read position persisted next to the data file
#[derive(Debug, Serialize, Deserialize)]
struct HeadInfo {
    head: u64,
    pending: usize,
}

struct Handles {
    writer: File,
    reader: BufReader<File>,
}

/// Durable FIFO holding serialized records
pub struct FifoDiskQueue {
    path: PathBuf,
    head_path: PathBuf,
    handles: Option<Handles>,
    head: u64,
    tail: u64,
    pending: usize,
    sync_writes: bool,
}

impl std::fmt::Debug for FifoDiskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoDiskQueue")
            .field("path", &self.path)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("pending", &self.pending)
            .field("closed", &self.handles.is_none())
            .finish()
    }
}

impl FifoDiskQueue {
    /// Opens the queue stored at `path`, creating it if needed
    ///
    /// Parent directories are created on demand. A truncated trailing frame
    /// left by an interrupted write is cut off.
    ///
    /// # Arguments
    ///
    /// * `path` - Data file of the queue
    /// * `sync_writes` - Sync every push to stable storage before returning
    ///
    /// # Returns
    ///
    /// * `Ok(FifoDiskQueue)` - Queue positioned at its oldest unread record
    /// * `Err(QueueError)` - The files could not be opened or are inconsistent
    pub fn open(path: &Path, sync_writes: bool) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let head_path = sidecar_path(path, ".head");
        let head = read_head_info(&head_path)?.map(|info| info.head).unwrap_or(0);

        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let mut reader = File::open(path)?;
        let (pending, tail) = scan_frames(path, &writer, &mut reader, head)?;
        reader.seek(SeekFrom::Start(head))?;

        Ok(Self {
            path: path.to_path_buf(),
            head_path,
            handles: Some(Handles {
                writer,
                reader: BufReader::new(reader),
            }),
            head,
            tail,
            pending,
            sync_writes,
        })
    }

    fn handles(&mut self) -> QueueResult<&mut Handles> {
        self.handles.as_mut().ok_or(QueueError::Closed)
    }

    fn write_head_info(&self) -> QueueResult<()> {
        let info = HeadInfo {
            head: self.head,
            pending: self.pending,
        };
        let tmp_path = sidecar_path(&self.head_path, ".tmp");
        let bytes = serde_json::to_vec(&info).map_err(|e| QueueError::Corrupt {
            path: self.head_path.clone(),
            message: e.to_string(),
        })?;

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&bytes)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.head_path)?;
        Ok(())
    }

    fn prune(&self) -> QueueResult<()> {
        for path in [&self.path, &self.head_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::trace!("Pruned empty disk queue {}", self.path.display());
        Ok(())
    }
}

impl FifoQueue for FifoDiskQueue {
    type Item = Vec<u8>;

    fn push(&mut self, record: Vec<u8>) -> QueueResult<()> {
        if record.len() > MAX_RECORD_LEN {
            return Err(QueueError::RecordTooLarge(record.len()));
        }
        let len = record.len() as u32;
        let sync_writes = self.sync_writes;

        let mut frame = Vec::with_capacity(record.len() + FRAME_HEADER_LEN as usize);
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&record);

        let tail = self.tail;
        let path = self.path.clone();
        let handles = self.handles()?;

        // Bytes past the last committed frame belong to an earlier failed write
        let file_len = handles.writer.metadata()?.len();
        if file_len > tail {
            tracing::warn!(
                "Discarding {} stray bytes at end of {}",
                file_len - tail,
                path.display()
            );
            handles.writer.set_len(tail)?;
        } else if file_len < tail {
            return Err(QueueError::Corrupt {
                path,
                message: format!("file shrank to {} bytes, expected {}", file_len, tail),
            });
        }

        let written = handles.writer.write_all(&frame).and_then(|()| {
            if sync_writes {
                handles.writer.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            if let Err(rollback) = handles.writer.set_len(tail) {
                tracing::error!(
                    "Failed to roll back partial record in {}: {}",
                    path.display(),
                    rollback
                );
            }
            return Err(e.into());
        }

        self.tail += frame.len() as u64;
        self.pending += 1;
        Ok(())
    }

    fn pop(&mut self) -> QueueResult<Option<Vec<u8>>> {
        if self.pending == 0 {
            return Ok(None);
        }

        let head = self.head;
        let handles = self.handles()?;
        let record = match read_frame(&mut handles.reader) {
            Ok(record) => record,
            Err(e) => {
                // Next pop starts over at the same frame
                handles.reader.seek(SeekFrom::Start(head))?;
                return Err(e.into());
            }
        };

        self.head += FRAME_HEADER_LEN + record.len() as u64;
        self.pending -= 1;
        Ok(Some(record))
    }

    fn len(&self) -> usize {
        self.pending
    }

    fn close(&mut self) -> QueueResult<usize> {
        let handles = match self.handles.take() {
            Some(handles) => handles,
            None => return Ok(self.pending),
        };

        handles.writer.sync_data()?;
        drop(handles);

        if self.pending == 0 {
            self.prune()?;
        } else {
            self.write_head_info()?;
        }

        Ok(self.pending)
    }
}

fn read_frame(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut header = [0u8; FRAME_HEADER_LEN as usize];
    reader.read_exact(&mut header)?;

    let mut record = vec![0u8; u32::from_le_bytes(header) as usize];
    reader.read_exact(&mut record)?;
    Ok(record)
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn read_head_info(head_path: &Path) -> QueueResult<Option<HeadInfo>> {
    let content = match fs::read(head_path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|e| QueueError::Corrupt {
            path: head_path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Counts the complete frames after `head`, truncating a partial last frame
///
/// Returns the frame count and the end offset of the last complete frame.
fn scan_frames(
    path: &Path,
    writer: &File,
    reader: &mut File,
    head: u64,
) -> QueueResult<(usize, u64)> {
    let file_len = writer.metadata()?.len();
    if head > file_len {
        return Err(QueueError::Corrupt {
            path: path.to_path_buf(),
            message: format!("read position {} is past end of file ({} bytes)", head, file_len),
        });
    }

    let mut pos = head;
    let mut count = 0;
    let mut header = [0u8; FRAME_HEADER_LEN as usize];

    while pos < file_len {
        if pos + FRAME_HEADER_LEN > file_len {
            break;
        }
        reader.seek(SeekFrom::Start(pos))?;
        reader.read_exact(&mut header)?;
        let end = pos + FRAME_HEADER_LEN + u64::from(u32::from_le_bytes(header));
        if end > file_len {
            break;
        }
        count += 1;
        pos = end;
    }

    if pos < file_len {
        tracing::warn!(
            "Dropping {} bytes of incomplete record at end of {}",
            file_len - pos,
            path.display()
        );
        writer.set_len(pos)?;
    }

    Ok((count, pos))
}
