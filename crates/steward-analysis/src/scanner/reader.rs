//! Time-bounded file reads.
//!
//! Reads run on a dedicated thread. The caller waits at most `timeout` for the
//! bytes; on expiry the stalled thread is abandoned (its request channel is
//! dropped so it exits once the blocked read returns) and a fresh reader thread
//! takes its place.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use steward_core::errors::ScanError;

type ReadFn = fn(&Path, u64) -> io::Result<Vec<u8>>;

struct ReadRequest {
    path: PathBuf,
    max_size: u64,
    reply: Sender<io::Result<Vec<u8>>>,
}

/// A reader thread plus the deadline applied to every read.
pub struct TimedReader {
    tx: Sender<ReadRequest>,
    timeout: Duration,
    read_fn: ReadFn,
    replacements: u32,
}

impl TimedReader {
    pub fn new(timeout: Duration) -> Result<Self, ScanError> {
        Self::with_read_fn(timeout, read_bounded)
    }

    pub(crate) fn with_read_fn(timeout: Duration, read_fn: ReadFn) -> Result<Self, ScanError> {
        Ok(Self {
            tx: spawn_reader(read_fn)?,
            timeout,
            read_fn,
            replacements: 0,
        })
    }

    /// Number of reader threads replaced after a stall.
    pub fn replacements(&self) -> u32 {
        self.replacements
    }

    /// Read `path`, failing when it is larger than `max_size` bytes or the
    /// read does not finish within the timeout.
    pub fn read(&mut self, path: &Path, max_size: u64) -> Result<Vec<u8>, ScanError> {
        let (reply_tx, reply_rx) = bounded(1);
        let request = ReadRequest {
            path: path.to_path_buf(),
            max_size,
            reply: reply_tx,
        };
        if let Err(failed) = self.tx.send(request) {
            // The reader thread is gone; start another and retry once.
            self.tx = spawn_reader(self.read_fn)?;
            self.tx.send(failed.into_inner()).map_err(|_| ScanError::Io {
                path: path.to_path_buf(),
                message: "reader thread unavailable".to_string(),
            })?;
        }

        match reply_rx.recv_timeout(self.timeout) {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(ScanError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(path = %path.display(), timeout_ms = self.timeout.as_millis() as u64, "file read stalled, replacing reader thread");
                self.tx = spawn_reader(self.read_fn)?;
                self.replacements += 1;
                Err(ScanError::Timeout {
                    path: path.to_path_buf(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.tx = spawn_reader(self.read_fn)?;
                Err(ScanError::Io {
                    path: path.to_path_buf(),
                    message: "reader thread exited".to_string(),
                })
            }
        }
    }
}

fn spawn_reader(read_fn: ReadFn) -> Result<Sender<ReadRequest>, ScanError> {
    let (tx, rx) = bounded::<ReadRequest>(1);
    std::thread::Builder::new()
        .name("steward-reader".to_string())
        .spawn(move || {
            for request in rx {
                let result = read_fn(&request.path, request.max_size);
                let _ = request.reply.send(result);
            }
        })
        .map_err(|e| ScanError::Walk {
            message: format!("failed to spawn reader thread: {e}"),
        })?;
    Ok(tx)
}

fn read_bounded(path: &Path, max_size: u64) -> io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let len = file.metadata()?.len();
    if len > max_size {
        return Err(io::Error::other(format!(
            "file is {len} bytes, limit is {max_size}"
        )));
    }
    let mut buffer = Vec::with_capacity(len as usize);
    file.take(max_size + 1).read_to_end(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slow_read(path: &Path, _max: u64) -> io::Result<Vec<u8>> {
        if path.ends_with("slow.md") {
            std::thread::sleep(Duration::from_millis(500));
        }
        Ok(b"# ok\n".to_vec())
    }

    #[test]
    fn stalled_read_times_out_and_reader_is_replaced() {
        let mut reader = TimedReader::with_read_fn(Duration::from_millis(50), slow_read).unwrap();
        let err = reader.read(Path::new("docs/slow.md"), 1024).unwrap_err();
        assert!(matches!(err, ScanError::Timeout { timeout_ms: 50, .. }));
        assert_eq!(reader.replacements(), 1);
        // The next read goes to the fresh thread and succeeds.
        assert_eq!(reader.read(Path::new("docs/fast.md"), 1024).unwrap(), b"# ok\n");
    }

    #[test]
    fn oversized_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.md");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();
        let mut reader = TimedReader::new(Duration::from_secs(2)).unwrap();
        assert!(matches!(reader.read(&path, 16), Err(ScanError::Io { .. })));
        assert_eq!(reader.read(&path, 64).unwrap().len(), 64);
    }
}
