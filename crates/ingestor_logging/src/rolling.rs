//! Size-based rotating log file.
//!
//! `<name>.log` is the live file; on rotation it becomes `<name>.log.1` and
//! older files shift up until `max_files` is reached.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// How many files to keep and how large each may grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_files: usize,
    pub max_size: u64,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_size: 10 * 1024 * 1024,
        }
    }
}

struct RollingFile {
    dir: PathBuf,
    stem: String,
    policy: RotationPolicy,
    file: Option<File>,
    written: u64,
}

impl RollingFile {
    fn open(dir: PathBuf, name: &str, policy: RotationPolicy) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let mut rolling = Self {
            dir,
            stem: file_stem(name),
            policy: RotationPolicy {
                max_files: policy.max_files.max(1),
                max_size: policy.max_size,
            },
            file: None,
            written: 0,
        };
        rolling.reopen()?;
        if rolling.written > rolling.policy.max_size {
            rolling.rotate()?;
        }
        Ok(rolling)
    }

    fn live_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.stem))
    }

    fn numbered_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.stem, index))
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.live_path())?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
        self.shift_files()?;
        self.reopen()
    }

    fn shift_files(&self) -> io::Result<()> {
        let last = self.policy.max_files - 1;
        if last == 0 {
            // Single-file policy: truncate in place.
            return remove_if_exists(&self.live_path());
        }
        remove_if_exists(&self.numbered_path(last))?;
        for index in (1..last).rev() {
            let from = self.numbered_path(index);
            if from.exists() {
                fs::rename(&from, self.numbered_path(index + 1))?;
            }
        }
        let live = self.live_path();
        if live.exists() {
            fs::rename(live, self.numbered_path(1))?;
        }
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.policy.max_size {
            self.rotate()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// `MakeWriter` handing out guards over one shared rolling file.
#[derive(Clone)]
pub struct SharedRollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl SharedRollingWriter {
    pub fn new(dir: PathBuf, name: &str, policy: RotationPolicy) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(RollingFile::open(dir, name, policy)?)),
        })
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut RollingFile) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut guard)
    }
}

pub struct RollingGuard {
    writer: SharedRollingWriter,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRollingWriter {
    type Writer = RollingGuard;

    fn make_writer(&'a self) -> Self::Writer {
        RollingGuard {
            writer: self.clone(),
        }
    }
}

impl Write for RollingGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.with_file(|file| file.flush())
    }
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if stem.is_empty() {
        "ingestor".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("ingestor cli/v1"), "ingestor_cli_v1");
        assert_eq!(file_stem(""), "ingestor");
    }

    #[test]
    fn test_rotation_keeps_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RotationPolicy {
            max_files: 3,
            max_size: 16,
        };
        let writer = SharedRollingWriter::new(dir.path().to_path_buf(), "app", policy).unwrap();

        for i in 0..6 {
            let mut guard = writer.make_writer();
            guard.write_all(format!("line number {i:02}\n").as_bytes()).unwrap();
            guard.flush().unwrap();
        }

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.log.1").exists());
        assert!(dir.path().join("app.log.2").exists());
        assert!(!dir.path().join("app.log.3").exists());

        let live = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(live, "line number 05\n");
        let previous = fs::read_to_string(dir.path().join("app.log.1")).unwrap();
        assert_eq!(previous, "line number 04\n");
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "old\n").unwrap();

        let writer =
            SharedRollingWriter::new(dir.path().to_path_buf(), "app", RotationPolicy::default())
                .unwrap();
        writer.make_writer().write_all(b"new\n").unwrap();

        let content = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(content, "old\nnew\n");
    }
}
