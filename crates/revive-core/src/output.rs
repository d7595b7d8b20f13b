use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SINK_MODE: u32 = 0o664;

/// The single append-mode file that receives stdout and stderr of every attempt.
///
/// Opened once and shared by clone. Writers never lock: each `write` goes
/// straight to an `O_APPEND` descriptor, so chunks from the two streams may
/// interleave but are never lost or duplicated. A sink whose file could not be
/// opened silently discards everything written to it.
#[derive(Clone, Debug)]
pub struct OutputSink {
	file: Option<Arc<File>>,
	path: PathBuf,
}

impl OutputSink {
	pub fn open(path: &Path) -> io::Result<Self> {
		let file = OpenOptions::new()
			.read(true)
			.create(true)
			.append(true)
			.mode(SINK_MODE)
			.open(path)?;
		Ok(Self {
			file: Some(Arc::new(file)),
			path: path.to_path_buf(),
		})
	}

	/// Opens the sink, or logs a warning and returns a discarding sink.
	pub fn open_or_discard(path: &Path) -> Self {
		match Self::open(path) {
			Ok(sink) => sink,
			Err(e) => {
				tracing::warn!(
					"output file {} could not be opened: {}; child output will be discarded",
					path.display(),
					e
				);
				Self::discard(path)
			}
		}
	}

	pub fn discard(path: &Path) -> Self {
		Self {
			file: None,
			path: path.to_path_buf(),
		}
	}

	pub fn is_discarding(&self) -> bool {
		self.file.is_none()
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn write(&self, data: &[u8]) -> io::Result<()> {
		match &self.file {
			Some(file) => (&**file).write_all(data),
			None => Ok(()),
		}
	}
}
