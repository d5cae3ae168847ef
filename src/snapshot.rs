use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

/// Copy a database to a private temp file so a live, locked profile can be
/// read without touching the original. The copy disappears when the returned
/// handle drops.
// TODO: copy -wal/-shm sidecars alongside the main file so visits committed
// since the last checkpoint are not missed.
pub fn copy_to_temp(path: &Path) -> io::Result<NamedTempFile> {
    let mut src = std::fs::File::open(path)?;
    let mut tmp = NamedTempFile::new()?;
    let bytes = io::copy(&mut src, tmp.as_file_mut())?;
    debug!(
        "snapshotted {} ({bytes} bytes) to {}",
        path.display(),
        tmp.path().display()
    );
    Ok(tmp)
}
