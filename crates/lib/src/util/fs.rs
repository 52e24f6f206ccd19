//! Filesystem helpers shared by source copying and distribution merging.

use std::fs::{self, File, FileTimes, Metadata};
use std::io;
use std::path::Path;

/// Copy `src` to `dst`, carrying over permissions and access/modification times.
///
/// An existing `dst` is replaced even when read-only. On failure no partial
/// `dst` is left behind, so a later existence check never mistakes it for a
/// finished copy.
pub fn copy_preserving_times(src: &Path, dst: &Path) -> io::Result<()> {
  let metadata = fs::metadata(src)?;
  remove_existing(dst)?;

  let result = write_copy(src, dst, &metadata);
  if result.is_err() {
    let _ = fs::remove_file(dst);
  }
  result
}

fn write_copy(src: &Path, dst: &Path, metadata: &Metadata) -> io::Result<()> {
  let mut reader = File::open(src)?;
  let mut writer = File::create(dst)?;
  io::copy(&mut reader, &mut writer)?;

  // Times first: a read-only mode would block reopening for write.
  let times = FileTimes::new()
    .set_accessed(metadata.accessed()?)
    .set_modified(metadata.modified()?);
  writer.set_times(times)?;
  drop(writer);

  fs::set_permissions(dst, metadata.permissions())
}

fn remove_existing(path: &Path) -> io::Result<()> {
  match fs::symlink_metadata(path) {
    Ok(metadata) => {
      let mut perms = metadata.permissions();
      if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
      }
      fs::remove_file(path)
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}

/// Clear the read-only flag on `path` and, for directories, everything below it.
///
/// Version-control object files are commonly read-only, which makes recursive
/// removal fail on Windows.
pub fn make_tree_writable(path: &Path) -> io::Result<()> {
  for entry in walkdir::WalkDir::new(path) {
    let entry = entry.map_err(io::Error::other)?;
    let metadata = entry.metadata().map_err(io::Error::other)?;
    let mut perms = metadata.permissions();
    if perms.readonly() {
      #[allow(clippy::permissions_set_readonly_false)]
      perms.set_readonly(false);
      fs::set_permissions(entry.path(), perms)?;
    }
  }
  Ok(())
}
