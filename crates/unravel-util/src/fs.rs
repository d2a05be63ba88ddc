use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// Obfuscated bundles occasionally carry stray bytes; the transforms only need
/// the text around them to stay intact.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Derive the output path `<outdir>/<basename(src)><suffix>`.
///
/// The full file name of `src` is kept, so `app.min.js` with suffix
/// `.dearr.js` becomes `app.min.js.dearr.js`.
#[must_use]
pub fn output_path(src: &Path, outdir: &Path, suffix: &str) -> PathBuf {
    let base = src
        .file_name()
        .map_or_else(|| "input".to_string(), |n| n.to_string_lossy().into_owned());
    outdir.join(format!("{base}{suffix}"))
}

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// The temp file lives in the destination directory so the rename never
/// crosses filesystems. The file will either have the old contents or the
/// new contents, never a partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create `dir` and its parents if missing.
///
/// # Errors
/// Returns an error if `dir` exists as a file or cannot be created.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)
}
