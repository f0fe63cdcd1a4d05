use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::GeneratedFile;
use crate::config::GeneratorConfig;
use crate::error::OutputError;

/// Write generated files under `config.outdir`, or to stdout when it is
/// empty. Returns the paths written.
pub fn write_files(
    config: &GeneratorConfig,
    files: &[GeneratedFile],
) -> Result<Vec<PathBuf>, OutputError> {
    if config.outdir.is_empty() {
        let stdout = io::stdout();
        write_stream(&mut stdout.lock(), files).map_err(|source| OutputError::Io {
            path: PathBuf::from("<stdout>"),
            source,
        })?;
        return Ok(Vec::new());
    }
    let base = Path::new(&config.outdir);
    let mut written = Vec::new();
    for file in files {
        let path = base.join(&file.path);
        write_file(&path, &file.content, config.force)?;
        written.push(path);
    }
    Ok(written)
}

/// Concatenate files onto a stream, separated by a blank line.
pub fn write_stream(out: &mut impl Write, files: &[GeneratedFile]) -> io::Result<()> {
    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        out.write_all(file.content.as_bytes())?;
    }
    out.flush()
}

/// Write one file atomically: the content goes to a temporary file in the
/// destination directory, which then replaces `path`.
pub fn write_file(path: &Path, content: &str, force: bool) -> Result<(), OutputError> {
    if path.exists() && !force {
        return Err(OutputError::Exists(path.to_path_buf()));
    }
    let io_err = |source: io::Error| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    let mut writer = BufWriter::new(tmp);
    writer.write_all(content.as_bytes()).map_err(io_err)?;
    let tmp = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    debug!("wrote {}", path.display());
    Ok(())
}
