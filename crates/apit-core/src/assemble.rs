//! The assembly pipeline: expand input paths, parse each file by format,
//! merge, filter by tag, lower to a [`Schema`] and validate it.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::{AssembleError, ParseError};
use crate::schema::Schema;
use crate::smithy::{self, Ast};
use crate::swagger;
use crate::transform::{ImportOptions, import_with_options};

/// Input formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Smithy IDL (`.smithy`).
    Idl,
    /// Smithy JSON AST or Swagger 2.0 (`.json`).
    Json,
    /// SADL (`.sadl`). Recognised, but not readable.
    Sadl,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<InputFormat> {
        match path.extension()?.to_str()? {
            "smithy" => Some(InputFormat::Idl),
            "json" => Some(InputFormat::Json),
            "sadl" => Some(InputFormat::Sadl),
            _ => None,
        }
    }
}

/// Resolve files and directories into the list of model files to read.
///
/// Files with a recognised extension are taken as given. Directories are
/// walked recursively in file-name order, picking up recognised files.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, AssembleError> {
    let mut out = Vec::new();
    for path in paths {
        if InputFormat::from_path(path).is_some() {
            out.push(path.clone());
            continue;
        }
        let meta = fs::metadata(path).map_err(|source| AssembleError::Io {
            path: path.clone(),
            source,
        })?;
        if !meta.is_dir() {
            warn!("[WARNING]: {}: unrecognised file type, skipping", path.display());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| AssembleError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| path.clone()),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && InputFormat::from_path(entry.path()).is_some() {
                out.push(entry.into_path());
            }
        }
    }
    debug!("expanded {} input paths to {} files", paths.len(), out.len());
    Ok(out)
}

/// Parse one model file. `namespace` is used by formats that carry none of
/// their own (Swagger).
pub fn parse_file(path: &Path, namespace: Option<&str>) -> Result<Ast, AssembleError> {
    let parse_err = |source: ParseError| AssembleError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let format = InputFormat::from_path(path).ok_or_else(|| {
        parse_err(ParseError::UnsupportedFormat(path.display().to_string()))
    })?;
    let source = fs::read_to_string(path).map_err(|source| AssembleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("parsing {} as {:?}", path.display(), format);
    match format {
        InputFormat::Idl => smithy::parse(&path.display().to_string(), &source),
        InputFormat::Json => parse_json(&source, namespace),
        InputFormat::Sadl => Err(ParseError::UnsupportedFormat(format!(
            "SADL input is not supported ({})",
            path.display()
        ))),
    }
    .map_err(parse_err)
}

/// A `.json` model is a Smithy AST unless it declares `"swagger": "2.0"`.
pub fn parse_json(source: &str, namespace: Option<&str>) -> Result<Ast, ParseError> {
    let doc: serde_json::Value = serde_json::from_str(source)?;
    if swagger::is_swagger(&doc) {
        return swagger::parse_value(doc, namespace);
    }
    Ast::from_value(doc)
}

/// Parse and merge every model file under `paths`, then apply the tag
/// filter.
pub fn assemble_ast(
    paths: &[PathBuf],
    tags: &[String],
    namespace: Option<&str>,
) -> Result<Ast, AssembleError> {
    let files = expand_paths(paths)?;
    let mut merged: Option<Ast> = None;
    for file in &files {
        let ast = parse_file(file, namespace)?;
        match merged.as_mut() {
            Some(m) => m.merge(ast)?,
            None => merged = Some(ast),
        }
    }
    let mut ast = merged.unwrap_or_default();
    ast.validate()?;
    ast.filter(tags);
    Ok(ast)
}

/// The full pipeline: files to a validated [`Schema`].
pub fn assemble_model(
    paths: &[PathBuf],
    tags: &[String],
    namespace: Option<&str>,
) -> Result<Schema, AssembleError> {
    let ast = assemble_ast(paths, tags, namespace)?;
    let options = ImportOptions {
        namespace: namespace.map(str::to_string),
    };
    let schema = import_with_options(&ast, &options)?;
    schema.validate()?;
    debug!(
        "assembled {} types, {} operations, {} exceptions, {} resources",
        schema.types().len(),
        schema.operations().len(),
        schema.exceptions().len(),
        schema.resources().len()
    );
    Ok(schema)
}
