use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use log::debug;

use apit_core::config::{self, ApitConfig, CONFIG_FILE_NAME, GeneratorConfig};
use apit_core::{CodeGenerator, assemble_ast, assemble_model, emit, output};
use apit_markdown::MarkdownGenerator;

const DEFAULT_GENERATOR: &str = "smithy";

#[derive(Parser, Debug)]
#[command(
    name = "apit",
    about = "Translate API descriptions between Smithy IDL, Smithy AST and Swagger 2.0",
    disable_version_flag = true
)]
struct Cli {
    /// Print the version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// List the shape ids of the assembled model and exit
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Overwrite existing output files
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Generator to run (smithy, smithy-ast, json, markdown)
    #[arg(short = 'g', long = "generator")]
    generator: Option<String>,

    /// Output directory; stdout when omitted
    #[arg(short = 'o', long = "outdir")]
    outdir: Option<String>,

    /// Generator parameter, `key=value` or `key`
    #[arg(short = 'a', long = "arg", value_name = "KEY[=VALUE]")]
    args: Vec<String>,

    /// Keep only operations and resources with this tag (repeatable)
    #[arg(short = 't', long = "tag")]
    tags: Vec<String>,

    /// Namespace for inputs that carry none (Swagger)
    #[arg(short = 'n', long = "namespace")]
    namespace: Option<String>,

    /// Emit entities sorted by name
    #[arg(short = 's', long = "sort")]
    sort: bool,

    /// Model files or directories
    paths: Vec<PathBuf>,
}

/// A failed run and the exit code it maps to.
enum Failure {
    Usage(anyhow::Error),
    Assemble(anyhow::Error),
    Generate(anyhow::Error),
}

impl Failure {
    fn code(&self) -> u8 {
        match self {
            Failure::Usage(_) => 1,
            Failure::Assemble(_) => 2,
            Failure::Generate(_) => 4,
        }
    }

    fn error(&self) -> &anyhow::Error {
        match self {
            Failure::Usage(e) | Failure::Assemble(e) | Failure::Generate(e) => e,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if cli.version {
        println!("apit {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {:#}", failure.error());
            ExitCode::from(failure.code())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<ApitConfig> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    let config = config::load_config(&config_path).map_err(|e| anyhow!(e))?;
    Ok(config.unwrap_or_default())
}

/// Combine the project file with command-line flags; flags win.
fn resolve(cli: &Cli, file: &ApitConfig) -> GeneratorConfig {
    let mut config = file.generator_config();
    if let Some(outdir) = &cli.outdir {
        config.outdir = outdir.clone();
    }
    if cli.namespace.is_some() {
        config.namespace = cli.namespace.clone();
    }
    config.force |= cli.force;
    config.sort |= cli.sort;
    for arg in &cli.args {
        config.set_param(arg);
    }
    config
}

/// Look up a generator by its id.
fn get_generator(id: &str) -> Option<Box<dyn CodeGenerator>> {
    match id {
        "markdown" => Some(Box::new(MarkdownGenerator)),
        _ => emit::builtin(id),
    }
}

fn run(cli: Cli) -> Result<(), Failure> {
    let file = try_load_config().map_err(Failure::Usage)?;
    let config = resolve(&cli, &file);

    let paths = if cli.paths.is_empty() {
        file.inputs.clone()
    } else {
        cli.paths.clone()
    };
    if paths.is_empty() {
        return Err(Failure::Usage(anyhow!("no input files")));
    }
    let tags = if cli.tags.is_empty() {
        file.tags.clone()
    } else {
        cli.tags.clone()
    };
    let namespace = config.namespace.as_deref();

    if cli.list {
        let ast = assemble_ast(&paths, &tags, namespace)
            .context("failed to assemble model")
            .map_err(Failure::Assemble)?;
        for id in ast.shape_ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let gen_id = cli
        .generator
        .clone()
        .or_else(|| file.generator.clone())
        .unwrap_or_else(|| DEFAULT_GENERATOR.to_string());
    let generator = get_generator(&gen_id)
        .ok_or_else(|| Failure::Usage(anyhow!("unknown generator `{gen_id}`")))?;

    debug!("running generator {gen_id}");
    let schema = assemble_model(&paths, &tags, namespace)
        .context("failed to assemble model")
        .map_err(Failure::Assemble)?;

    let files = generator
        .generate(&schema, &config)
        .with_context(|| format!("generator `{gen_id}` failed"))
        .map_err(Failure::Generate)?;
    let written = output::write_files(&config, &files)
        .context("failed to write output")
        .map_err(Failure::Generate)?;
    for path in written {
        eprintln!("  wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "apit", "-g", "markdown", "-o", "docs", "-a", "title=Pets", "-a", "toc", "-t", "a",
            "-t", "b", "-f", "model/", "extra.smithy",
        ])
        .unwrap();
        assert_eq!(cli.generator.as_deref(), Some("markdown"));
        assert_eq!(cli.tags, vec!["a", "b"]);
        assert_eq!(cli.paths.len(), 2);
        assert!(cli.force);

        let config = resolve(&cli, &ApitConfig::default());
        assert_eq!(config.outdir, "docs");
        assert_eq!(config.param("title"), Some("Pets"));
        assert!(config.flag("toc"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let file: ApitConfig =
            serde_yaml_ng::from_str("outdir: out\nsort: true\nparams:\n  title: File\n").unwrap();
        let cli = Cli::try_parse_from(["apit", "-o", "cli", "-a", "title=Flag"]).unwrap();
        let config = resolve(&cli, &file);
        assert_eq!(config.outdir, "cli");
        assert!(config.sort);
        assert_eq!(config.param("title"), Some("Flag"));
    }

    #[test]
    fn test_version_flag_is_lowercase() {
        let cli = Cli::try_parse_from(["apit", "-v"]).unwrap();
        assert!(cli.version);
        assert!(Cli::try_parse_from(["apit", "--bogus"]).is_err());
    }

    #[test]
    fn test_generator_lookup() {
        for id in ["smithy", "smithy-ast", "json", "markdown"] {
            assert_eq!(get_generator(id).unwrap().id(), id);
        }
        assert!(get_generator("plantuml").is_none());
    }
}
