//! schema-deref CLI
//!
//! Command-line interface for inlining `$ref` pointers and checking schema files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use schema_deref::{
    check, is_url, load_schema, resolve_document_with_options, resolve_with_options, AutoLoader,
    CheckResult, FileStatus, ResolveError, ResolveOptions, Schema, SchemaLoader, Severity,
};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "schema-deref")]
#[command(about = "Inline $ref pointers in JSON Schema documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every $ref in a schema and print the inlined result
    Resolve {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Load external references of a local schema from this base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Fetch a document again every time it is referenced
        #[arg(long)]
        no_cache: bool,
    },

    /// Check schema files for broken or circular references
    Check {
        /// File or directory to check
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Resolve {
            schema,
            base_url,
            output,
            pretty,
            no_cache,
        } => run_resolve(&schema, base_url.as_deref(), output, pretty, no_cache),

        Commands::Check {
            path,
            format,
            quiet,
        } => run_check(&path, format, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_resolve(
    schema_source: &str,
    base_url: Option<&str>,
    output: Option<PathBuf>,
    pretty: bool,
    no_cache: bool,
) -> Result<(), u8> {
    let options = ResolveOptions::new().cache(!no_cache);

    let resolved = if is_url(schema_source) {
        resolve_url(schema_source, &options)
    } else {
        resolve_file(Path::new(schema_source), base_url, &options)
    }
    .map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&resolved)
    } else {
        serde_json::to_string(&resolved)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

/// Resolve a local schema. External references load from the file's
/// directory, or from `base_url` when one is given.
fn resolve_file(
    path: &Path,
    base_url: Option<&str>,
    options: &ResolveOptions,
) -> Result<Schema, ResolveError> {
    let mut schema = load_schema(path)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let loader: Box<dyn SchemaLoader> = match base_url {
        Some(base) => http_loader(base)?,
        None => Box::new(AutoLoader::new(base_dir)?),
    };
    resolve_with_options(&mut schema, loader.as_ref(), &file_name, options)?;
    Ok(schema)
}

/// Resolve a remote schema; its references load relative to its own URL.
fn resolve_url(url: &str, options: &ResolveOptions) -> Result<Schema, ResolveError> {
    let invalid = |source| ResolveError::InvalidUrl {
        url: url.to_string(),
        source,
    };
    let base = Url::parse(url).and_then(|u| u.join(".")).map_err(invalid)?;
    let loader = http_loader(base.as_str())?;
    resolve_document_with_options(loader.as_ref(), url, options)
}

#[cfg(feature = "remote")]
fn http_loader(base_url: &str) -> Result<Box<dyn SchemaLoader>, ResolveError> {
    Ok(Box::new(schema_deref::HttpLoader::new(base_url)?))
}

#[cfg(not(feature = "remote"))]
fn http_loader(base_url: &str) -> Result<Box<dyn SchemaLoader>, ResolveError> {
    Err(ResolveError::FileNotFound {
        path: PathBuf::from(base_url),
    })
}

fn run_check(path: &Path, format: Format, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = check(path);

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&result).map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                2u8
            })?;
            println!("{}", json);
        }
        Format::Text => print_check_report(&result, quiet),
    }

    if result.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

/// One line per file, then one indented line per diagnostic:
/// `main.json: error` / `  E002 /properties/a: definition not found ...`.
/// Quiet mode keeps only failing files and their errors.
fn print_check_report(result: &CheckResult, quiet: bool) {
    for file_result in &result.results {
        if quiet && file_result.status != FileStatus::Error {
            continue;
        }

        let status = match file_result.status {
            FileStatus::Ok => "ok",
            FileStatus::Warning => "warning",
            FileStatus::Error => "error",
        };
        println!("{}: {}", file_result.file.display(), status);

        for diag in &file_result.diagnostics {
            if quiet && diag.severity != Severity::Error {
                continue;
            }
            println!("  {} {}: {}", diag.code, diag.path, diag.message);
        }
    }

    if result.is_ok() {
        println!("{} files checked, all passed", result.files_checked);
    } else {
        println!(
            "{} files checked, {} failed ({} errors, {} warnings)",
            result.files_checked, result.failed, result.errors, result.warnings
        );
    }
}
