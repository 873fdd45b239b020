//! JSON:API shaping CLI
//!
//! Command-line interface for rendering, parsing and checking JSON:API documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jsonapi_shape::config::{self, parse_convention};
use jsonapi_shape::{
    format_keys, lint, load_json, load_json_auto, validate_document, Direction, FileStatus,
    LintResult, MemoryStore, PageInfo, Pipeline, QueryDirectives, ResourceHandle,
    SchemaRegistry, Settings, Severity, ValidateError,
};

#[derive(Parser)]
#[command(name = "jsonapi-shape")]
#[command(about = "Render, parse and check JSON:API documents")]
#[command(version)]
struct Cli {
    /// Wire key convention: camelize, dasherize, underscore or unchanged
    /// (overrides JSON_API_FORMAT_KEYS)
    #[arg(long, global = true)]
    format_keys: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render resources as a JSON:API document
    Render {
        /// Resources file or URL: one resource object, or an array for a collection
        resources: String,

        /// Registry file describing the resource types
        #[arg(long)]
        registry: PathBuf,

        /// Request query string, e.g. "fields[users]=email&include=posts"
        #[arg(long, default_value = "")]
        query: String,

        /// Resource type of a collection (default: type of the first resource)
        #[arg(long = "type")]
        type_name: Option<String>,

        /// Current page of a paginated collection
        #[arg(long, requires_all = ["pages", "count", "base_url"])]
        page: Option<u64>,

        /// Total number of pages
        #[arg(long, requires = "page")]
        pages: Option<u64>,

        /// Total number of resources
        #[arg(long, requires = "page")]
        count: Option<u64>,

        /// Collection URL used for pagination links
        #[arg(long, requires = "page")]
        base_url: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Parse an inbound JSON:API document into internal form
    Parse {
        /// Document file or URL
        document: String,

        /// Registry file describing the resource types
        #[arg(long)]
        registry: PathBuf,

        /// Resource type the document must contain
        #[arg(long = "type")]
        type_name: String,

        /// Store file: array of existing resources relationships may reference
        #[arg(long)]
        store: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Convert the keys of a JSON file to or from wire case
    Format {
        /// JSON file to convert
        file: PathBuf,

        /// Convert internal keys to wire keys
        #[arg(
            long,
            conflicts_with = "from_wire",
            required_unless_present = "from_wire"
        )]
        to_wire: bool,

        /// Convert wire keys to internal keys
        #[arg(long, conflicts_with = "to_wire", required_unless_present = "to_wire")]
        from_wire: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check the structure of an inbound JSON:API document
    Validate {
        /// Document file to validate
        document: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Lint registry files for errors (shape, broken targets, naming)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let settings = match install_settings(cli.format_keys.as_deref()) {
        Ok(settings) => settings,
        Err(code) => return ExitCode::from(code),
    };

    let result = match cli.command {
        Commands::Render {
            resources,
            registry,
            query,
            type_name,
            page,
            pages,
            count,
            base_url,
            output,
            pretty,
        } => {
            let page = match (page, pages, count, base_url) {
                (Some(page), Some(pages), Some(count), Some(base_url)) => Some(PageInfo {
                    page,
                    pages,
                    count,
                    base_url,
                }),
                _ => None,
            };
            run_render(RenderArgs {
                settings,
                resources,
                registry,
                query,
                type_name,
                page,
                output,
                pretty,
            })
        }

        Commands::Parse {
            document,
            registry,
            type_name,
            store,
            pretty,
        } => run_parse(settings, &document, &registry, &type_name, store, pretty),

        Commands::Format {
            file,
            to_wire,
            from_wire: _,
            pretty,
        } => run_format(settings, &file, to_wire, pretty),

        Commands::Validate { document, json } => run_validate(&document, json),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout only ever carries JSON. Level via `RUST_LOG`.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn install_settings(format_keys: Option<&str>) -> Result<&'static Settings, u8> {
    let mut settings = Settings::from_env().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if let Some(value) = format_keys {
        settings.format_keys = parse_convention(value).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }

    info!(format_keys = %settings.format_keys, url_field = %settings.url_field_name, "Settings installed");
    config::install(settings).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn load_registry(path: &Path) -> Result<SchemaRegistry, u8> {
    let value = load_json(path).map_err(|e| {
        eprintln!("Error loading registry: {}", e);
        e.exit_code() as u8
    })?;
    SchemaRegistry::from_value(&value).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn handles_from(value: Value, what: &str) -> Result<Vec<ResourceHandle>, u8> {
    let handles = if value.is_array() {
        serde_json::from_value::<Vec<ResourceHandle>>(value)
    } else {
        serde_json::from_value::<ResourceHandle>(value).map(|handle| vec![handle])
    };
    handles.map_err(|e| {
        eprintln!("Error: invalid {}: {}", what, e);
        2u8
    })
}

fn write_json(value: &Value, pretty: bool, output: Option<&Path>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
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

struct RenderArgs {
    settings: &'static Settings,
    resources: String,
    registry: PathBuf,
    query: String,
    type_name: Option<String>,
    page: Option<PageInfo>,
    output: Option<PathBuf>,
    pretty: bool,
}

fn run_render(args: RenderArgs) -> Result<(), u8> {
    let RenderArgs {
        settings,
        resources,
        registry,
        query,
        type_name,
        page,
        output,
        pretty,
    } = args;

    let registry = load_registry(&registry)?;
    let value = load_json_auto(&resources).map_err(|e| {
        eprintln!("Error loading resources: {}", e);
        e.exit_code() as u8
    })?;
    let is_collection = value.is_array();
    let handles = handles_from(value, "resources")?;

    let pipeline = Pipeline::new(&registry, settings);
    let directives = QueryDirectives::parse(&query, settings.format_keys);

    let rendered = if is_collection {
        let Some(type_name) = type_name.or_else(|| handles.first().map(|h| h.type_name.clone()))
        else {
            eprintln!("Error: cannot infer the type of an empty collection. Use --type.");
            return Err(2);
        };
        pipeline.render_collection(&type_name, &handles, &directives, page.as_ref())
    } else {
        match handles.first() {
            Some(handle) => pipeline.render_resource(handle, &directives),
            None => return Err(2),
        }
    };

    match rendered {
        Ok(document) => write_json(&document, pretty, output.as_deref()),
        Err(e) => {
            eprintln!("Error: {}", e);
            write_json(&e.to_document(), pretty, None)?;
            Err(e.exit_code() as u8)
        }
    }
}

fn run_parse(
    settings: &'static Settings,
    document_source: &str,
    registry: &Path,
    type_name: &str,
    store: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let registry = load_registry(registry)?;
    let document = load_json_auto(document_source).map_err(|e| {
        eprintln!("Error loading document: {}", e);
        e.exit_code() as u8
    })?;

    let store: MemoryStore = match store {
        Some(path) => {
            let value = load_json(&path).map_err(|e| {
                eprintln!("Error loading store: {}", e);
                e.exit_code() as u8
            })?;
            handles_from(value, "store")?.into_iter().collect()
        }
        None => MemoryStore::new(),
    };

    let pipeline = Pipeline::new(&registry, settings);
    match pipeline.parse_document(&document, type_name, &store) {
        Ok(parsed) => {
            let value = serde_json::to_value(&parsed).map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                2u8
            })?;
            write_json(&value, pretty, None)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            write_json(&e.to_document(), pretty, None)?;
            Err(e.exit_code() as u8)
        }
    }
}

fn run_format(settings: &Settings, file: &Path, to_wire: bool, pretty: bool) -> Result<(), u8> {
    let value = load_json(file).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let direction = if to_wire {
        Direction::ToWire
    } else {
        Direction::FromWire
    };
    write_json(
        &format_keys(&value, direction, settings.format_keys),
        pretty,
        None,
    )
}

fn run_validate(path: &Path, json_output: bool) -> Result<(), u8> {
    let document = load_json(path).map_err(|e| {
        report_error(json_output, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    match validate_document(&document) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);
    if format == "json" {
        let output = serde_json::to_value(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        write_json(&output, true, None)?;
    } else {
        print_lint_report(&result, strict, quiet);
    }

    if result.passes(strict) {
        Ok(())
    } else {
        Err(1)
    }
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Human-readable lint report. `quiet` keeps only failing files and errors.
fn print_lint_report(result: &LintResult, strict: bool, quiet: bool) {
    if !quiet {
        println!("Linting {} ...\n", result.path.display());
    }

    for file_result in &result.results {
        let (color, mark) = match file_result.status {
            FileStatus::Ok => (GREEN, '✓'),
            FileStatus::Warning => (YELLOW, '⚠'),
            FileStatus::Error => (RED, '✗'),
        };
        if !quiet || file_result.status != FileStatus::Ok {
            println!("  {color}{mark}{RESET} {}", file_result.file.display());
        }

        let shown = file_result
            .diagnostics
            .iter()
            .filter(|diag| !quiet || diag.severity == Severity::Error);
        for diag in shown {
            let (color, label) = match diag.severity {
                Severity::Error => (RED, "error"),
                Severity::Warning => (YELLOW, "warning"),
            };
            println!(
                "    {color}{label}[{}]{RESET}: {} - {}",
                diag.code, diag.path, diag.message
            );
        }
    }

    println!();
    if result.passes(strict) {
        println!(
            "{GREEN}✓ {} files checked, all passed{RESET}",
            result.files_checked
        );
    } else {
        println!(
            "{RED}✗ {} files checked: {} passed, {} failed ({} errors, {} warnings){RESET}",
            result.files_checked, result.passed, result.failed, result.errors, result.warnings
        );
    }
}
