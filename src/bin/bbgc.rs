//! Blueprint compiler CLI
//!
//! Validates a blueprint request and compiles it to a `discord.js` module.
//!
//! ```text
//! bbgc compile request.json -o commands/ping.js
//! bbgc validate request.json --json
//! ```

use bbgc::{
    compile_graph, validate_graph, CompileRequest, Graph, IssueSummary, Severity,
    ValidationOptions, ValidationRequest,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bbgc", version, about = "Bot Blueprint Graph Compiler")]
struct Cli {
    /// Log pipeline phases (same as RUST_LOG=bbgc=info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a request file to JavaScript
    Compile {
        /// Compile request JSON (graph plus fileType and wrapper metadata)
        request: PathBuf,

        /// Write the module here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Refuse to compile when validation reports errors
        #[arg(long)]
        deny_errors: bool,
    },
    /// Validate a request file and print its issues
    Validate {
        request: PathBuf,

        /// Print issues as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "bbgc=info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Command::Compile {
            request,
            output,
            deny_errors,
        } => compile(&request, output.as_deref(), deny_errors),
        Command::Validate { request, json } => validate(&request, json),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn read(path: &std::path::Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("reading {:?}: {}", path, e))
}

fn compile(
    path: &std::path::Path,
    output: Option<&std::path::Path>,
    deny_errors: bool,
) -> Result<ExitCode, String> {
    let request: CompileRequest = serde_json::from_str(&read(path)?)
        .map_err(|e| format!("parsing {:?}: {}", path, e))?;
    let graph = Graph::from_document(request.graph).map_err(|e| e.to_string())?;

    let issues = validate_graph(&graph, &ValidationOptions::default());
    for issue in &issues {
        eprintln!("{}", issue);
    }
    let summary = IssueSummary::of(&issues);
    if deny_errors && summary.errors > 0 {
        eprintln!("{} validation error(s); not compiling", summary.errors);
        return Ok(ExitCode::FAILURE);
    }

    let code = compile_graph(&graph, &request.options).map_err(|e| e.to_string())?;
    match output {
        Some(output) => {
            fs::write(output, &code).map_err(|e| format!("writing {:?}: {}", output, e))?;
            eprintln!("Wrote {} bytes to {:?}", code.len(), output);
        }
        None => print!("{}", code),
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(path: &std::path::Path, json: bool) -> Result<ExitCode, String> {
    let request: ValidationRequest = serde_json::from_str(&read(path)?)
        .map_err(|e| format!("parsing {:?}: {}", path, e))?;
    let graph = Graph::from_document(request.graph).map_err(|e| e.to_string())?;
    let issues = validate_graph(&graph, &request.options);

    if json {
        let text = serde_json::to_string_pretty(&issues).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        for issue in &issues {
            println!("{}", issue);
        }
        let summary = IssueSummary::of(&issues);
        println!(
            "{} error(s), {} warning(s), {} info",
            summary.errors, summary.warnings, summary.infos
        );
    }

    let failed = issues.iter().any(|issue| issue.severity == Severity::Error);
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
