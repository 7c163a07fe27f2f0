use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pl0_core::{CompilationArtifact, Diagnostic, SymbolRecord, Token, compile, tokenize};

/// Compile PL/0 source into p-code for a stack machine.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "PATH", help = "Source file (reads stdin when omitted)")]
    input: Option<PathBuf>,

    #[arg(short, long, value_name = "PATH", help = "Output file (writes stdout when omitted)")]
    output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "pcode",
        help = "Output format: pcode, tokens, symbols"
    )]
    emit: String,

    #[arg(short, long, help = "Report each stage on stderr")]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            buffer
        }
    };
    if cli.verbose {
        eprintln!("read {} bytes of source", source.len());
    }

    let rendered = match cli.emit.as_str() {
        "tokens" => tokenize(&source).map(|tokens| {
            if cli.verbose {
                eprintln!("lexed {} tokens", tokens.len());
            }
            render_tokens(&tokens)
        }),
        "pcode" | "symbols" => compile(&source).map(|artifact| {
            if cli.verbose {
                report(&artifact);
            }
            if cli.emit == "pcode" {
                artifact.listing()
            } else {
                render_symbols(&artifact.symbols)
            }
        }),
        other => return Err(anyhow::anyhow!("unsupported emit format: {other}")),
    };

    let rendered = match rendered {
        Ok(text) => text,
        Err(err) => {
            eprintln!("{}", Diagnostic::new(&err, &source));
            return Ok(ExitCode::FAILURE);
        }
    };

    match &cli.output {
        Some(path) => {
            write_output(path, rendered.as_bytes())?;
            if cli.verbose {
                eprintln!("wrote {}", path.display());
            }
        }
        None => io::stdout()
            .write_all(rendered.as_bytes())
            .context("failed to write to stdout")?,
    }
    Ok(ExitCode::SUCCESS)
}

fn report(artifact: &CompilationArtifact) {
    eprintln!(
        "generated {} instructions, {} symbols",
        artifact.instructions.len(),
        artifact.symbols.len()
    );
}

fn render_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| format!("{} {} {}\n", token.position, token.kind, token.text))
        .collect()
}

fn render_symbols(symbols: &[SymbolRecord]) -> String {
    let mut out = String::from("kind       name             level  address  size  value\n");
    for symbol in symbols {
        let value = symbol
            .value
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<10} {:<16} {:>5}  {:>7}  {:>4}  {}\n",
            symbol.kind.to_string(),
            symbol.name,
            symbol.level,
            symbol.address,
            symbol.size,
            value
        ));
    }
    out
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
