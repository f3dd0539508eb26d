//! Preview Sandbox CLI
//!
//! Single-shot mode:
//!   preview-sandbox [--json] [<markup.html> <style.css> <script.js>]
//!   preview-sandbox [--json] --query '<querystring>'
//!
//! Pass `-` for a file argument to leave that buffer empty; with no
//! input at all the sample document is rendered. Console entries go to
//! stderr, the composed document to stdout (or everything as one JSON
//! report with --json).
//!
//! Server mode (persistent process, reads from stdin):
//!   preview-sandbox --server
//!
//! Protocol (server mode), one query string per request line:
//!   Request (stdin):
//!     html=PGgxPkhpPC9oMT4&css=&js=
//!
//!   Response (stdout):
//!     Status:Ok
//!     Length:1234
//!
//!     <style>...
//!
//! New console entries are written to stderr after each request.

use anyhow::{anyhow, Result};
use preview_sandbox::{Buffers, ConsoleEntry, Playground, SandboxLimits};
use serde::Serialize;
use std::io::{BufRead, Write};

fn print_usage() {
    eprintln!("Preview Sandbox - live playground preview engine");
    eprintln!();
    eprintln!("Single-shot mode:");
    eprintln!("  preview-sandbox [--json] [<markup.html> <style.css> <script.js>]");
    eprintln!("  preview-sandbox [--json] --query '<querystring>'");
    eprintln!();
    eprintln!("Server mode (persistent process):");
    eprintln!("  preview-sandbox --server");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  preview-sandbox index.html styles.css script.js");
    eprintln!("  preview-sandbox --json - - script.js");
    eprintln!("  preview-sandbox --query 'html=PGgxPkhpPC9oMT4'");
}

/// One rendered result, as emitted by --json.
#[derive(Serialize)]
struct RenderReport {
    query: String,
    document: String,
    console: Vec<ConsoleEntry>,
}

fn read_buffer_arg(path: &str) -> Result<String> {
    if path == "-" {
        return Ok(String::new());
    }
    std::fs::read_to_string(path).map_err(|e| anyhow!("Failed to read '{}': {}", path, e))
}

fn print_entries(entries: &[ConsoleEntry]) {
    for entry in entries {
        eprintln!("{}", entry);
    }
}

/// Render one buffer set and print the result.
fn run_single_shot(buffers: Buffers, json: bool) -> Result<()> {
    let mut playground = Playground::new(buffers, SandboxLimits::default());
    let query = playground.refresh();
    let document = playground
        .document()
        .ok_or_else(|| anyhow!("render produced no document"))?
        .to_string();

    if json {
        let report = RenderReport {
            query,
            document,
            console: playground.console(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_entries(&playground.console());
        println!("{}", document);
    }

    Ok(())
}

/// Run in server mode: one query string per stdin line.
fn run_server() -> Result<()> {
    let mut playground = Playground::new(Buffers::default(), SandboxLimits::default());

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut reader = stdin.lock();

    eprintln!("[preview-sandbox] Server ready, reading from stdin...");

    // The panel grows monotonically across requests; only report what
    // each request appended.
    let mut reported = 0;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            // EOF - stdin closed, exit gracefully
            break;
        }

        let query = line.trim();
        playground.restore(preview_sandbox::decode(query));

        let entries = playground.console();
        print_entries(&entries[reported..]);
        reported = entries.len();

        match playground.document() {
            Some(document) => write_response(&mut stdout, true, document)?,
            None => write_response(&mut stdout, false, "render produced no document")?,
        }
    }

    eprintln!("[preview-sandbox] Server shutting down");
    Ok(())
}

/// Write response in length-prefixed protocol
fn write_response(stdout: &mut std::io::Stdout, ok: bool, body: &str) -> Result<()> {
    let status = if ok { "Ok" } else { "Error" };
    let length = body.len();

    writeln!(stdout, "Status:{}", status)?;
    writeln!(stdout, "Length:{}", length)?;
    writeln!(stdout)?; // Empty line separator
    write!(stdout, "{}", body)?;
    stdout.flush()?;

    Ok(())
}

fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--server") {
        return run_server();
    }

    let json = if args.first().map(String::as_str) == Some("--json") {
        args.remove(0);
        true
    } else {
        false
    };

    if args.first().map(String::as_str) == Some("--query") {
        let query = args
            .get(1)
            .ok_or_else(|| {
                print_usage();
                anyhow!("--query requires a querystring argument")
            })?;
        return run_single_shot(preview_sandbox::decode(query), json);
    }

    match args.len() {
        0 => run_single_shot(Buffers::sample(), json),
        3 => {
            let mut buffers = Buffers::default();
            buffers.markup.content = read_buffer_arg(&args[0])?;
            buffers.style.content = read_buffer_arg(&args[1])?;
            buffers.script.content = read_buffer_arg(&args[2])?;
            run_single_shot(buffers, json)
        }
        _ => {
            print_usage();
            Err(anyhow!("Expected no files, three files, --query or --server"))
        }
    }
}
