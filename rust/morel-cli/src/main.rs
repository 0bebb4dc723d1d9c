//! Morel CLI — a line-oriented shell around the language engine.
//!
//! Reads statements terminated by `;` from a script file or standard input,
//! feeds them to a persistent session, and prints each binding the way the
//! classic ML top level does.

use clap::Parser as ClapParser;
use morel_rt::print::wrap;
use morel_rt::session::{value_from_json, Session};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

fn gray(s: &str) -> String {
    format!("\x1b[90m{}\x1b[0m", s)
}

#[derive(ClapParser)]
#[command(
    name = "morel",
    version,
    about = "Morel — a Standard ML interpreter with relational queries",
    after_help = "Statements are terminated by ';'. With no FILE, reads from stdin."
)]
struct Cli {
    /// Script file to run; stdin when omitted
    #[arg()]
    file: Option<PathBuf>,

    /// Register a foreign data source: NAME=PATH, where PATH is a JSON file
    /// whose object becomes a record of lists
    #[arg(long, value_name = "NAME=PATH")]
    data: Vec<String>,

    /// Suppress the banner and prompts
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut session = Session::new();

    for spec in &cli.data {
        let Some((name, path)) = spec.split_once('=') else {
            eprintln!("{}", red(&format!("bad --data spec: {}", spec)));
            return ExitCode::FAILURE;
        };
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("{}", red(&format!("cannot read {}: {}", path, err)));
                return ExitCode::FAILURE;
            }
        };
        let json: serde_json::Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(err) => {
                eprintln!("{}", red(&format!("cannot parse {}: {}", path, err)));
                return ExitCode::FAILURE;
            }
        };
        session.bind_foreign(name, value_from_json(&json));
    }

    let interactive = cli.file.is_none();
    if interactive && !cli.quiet {
        println!("morel {}", env!("CARGO_PKG_VERSION"));
    }

    let source = match &cli.file {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(err) => {
                eprintln!("{}", red(&format!("cannot read {}: {}", path.display(), err)));
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    match source {
        Some(text) => run_script(&mut session, &text, cli.quiet),
        None => run_repl(&mut session, cli.quiet),
    }
}

fn run_script(session: &mut Session, text: &str, quiet: bool) -> ExitCode {
    let mut failed = false;
    for statement in split_statements(text) {
        if !eval_and_print(session, &statement, quiet) {
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_repl(session: &mut Session, quiet: bool) -> ExitCode {
    let stdin = io::stdin();
    let mut buffer = String::new();
    loop {
        if !quiet {
            let prompt = if buffer.is_empty() { "- " } else { "= " };
            print!("{}", prompt);
            io::stdout().flush().ok();
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(_) => return ExitCode::FAILURE,
        }
        buffer.push_str(&line);
        while let Some(semi) = find_statement_end(&buffer) {
            let statement: String = buffer.drain(..=semi).collect();
            let statement = statement.trim_end_matches(';').trim().to_string();
            if !statement.is_empty() {
                eval_and_print(session, &statement, quiet);
            }
        }
    }
}

fn eval_and_print(session: &mut Session, statement: &str, quiet: bool) -> bool {
    match session.eval_statement(statement) {
        Ok(result) => {
            let width = session.props().line_width.max(0) as usize;
            for warning in &result.warnings {
                if !quiet {
                    eprintln!("{}", gray(warning));
                }
            }
            for binding in &result.bindings {
                println!("{}", wrap(&binding.format(session.props()), width));
            }
            true
        }
        Err(err) => {
            eprintln!("{}", red(&format!("{} error: {}", err.stage(), err)));
            false
        }
    }
}

/// Split a script into `;`-terminated statements, ignoring semicolons
/// inside strings and comments.
fn split_statements(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;
    loop {
        match find_statement_end(rest) {
            Some(i) => {
                let statement = rest[..i].trim();
                if !statement.is_empty() {
                    out.push(statement.to_string());
                }
                rest = &rest[i + 1..];
            }
            None => {
                let tail = rest.trim();
                if !tail.is_empty() {
                    out.push(tail.to_string());
                }
                return out;
            }
        }
    }
}

/// Byte index of the next statement-terminating `;`, skipping strings and
/// `(* … *)` comments.
fn find_statement_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut comment_depth = 0;
    let mut in_string = false;
    while i < bytes.len() {
        let c = bytes[i];
        if in_string {
            match c {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else if comment_depth > 0 {
            if c == b'(' && bytes.get(i + 1) == Some(&b'*') {
                comment_depth += 1;
                i += 1;
            } else if c == b'*' && bytes.get(i + 1) == Some(&b')') {
                comment_depth -= 1;
                i += 1;
            }
        } else {
            match c {
                b'"' => in_string = true,
                b'(' if bytes.get(i + 1) == Some(&b'*') => {
                    comment_depth = 1;
                    i += 1;
                }
                b';' => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}
