//!
//! libris CLI binary
//! -----------------
//! Interactive client for a library-management REST API. Keeps a bearer
//! session on disk between runs, transparently refreshing the access token
//! when the server rejects it, and renders catalog results as tables.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use libris::auth::{SessionManager, TokenStore};
use libris::catalog::Catalog;
use libris::cli::{dispatch_line, CliContext, Outcome};
use libris::client::ApiClient;
use libris::config::Config;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--state <dir>] [--user <u> --password <p>] [--command \"<line>\"]\n\nFlags:\n  --api <url>          Base URL of the library API (default: $LIBRIS_API_URL or http://127.0.0.1:8000)\n  --state <dir>        Directory for the persisted session (default: $LIBRIS_STATE_DIR or .libris)\n  --user <u>           Log in as <u> before starting (requires --password)\n  --password <p>       Password for --user\n  --command \"<line>\"   Run one command and exit instead of starting the prompt\n  -h, --help           Show this help\n\nInteractive commands: type 'help' at the prompt.\n\nExamples:\n  {program} --api http://library.local:8000 --user alice --password secret\n  {program} --command \"search author herbert\""
    );
}

fn main() -> Result<()> {
    println!(
        r"   __ _ __       _
  / /(_) /  _____(_)__
 / / / / _ \/ __/ (_-<
/_/_/_/_.__/_/ /_/___/
     Library Catalog Client"
    );
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut cfg = Config::from_env();
    let mut user: Option<String> = None;
    let mut password: Option<String> = None;
    let mut one_shot: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a URL"); print_usage(&program); std::process::exit(2); }
                cfg.api_url = args[i + 1].clone();
                i += 2; continue;
            }
            "--state" => {
                if i + 1 >= args.len() { eprintln!("--state requires a value"); print_usage(&program); std::process::exit(2); }
                cfg.state_dir = args[i + 1].clone().into();
                i += 2; continue;
            }
            "--user" => {
                if i + 1 >= args.len() { eprintln!("--user requires a value"); print_usage(&program); std::process::exit(2); }
                user = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--password" => {
                if i + 1 >= args.len() { eprintln!("--password requires a value"); print_usage(&program); std::process::exit(2); }
                password = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--command" => {
                if i + 1 >= args.len() { eprintln!("--command requires a value"); print_usage(&program); std::process::exit(2); }
                one_shot = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            other => {
                eprintln!("unknown flag: {}", other);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    let rt = tokio::runtime::Runtime::new().context("start tokio runtime")?;

    let store = Arc::new(TokenStore::new(&cfg.state_dir));
    let client = Arc::new(ApiClient::new(&cfg, store).context("build API client")?);
    let session = Arc::new(SessionManager::new(client.clone()));
    let catalog = Catalog::new(client);
    let ctx = CliContext {
        session: session.clone(),
        catalog,
        api_url: cfg.api_url.clone(),
        state_dir: cfg.state_dir.display().to_string(),
    };

    match (user, password) {
        (Some(u), Some(p)) => match rt.block_on(session.login(&u, &p)) {
            Ok(id) => println!("logged in as {}", id.email),
            Err(e) => eprintln!("auto-login failed [{}]: {}", e.kind_str(), e),
        },
        (Some(_), None) | (None, Some(_)) => {
            eprintln!("--user and --password must be given together");
            print_usage(&program);
            std::process::exit(2);
        }
        (None, None) => {}
    }

    if let Some(line) = one_shot {
        dispatch_line(&rt, &ctx, &line);
        return Ok(());
    }

    match session.current_user() {
        Some(id) => println!("session: {}", id.email),
        None => println!("session: not logged in"),
    }
    println!("libris interpreter. Type 'help' for commands.");

    let mut rl = DefaultEditor::new().context("init line editor")?;
    loop {
        match rl.readline("libris> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if dispatch_line(&rt, &ctx, &line) == Outcome::Quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("input error: {}", e);
                break;
            }
        }
    }
    Ok(())
}
