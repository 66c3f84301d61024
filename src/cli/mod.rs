//! Interactive command handling for the libris CLI.
//! Commands are plain words, dispatched against the session controller and
//! the catalog; errors print with their kind so scripts can grep them.

pub mod outputformatter;

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::catalog::{BookQuery, Catalog};
use crate::error::ApiError;

pub struct CliContext {
    pub session: Arc<SessionManager>,
    pub catalog: Catalog,
    pub api_url: String,
    pub state_dir: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

pub fn print_help() {
    println!(
        "Commands:\n  login <user> <password>       obtain a session from the token endpoint\n  logout                        clear the stored session (idempotent)\n  register <user> <password>    create an account (does not log in)\n  whoami                        show the email derived from the access token\n  status                        show connection and session info\n  search <text>                 search books by title\n  search <field> <text>         search by title, author or genre\n  show <id>                     book detail\n  borrow <id>                   borrow a book by its id\n  return <record-id>            return a borrow record\n  mine                          list your open borrow records\n  help                          show this help\n  quit | exit                   leave the interpreter"
    );
}

fn print_err(e: &ApiError) {
    eprintln!("error [{}]: {}", e.kind_str(), e);
}

/// Handle one input line. Network calls run on the provided runtime so the
/// prompt loop itself stays synchronous, as rustyline expects.
pub fn dispatch_line(rt: &tokio::runtime::Runtime, ctx: &CliContext, line: &str) -> Outcome {
    let line = line.trim();
    if line.is_empty() {
        return Outcome::Continue;
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts[0].to_ascii_lowercase().as_str() {
        "quit" | "exit" => return Outcome::Quit,
        "help" => print_help(),
        "login" => {
            if parts.len() != 3 {
                eprintln!("usage: login <user> <password>");
                return Outcome::Continue;
            }
            match rt.block_on(ctx.session.login(parts[1], parts[2])) {
                Ok(id) => println!("logged in as {}", id.email),
                Err(e) => print_err(&e),
            }
        }
        "logout" => {
            ctx.session.logout();
            println!("logged out");
        }
        "register" => {
            if parts.len() != 3 {
                eprintln!("usage: register <user> <password>");
                return Outcome::Continue;
            }
            match rt.block_on(ctx.session.register(parts[1], parts[2])) {
                Ok(()) => println!("account created; use 'login' to start a session"),
                Err(e) => print_err(&e),
            }
        }
        "whoami" => match ctx.session.current_user() {
            Some(id) => println!("{}", id.email),
            None => println!("not logged in"),
        },
        "status" => {
            println!("api:   {}", ctx.api_url);
            println!("state: {}", ctx.state_dir);
            match ctx.session.current_user() {
                Some(id) => println!("user:  {}", id.email),
                None => println!("user:  (not logged in)"),
            }
        }
        "search" => {
            let query = match parts.len() {
                0 | 1 => {
                    eprintln!("usage: search [title|author|genre] <text>");
                    return Outcome::Continue;
                }
                2 => BookQuery { title: Some(parts[1].to_string()), ..Default::default() },
                _ => match BookQuery::by_field(parts[1], &parts[2..].join(" ")) {
                    Some(q) => q,
                    None => {
                        // no field keyword: treat the whole tail as a title search
                        BookQuery { title: Some(parts[1..].join(" ")), ..Default::default() }
                    }
                },
            };
            match rt.block_on(ctx.catalog.search(&query)) {
                Ok(books) => outputformatter::print_books(&books),
                Err(e) => print_err(&e),
            }
        }
        "show" => match parse_id(&parts, "show <id>") {
            Some(id) => match rt.block_on(ctx.catalog.book(id)) {
                Ok(b) => outputformatter::print_book_detail(&b),
                Err(e) => print_err(&e),
            },
            None => {}
        },
        "borrow" => match parse_id(&parts, "borrow <id>") {
            Some(id) => match rt.block_on(ctx.catalog.borrow(id)) {
                Ok(rec) => println!(
                    "borrowed '{}' (record {}, taken {})",
                    rec.book.title,
                    rec.id,
                    rec.borrow_date.format("%Y-%m-%d")
                ),
                Err(e) => print_err(&e),
            },
            None => {}
        },
        "return" => match parse_id(&parts, "return <record-id>") {
            Some(id) => match rt.block_on(ctx.catalog.return_book(id)) {
                Ok(()) => println!("returned record {}", id),
                Err(e) => print_err(&e),
            },
            None => {}
        },
        "mine" => match rt.block_on(ctx.catalog.my_borrowed()) {
            Ok(records) => outputformatter::print_borrowed(&records),
            Err(e) => print_err(&e),
        },
        other => {
            eprintln!("unknown command '{}'; type 'help'", other);
        }
    }
    Outcome::Continue
}

fn parse_id(parts: &[&str], usage: &str) -> Option<i64> {
    match parts.get(1).and_then(|s| s.parse::<i64>().ok()) {
        Some(id) => Some(id),
        None => {
            eprintln!("usage: {}", usage);
            None
        }
    }
}
