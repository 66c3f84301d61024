// Render catalog listings as ASCII tables fitted to the terminal.
// Falls back gracefully when the terminal width cannot be detected.

use chrono::{DateTime, Utc};
use terminal_size::{terminal_size, Width};

use crate::catalog::{Book, BorrowRecord};

const FALLBACK_WIDTH: usize = 120;

pub fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("no books matched");
        return;
    }
    let headers = ["id", "title", "author", "genre", "quantity", "available"];
    let rows: Vec<Vec<String>> = books
        .iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                b.title.clone(),
                b.author.clone(),
                b.genre.clone(),
                b.quantity.to_string(),
                b.available.to_string(),
            ]
        })
        .collect();
    print_table(&headers, &rows);
    println!("books: {}", books.len());
}

pub fn print_borrowed(records: &[BorrowRecord]) {
    if records.is_empty() {
        println!("no borrowed books");
        return;
    }
    let headers = ["record", "title", "author", "borrowed", "returned"];
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.book.title.clone(),
                r.book.author.clone(),
                fmt_date(&r.borrow_date),
                if r.returned { "yes".to_string() } else { "no".to_string() },
            ]
        })
        .collect();
    print_table(&headers, &rows);
    println!("records: {}", records.len());
}

pub fn print_book_detail(b: &Book) {
    println!("#{} {}", b.id, b.title);
    println!("  author:    {}", b.author);
    println!("  genre:     {}", b.genre);
    println!("  copies:    {} total, {} available", b.quantity, b.available);
}

fn fmt_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let termw = get_terminal_width();
    // Column widths from data, capped so one long title cannot eat the line
    let cap = (termw / headers.len().max(1)).max(8);
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len().min(cap)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            let w = cell.chars().count().min(cap);
            if w > widths[i] {
                widths[i] = w;
            }
        }
    }

    let sep = build_separator(&widths);
    println!("{}", fit_line(&sep, termw));
    println!("{}", fit_line(&build_header(headers, &widths), termw));
    println!("{}", fit_line(&sep, termw));
    for row in rows {
        println!("{}", fit_line(&build_row(row, &widths), termw));
    }
    println!("{}", fit_line(&sep, termw));
}

fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) if w > 20 => w as usize,
        _ => FALLBACK_WIDTH,
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(w + 2));
        s.push('+');
    }
    s
}

fn build_header(headers: &[&str], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let text = truncate(headers.get(i).copied().unwrap_or(""), *w);
        // headers in green, padding from the uncolored width
        let pad = w.saturating_sub(text.chars().count());
        s.push(' ');
        s.push_str(&format!("\x1b[32m{}\x1b[0m", text));
        s.push_str(&" ".repeat(pad));
        s.push_str(" |");
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = w.saturating_sub(text.chars().count());
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit())
}

// Hard cap a rendered line at the terminal width, accounting for the color
// escapes in headers.
fn fit_line(line: &str, termw: usize) -> String {
    if visible_len(line) <= termw {
        return line.to_string();
    }
    let mut out = String::new();
    let mut visible = 0usize;
    let mut in_escape = false;
    for ch in line.chars() {
        if in_escape {
            out.push(ch);
            if ch == 'm' {
                in_escape = false;
            }
            continue;
        }
        if ch == '\x1b' {
            in_escape = true;
            out.push(ch);
            continue;
        }
        if visible >= termw {
            break;
        }
        out.push(ch);
        visible += 1;
    }
    out
}

fn visible_len(s: &str) -> usize {
    let mut len = 0usize;
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            if ch == 'm' {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            len += 1;
        }
    }
    len
}
