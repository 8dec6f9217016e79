//! Line-oriented interactive shell over a [`Session`].
//!
//! Commands read from stdin one per line; listings go to stdout, progress
//! and prompts to stderr.
use duscope_core::analysis::top_files;
use duscope_core::delete::{DeleteOutcome, DeletionPrompt};
use duscope_core::model::size::{format_count, format_size, percent_bar, shorten_tail};
use duscope_session::{ListingRow, Session};
use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

/// Width of the name column in listings.
const NAME_WIDTH: usize = 40;

/// How often the scan status line is redrawn.
const PROGRESS_REDRAW: Duration = Duration::from_millis(150);

const HELP: &str = "\
Commands:
  ls               list the current folder
  cd <name>        enter a subfolder (`cd ..` goes up)
  up               go to the parent folder
  pwd              print the current folder
  rm <name>        delete an entry (trash first)
  top [n]          show the largest files
  errors           show unreadable entries
  help             show this help
  quit             leave";

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no, as is EOF.
pub fn ask(question: &str) -> bool {
    eprint!("{question} [y/N] ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
    }
}

/// Pump the session until the scan ends, redrawing a status line.
pub fn show_scan_progress(session: &mut Session) {
    let mut last_draw: Option<Instant> = None;
    while session.is_busy() {
        let changed = session.process_scan_messages();
        if changed && last_draw.map_or(true, |t| t.elapsed() >= PROGRESS_REDRAW) {
            eprint!(
                "\r\x1b[2K{} entries, {} | {}",
                format_count(session.scan_visited),
                format_size(session.scan_total_size),
                shorten_tail(&session.scan_current_path, 60),
            );
            let _ = io::stderr().flush();
            last_draw = Some(Instant::now());
        }
        if !changed {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
    eprint!("\r\x1b[2K");
    if let Some(duration) = session.scan_duration {
        eprintln!(
            "Scanned {} files in {} directories ({}) in {:.2}s, {} unreadable",
            format_count(session.scan_files_found),
            format_count(session.scan_dirs_found),
            format_size(session.scan_total_size),
            duration.as_secs_f64(),
            format_count(session.scan_error_count),
        );
    }
}

/// Read and execute commands until a confirmed `quit` or EOF.
pub fn run(session: &mut Session, top_n: usize) -> anyhow::Result<()> {
    print_listing(session);
    let stdin = io::stdin();
    loop {
        if let Some(path) = session.breadcrumb() {
            print!("{} > ", shorten_tail(&path.to_string(), 50));
        }
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "ls" => print_listing(session),
            "cd" if arg == ".." => go_up(session),
            "cd" => {
                if session.enter(arg) {
                    print_listing(session);
                } else {
                    eprintln!("No folder named {arg:?} here.");
                }
            }
            "up" => go_up(session),
            "pwd" => {
                if let Some(path) = session.breadcrumb() {
                    println!("{path}");
                }
            }
            "rm" => remove(session, arg),
            "top" => {
                let n = arg.parse().unwrap_or(top_n);
                print_top(session, n);
            }
            "errors" => {
                for (path, message) in &session.scan_errors {
                    println!("{path}: {message}");
                }
                if session.scan_error_count as usize > session.scan_errors.len() {
                    println!(
                        "... and {} more",
                        session.scan_error_count as usize - session.scan_errors.len()
                    );
                }
            }
            "help" | "?" => println!("{HELP}"),
            "quit" | "exit" | "q" => {
                if ask("Are you sure you want to quit?") {
                    return Ok(());
                }
            }
            other => eprintln!("Unknown command {other:?}. Type `help`."),
        }
    }
}

fn go_up(session: &mut Session) {
    if session.go_up() {
        print_listing(session);
    } else {
        eprintln!("Already at the search root.");
    }
}

fn print_listing(session: &Session) {
    let rows = session.listing();
    if rows.is_empty() {
        println!("  (empty)");
    }
    for row in &rows {
        println!("{}", format_row(row));
    }
}

fn format_row(row: &ListingRow) -> String {
    let name = if row.is_dir {
        format!("{}/", row.name)
    } else {
        row.name.clone()
    };
    let size = if row.accessible {
        format_size(row.size)
    } else {
        "unreadable".to_string()
    };
    format!(
        "  {:>10} {:>6.1}% {}  {}",
        size,
        row.percent_of_parent,
        percent_bar(row.percent_of_parent),
        shorten_tail(&name, NAME_WIDTH)
    )
}

fn print_top(session: &Session, n: usize) {
    let Some(tree) = session.tree() else {
        return;
    };
    let tree = tree.read();
    for file in top_files(&tree, n) {
        println!("  {:>10}  {}", format_size(file.size), file.path);
    }
}

fn remove(session: &mut Session, name: &str) {
    let Some(row) = session.listing().into_iter().find(|r| r.name == name) else {
        eprintln!("No entry named {name:?} here.");
        return;
    };
    let Some(path) = session.breadcrumb().and_then(|p| p.join(&row.name)) else {
        return;
    };
    if !ask(&format!("Delete {path} ({})?", format_size(row.size))) {
        return;
    }

    let confirm = Box::new(|prompt: &DeletionPrompt| ask(&prompt.message()));
    if let Err(err) = session.request_delete(row.node_index, confirm) {
        eprintln!("{err}");
        return;
    }
    let result = loop {
        if let Some(result) = session.process_delete_messages() {
            break result;
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    match result {
        Ok(DeleteOutcome::Trashed { freed, .. }) => {
            println!("Moved {path} to trash, {} freed.", format_size(freed))
        }
        Ok(DeleteOutcome::Deleted { freed, .. }) => {
            println!("Deleted {path}, {} freed.", format_size(freed))
        }
        Ok(DeleteOutcome::Aborted) => println!("Nothing deleted."),
        Err(err) => eprintln!("{err}"),
    }
    print_listing(session);
}
