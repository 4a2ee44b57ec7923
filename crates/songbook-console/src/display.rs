use serde_json::{Value, json};
use songbook_core::{Music, PlannedOperation};

use crate::executor::CommandResult;

/// Output mode for rendering command results.
pub enum OutputMode {
    /// Human-readable pretty-printed output.
    Pretty,
    /// One JSON object per result on stdout.
    Json,
}

/// Render a command result to stdout in the given mode.
///
/// Returns `true` to continue execution, `false` to signal exit.
pub fn render(result: &CommandResult, mode: &OutputMode) -> bool {
    match result {
        CommandResult::Ok(msg) => match mode {
            OutputMode::Pretty => print_ok(msg),
            OutputMode::Json => println!("{}", json!({"ok": true, "message": msg})),
        },
        CommandResult::Saved(song) => match mode {
            OutputMode::Pretty => {
                print_ok("Saved.");
                print_song(song);
            }
            OutputMode::Json => println!("{}", json!({"ok": true, "item": song})),
        },
        CommandResult::Item(song) => match mode {
            OutputMode::Pretty => match song {
                Some(s) => print_song(s),
                None => println!("Song not found."),
            },
            OutputMode::Json => match song {
                Some(s) => println!("{}", json!({"found": true, "item": s})),
                None => println!("{}", json!({"found": false})),
            },
        },
        CommandResult::Items(songs) => match mode {
            OutputMode::Pretty => print_songs(songs),
            OutputMode::Json => {
                println!("{}", json!({"items": songs, "count": songs.len()}));
            }
        },
        CommandResult::Plan(op) => match mode {
            OutputMode::Pretty => print_plan(op),
            OutputMode::Json => println!("{}", plan_json(op)),
        },
        CommandResult::Count(n) => match mode {
            OutputMode::Pretty => println!("{n} song(s)."),
            OutputMode::Json => println!("{}", json!({"count": n})),
        },
        CommandResult::Help(topic) => match mode {
            OutputMode::Pretty => render_help_pretty(topic.as_deref()),
            OutputMode::Json => render_help_json(topic.as_deref()),
        },
        CommandResult::Exit => return false,
    }
    true
}

/// Render an error in the given mode (always to stderr).
pub fn render_error(err: &dyn std::fmt::Display, mode: &OutputMode) {
    match mode {
        OutputMode::Pretty => print_error(err),
        OutputMode::Json => {
            eprintln!("{}", json!({"error": err.to_string()}));
        }
    }
}

// ---- Pretty-print helpers ----

/// Pretty-print a single song with 2-space indentation.
pub fn print_song(song: &Music) {
    match serde_json::to_string_pretty(song) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error formatting song: {e}"),
    }
}

fn print_songs(songs: &[Music]) {
    for song in songs {
        print_song(song);
    }
    println!("{} song(s) returned.", songs.len());
}

fn print_plan(op: &PlannedOperation) {
    println!("Access path: {}", op.access_path());
    println!("Operation:   {op}");
}

fn plan_json(op: &PlannedOperation) -> Value {
    json!({
        "access_path": op.access_path(),
        "operation": op.to_string(),
        "filter": op.filter().map(|f| f.to_string()),
    })
}

pub fn print_ok(msg: &str) {
    println!("{msg}");
}

pub fn print_error(err: &dyn std::fmt::Display) {
    eprintln!("Error: {err}");
}

// ---------------------------------------------------------------------------
// Help
// ---------------------------------------------------------------------------

struct CommandHelp {
    name: &'static str,
    /// Lowercase lookup keys; the first is the canonical form.
    topics: &'static [&'static str],
    summary: &'static str,
    syntax: &'static str,
    details: &'static str,
    examples: &'static [&'static str],
}

const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "SAVE",
        topics: &["save"],
        summary: "Insert or replace a song",
        syntax: "SAVE {json}",
        details: "\
The document uses the song's attribute names: artist, songTitle, \
albumTitle, genre, year, quality and reviews.
songTitle is required. A missing artist is generated, and every song \
gets a surrogate id on its first save. Saving a song with an existing \
artist and songTitle replaces it entirely.",
        examples: &[
            r#"SAVE {"artist": "No one you know", "songTitle": "My Dog Spot", "year": 1984}"#,
            r#"SAVE {"songTitle": "Untitled", "reviews": [{"description": "ok", "rating": 3.5}]}"#,
        ],
    },
    CommandHelp {
        name: "GET",
        topics: &["get"],
        summary: "Fetch a single song by its key",
        syntax: "GET <artist> <songTitle>",
        details: "Quote values that contain spaces.",
        examples: &[r#"GET "No one you know" "My Dog Spot""#],
    },
    CommandHelp {
        name: "DELETE",
        topics: &["delete"],
        summary: "Remove a song by its key",
        syntax: "DELETE <artist> <songTitle>",
        details: "Deleting a song that does not exist succeeds.",
        examples: &[r#"DELETE "No one you know" "My Dog Spot""#],
    },
    CommandHelp {
        name: "FIND ALL",
        topics: &["find all"],
        summary: "List every song",
        syntax: "FIND ALL",
        details: "Reads the whole table. Fails when scans are disabled.",
        examples: &["FIND ALL"],
    },
    CommandHelp {
        name: "FIND BY",
        topics: &["find by", "find"],
        summary: "Find songs matching equality conditions",
        syntax: "FIND BY <attr> [=] <value> [AND <attr> <value>]... [ORDER BY <attr> [ASC|DESC]]",
        details: "\
The cheapest access path is picked from the bound attributes:
  artist and songTitle    key lookup
  artist                  partition query
  year                    year-index query (returns key attributes only)
  anything else           full table scan
Conditions the access path does not consume are applied as a filter.
ORDER BY is only allowed on songTitle with a partition query.",
        examples: &[
            r#"FIND BY artist "No one you know""#,
            r#"FIND BY artist "No one you know" ORDER BY songTitle DESC"#,
            "FIND BY year 1984",
            "FIND BY genre Country AND quality good",
        ],
    },
    CommandHelp {
        name: "EXPLAIN",
        topics: &["explain"],
        summary: "Show the planned store operation for a FIND BY",
        syntax: "EXPLAIN FIND BY ...",
        details: "Plans the query without touching the store.",
        examples: &[
            "EXPLAIN FIND BY year 1984",
            r#"EXPLAIN FIND BY artist "No one you know" AND genre Country"#,
        ],
    },
    CommandHelp {
        name: "COUNT",
        topics: &["count"],
        summary: "Count the songs in the table",
        syntax: "COUNT",
        details: "",
        examples: &["COUNT"],
    },
    CommandHelp {
        name: "HELP",
        topics: &["help"],
        summary: "Show the command overview or help for one command",
        syntax: "HELP [command]",
        details: "",
        examples: &["HELP", "HELP FIND BY"],
    },
    CommandHelp {
        name: "EXIT / QUIT",
        topics: &["exit", "quit"],
        summary: "Exit the console",
        syntax: "EXIT  (or QUIT)",
        details: "",
        examples: &["EXIT"],
    },
];

fn find_command(topic: &str) -> Option<&'static CommandHelp> {
    let lower = topic.trim().to_lowercase();
    COMMANDS
        .iter()
        .find(|cmd| cmd.topics.iter().any(|k| *k == lower))
}

fn render_help_pretty(topic: Option<&str>) {
    match topic {
        None => print_help_overview(),
        Some(t) => match find_command(t) {
            Some(cmd) => print_command_help(cmd),
            None => {
                println!("Unknown help topic '{t}'. Type HELP to see available commands.");
            }
        },
    }
}

fn print_help_overview() {
    println!("Songbook Console: Command Reference");
    println!();
    for cmd in COMMANDS {
        println!("  {:<14} {}", cmd.name, cmd.summary);
    }
    println!();
    println!("Type HELP <command> for detailed usage and examples.");
}

fn print_command_help(cmd: &CommandHelp) {
    println!("{}: {}", cmd.name, cmd.summary);
    println!();
    println!("Syntax:");
    println!("  {}", cmd.syntax);
    if !cmd.details.is_empty() {
        println!();
        println!("{}", cmd.details);
    }
    if !cmd.examples.is_empty() {
        println!();
        println!("Examples:");
        for ex in cmd.examples {
            println!("  {ex}");
        }
    }
}

fn render_help_json(topic: Option<&str>) {
    match topic {
        None => {
            let commands: Vec<Value> = COMMANDS
                .iter()
                .map(|cmd| json!({"name": cmd.name, "summary": cmd.summary}))
                .collect();
            println!("{}", json!({ "commands": commands }));
        }
        Some(t) => match find_command(t) {
            Some(cmd) => {
                println!(
                    "{}",
                    json!({
                        "command": cmd.name,
                        "summary": cmd.summary,
                        "syntax": cmd.syntax,
                        "details": cmd.details,
                        "examples": cmd.examples,
                    })
                );
            }
            None => {
                eprintln!("{}", json!({"error": format!("Unknown help topic '{t}'")}));
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use songbook_core::{CompositeKey, FilterExpr};

    #[test]
    fn test_find_command_topics() {
        assert_eq!(find_command("FIND BY").unwrap().name, "FIND BY");
        assert_eq!(find_command("find").unwrap().name, "FIND BY");
        assert_eq!(find_command(" quit ").unwrap().name, "EXIT / QUIT");
        assert!(find_command("scan").is_none());
    }

    #[test]
    fn test_every_command_has_a_topic() {
        for cmd in COMMANDS {
            assert!(!cmd.topics.is_empty(), "{} has no topics", cmd.name);
            assert_eq!(find_command(cmd.topics[0]).unwrap().name, cmd.name);
        }
    }

    #[test]
    fn test_plan_json() {
        let op = PlannedOperation::GetItem {
            key: CompositeKey::new("a", "b"),
            filter: Some(FilterExpr::attr_eq("genre", "Country")),
        };
        let v = plan_json(&op);
        assert_eq!(v["access_path"], "key");
        assert_eq!(v["operation"], op.to_string());
        assert_eq!(v["filter"], r#"genre = "Country""#);
    }

    #[test]
    fn test_render_exit_stops() {
        assert!(!render(&CommandResult::Exit, &OutputMode::Pretty));
        assert!(render(&CommandResult::Count(0), &OutputMode::Json));
    }
}
