//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the docqa CLI.

use crate::memory::Turn;
use crate::types::{RetrievalResult, ValidationError};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Characters of passage text shown per retrieval table row.
pub const SNIPPET_CHARS: usize = 200;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

/// Passage text on one line, cut to `max_chars` with a trailing ellipsis.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the session banner
    pub fn banner(&self, document: &str) {
        if self.colored {
            println!(
                "\n   {} {}",
                "docqa".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
            println!("   {} {}", "Document:".dimmed(), document.bright_white());
            println!(
                "   {}\n",
                "Type a question, 'reset' to clear history, 'quit' to leave.".dimmed()
            );
        } else {
            println!("\n   docqa v{}", env!("CARGO_PKG_VERSION"));
            println!("   Document: {}", document);
            println!("   Type a question, 'reset' to clear history, 'quit' to leave.\n");
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a step message (for multi-step operations)
    pub fn step(&self, step_num: u32, total: u32, message: &str) {
        if self.colored {
            println!(
                "  {} {}",
                format!("[{}/{}]", step_num, total).dimmed(),
                message.bright_white()
            );
        } else {
            println!("  [{}/{}] {}", step_num, total, message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print the question prompt and read one line.
    ///
    /// Returns `None` at end of input.
    pub fn prompt(&self) -> io::Result<Option<String>> {
        if self.colored {
            print!("{} ", "?".bright_yellow().bold());
        } else {
            print!("> ");
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input))
    }

    /// Print the surfaced answer for a turn.
    pub fn answer(&self, turn: &Turn) {
        let text = turn.surfaced();
        if self.colored && turn.is_refusal() {
            println!("\n{}\n", text.yellow());
        } else {
            println!("\n{}\n", text);
        }
    }

    /// Print retrieved passages in rank order.
    pub fn retrieval_table(&self, retrieved: &RetrievalResult) {
        self.header(&format!("Retrieved passages ({})", retrieved.len()));
        if retrieved.is_empty() {
            self.info("nothing retrieved");
            return;
        }

        let columns = format!(
            "{:<5} {:<8} {:<6} {:<6} {:<14} {}",
            "rank", "score", "page", "chunk", "citation", "text"
        );
        if self.colored {
            println!("    {}", columns.bright_white().bold());
            println!("    {}", "─".repeat(64).dimmed());
        } else {
            println!("    {}", columns);
            println!("    {}", "-".repeat(64));
        }

        for (rank, hit) in retrieved.iter().enumerate() {
            let passage = &hit.passage;
            let citation = passage.citation().to_string();
            let score = format!("{:.4}", hit.score);
            let text = snippet(&passage.text, SNIPPET_CHARS);
            if self.colored {
                println!(
                    "    {:<5} {:<8} {:<6} {:<6} {:<14} {}",
                    rank + 1,
                    score.bright_green(),
                    passage.page,
                    passage.id,
                    citation.cyan(),
                    text.dimmed()
                );
            } else {
                println!(
                    "    {:<5} {:<8} {:<6} {:<6} {:<14} {}",
                    rank + 1,
                    score,
                    passage.page,
                    passage.id,
                    citation,
                    text
                );
            }
        }
    }

    /// Explain why a generated answer was downgraded to a refusal.
    pub fn rejection(&self, reason: &ValidationError, raw_answer: &str) {
        self.warning(&format!("Answer rejected: {}", reason));
        self.header("Generated text");
        for line in raw_answer.lines() {
            if self.colored {
                println!("    {}", line.dimmed());
            } else {
                println!("    {}", line);
            }
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}
