use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};

pub struct OutputConfig {
    pub json: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub no_color: bool,
}

impl OutputConfig {
    pub fn from_global(json: bool, verbose: bool, quiet: bool, no_color: bool) -> Self {
        let no_color = no_color || std::env::var("NO_COLOR").is_ok() || !io::stdout().is_terminal();
        Self {
            json,
            verbose,
            quiet,
            no_color,
        }
    }

    pub fn is_tty(&self) -> bool {
        io::stdout().is_terminal()
    }

    /// Default log filter for the verbosity flags; `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    /// Print a status/confirmation message (suppressed in quiet mode).
    pub fn status(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    /// Print extra detail (only shown in verbose mode, suppressed in quiet mode).
    pub fn detail(&self, msg: &str) {
        if self.verbose && !self.quiet {
            println!("{msg}");
        }
    }

    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }

    /// Conversion progress bar on stderr, hidden for quiet and JSON output.
    pub fn progress_bar(&self) -> ProgressBar {
        if self.quiet || self.json {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(100);
        let template = if self.no_color {
            "[{elapsed_precise}] [{bar:40}] {pos:>3}% {msg}"
        } else {
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}"
        };
        pb.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    pub fn print_table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if rows.is_empty() {
            return;
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let aligned = self.is_tty() && !self.no_color;
        let render = |cells: Vec<&str>| -> String {
            if aligned {
                cells
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| format!("{c:<w$}"))
                    .collect::<Vec<_>>()
                    .join("  ")
            } else {
                cells.join("\t")
            }
        };

        println!("{}", render(headers.to_vec()));
        if aligned {
            let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            println!("{}", sep.join("  "));
        }
        for row in rows {
            println!("{}", render(row.iter().map(String::as_str).collect()));
        }
    }
}
