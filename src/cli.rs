// src/cli.rs
// Command line surface: arguments, input gathering, terminal rendering

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use fixfast::agent::RunEvent;
use fixfast::config::Overrides;
use fixfast::model::Environment;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

const BANNER: &str = r#"
 _____ _        _____         _
|  ___(_)_  __ |  ___|_ _ ___| |_
| |_  | \ \/ / | |_ / _` / __| __|
|  _| | |>  <  |  _| (_| \__ \ |_
|_|   |_/_/\_\ |_|  \__,_|___/\__|

Fix Fast Agent - regression detection, triage and attribution"#;

#[derive(Parser)]
#[command(name = "fixfast")]
#[command(about = "Regression triage agent: detect, triage, attribute, fix")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Bug description; a trailing environment name tags where it was detected
    #[arg(trailing_var_arg = true)]
    pub words: Vec<String>,

    /// Where the issue was detected (ide, local_test, ci, code_review, staging, production)
    #[arg(long, value_parser = parse_environment)]
    pub env: Option<Environment>,

    /// LLM provider (anthropic, openai, deepseek)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model name for the selected provider
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Tool rounds before a final answer is forced (0 = no cap)
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// TOML file overriding the built-in lookup tables
    #[arg(long, global = true)]
    pub tables: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a tool directly, without a model
    Tool {
        /// Tool name (e.g. detect_regression, triage_issue)
        #[arg(index = 1)]
        name: String,

        /// JSON arguments (e.g. '{"description": "NPE in login"}')
        #[arg(index = 2, default_value = "{}")]
        args: String,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            provider: self.provider.clone(),
            model: self.model.clone(),
            max_rounds: self.max_rounds,
            tables: self.tables.clone(),
        }
    }
}

fn parse_environment(s: &str) -> std::result::Result<Environment, String> {
    Environment::parse(s).ok_or_else(|| {
        let names: Vec<&str> = Environment::ALL.iter().map(|e| e.as_str()).collect();
        format!("unknown environment '{}' (expected one of: {})", s, names.join(", "))
    })
}

// ============================================================================
// Input
// ============================================================================

/// Where the bug description came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Args,
    Pipe,
    Interactive,
}

/// Resolve the run input from arguments, a pipe, or an interactive prompt
pub fn gather_input(cli: &Cli) -> Result<(String, InputSource)> {
    let (text, detected, source) = if !cli.words.is_empty() {
        let (text, env) = split_environment(&cli.words);
        (text, env, InputSource::Args)
    } else if !io::stdin().is_terminal() {
        let text = read_piped(io::stdin().lock())?;
        (text, None, InputSource::Pipe)
    } else {
        print_banner();
        let mut stdout = io::stdout();
        let (text, env) = read_interactive(&mut io::stdin().lock(), &mut stdout)?;
        (text, Some(env), InputSource::Interactive)
    };

    if text.trim().is_empty() {
        bail!("no input provided. Run with --help for usage.");
    }
    Ok((tag_environment(&text, cli.env.or(detected)), source))
}

/// Split a trailing environment name off the positional words.
/// A single word is always the description.
pub fn split_environment(words: &[String]) -> (String, Option<Environment>) {
    if let [rest @ .., last] = words
        && !rest.is_empty()
        && let Some(env) = Environment::parse(last)
    {
        return (rest.join(" "), Some(env));
    }
    (words.join(" "), None)
}

pub fn tag_environment(input: &str, env: Option<Environment>) -> String {
    match env {
        Some(env) => format!("[Detected in: {}]\n\n{}", env, input),
        None => input.to_string(),
    }
}

pub fn read_piped(reader: impl BufRead) -> io::Result<String> {
    let lines = reader.lines().collect::<io::Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

/// Read description lines until a blank line, then ask for the environment
pub fn read_interactive(
    reader: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<(String, Environment)> {
    write!(
        out,
        "Describe the bug or paste a diff (press Enter twice when done):\n> "
    )?;
    out.flush()?;

    let mut lines: Vec<String> = Vec::new();
    let mut buf = String::new();
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\r', '\n']);
        if line.is_empty() && !lines.is_empty() {
            break;
        }
        lines.push(line.to_string());
    }

    writeln!(out, "\nWhere was this issue detected?")?;
    for (i, env) in Environment::ALL.iter().enumerate() {
        writeln!(out, "  {}) {}", i + 1, env)?;
    }
    write!(out, "> ")?;
    out.flush()?;

    buf.clear();
    reader.read_line(&mut buf)?;
    Ok((lines.join("\n"), choose_environment(&buf)))
}

/// Menu number or environment name; anything else means production
pub fn choose_environment(choice: &str) -> Environment {
    let choice = choice.trim();
    if let Ok(n) = choice.parse::<usize>()
        && let Some(env) = n.checked_sub(1).and_then(|i| Environment::ALL.get(i))
    {
        return *env;
    }
    Environment::parse(choice).unwrap_or(Environment::Production)
}

pub fn print_banner() {
    println!("{}\n", BANNER);
}

// ============================================================================
// Output
// ============================================================================

/// Print run events to stdout until the sender side closes
pub fn spawn_renderer(mut rx: UnboundedReceiver<RunEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(event) = rx.recv().await {
            if render_event(&event, &mut stdout).is_err() {
                break;
            }
        }
    })
}

pub fn render_event(event: &RunEvent, out: &mut impl Write) -> io::Result<()> {
    match event {
        RunEvent::Started => writeln!(out, "\n--- Fix Fast Agent Running ---\n")?,
        RunEvent::Text(text) => write!(out, "{}", text)?,
        RunEvent::ToolStarted { name, .. } => write!(out, "\n\n[tool: {}]\n", name)?,
        RunEvent::ToolFinished {
            output,
            is_error: false,
            ..
        } => writeln!(out, "{}", pretty_json(output))?,
        RunEvent::ToolFinished { output, .. } => writeln!(out, "[tool error: {}]", output)?,
        RunEvent::RoundLimitReached { rounds } => write!(
            out,
            "\n\n[round limit reached after {} rounds; requesting final report]\n",
            rounds
        )?,
        RunEvent::Completed => writeln!(out, "\n\n--- Analysis Complete ---")?,
    }
    out.flush()
}

/// Pretty-print a JSON payload, or pass it through unchanged
pub fn pretty_json(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_trailing_environment_is_split_off() {
        let (text, env) = split_environment(&words("null pointer in db/user.go Staging"));
        assert_eq!(text, "null pointer in db/user.go");
        assert_eq!(env, Some(Environment::Staging));
    }

    #[test]
    fn test_single_word_is_description() {
        let (text, env) = split_environment(&words("production"));
        assert_eq!(text, "production");
        assert_eq!(env, None);
    }

    #[test]
    fn test_no_environment_keeps_all_words() {
        let (text, env) = split_environment(&words("slow query after migration"));
        assert_eq!(text, "slow query after migration");
        assert_eq!(env, None);
    }

    #[test]
    fn test_tag_environment() {
        assert_eq!(
            tag_environment("NPE", Some(Environment::Ci)),
            "[Detected in: ci]\n\nNPE"
        );
        assert_eq!(tag_environment("NPE", None), "NPE");
    }

    #[test]
    fn test_read_piped_joins_lines() {
        let text = read_piped(Cursor::new("panic: nil map\nat handler.go:12\n")).unwrap();
        assert_eq!(text, "panic: nil map\nat handler.go:12");
    }

    #[test]
    fn test_interactive_reads_until_blank_line() {
        let mut input = Cursor::new("crash in auth\n\nstack trace here\n\n3\n");
        let mut out = Vec::new();
        let (text, env) = read_interactive(&mut input, &mut out).unwrap();
        assert_eq!(text, "crash in auth");
        // The line after the blank is taken as the menu choice
        assert_eq!(env, Environment::Production);

        let mut input = Cursor::new("\ncrash in auth\n\n3\n");
        let (text, env) = read_interactive(&mut input, &mut Vec::new()).unwrap();
        assert_eq!(text, "\ncrash in auth");
        assert_eq!(env, Environment::Ci);

        let menu = String::from_utf8(out).unwrap();
        assert!(menu.contains("  6) production"));
    }

    #[test]
    fn test_choose_environment() {
        assert_eq!(choose_environment("1"), Environment::Ide);
        assert_eq!(choose_environment(" staging \n"), Environment::Staging);
        assert_eq!(choose_environment("0"), Environment::Production);
        assert_eq!(choose_environment("9"), Environment::Production);
        assert_eq!(choose_environment(""), Environment::Production);
    }

    #[test]
    fn test_parse_environment_flag() {
        assert_eq!(parse_environment("code_review"), Ok(Environment::CodeReview));
        assert!(parse_environment("qa").unwrap_err().contains("local_test"));
    }

    #[test]
    fn test_cli_parses_subcommand_and_words() {
        let cli = Cli::parse_from(["fixfast", "tool", "triage_issue", "{}"]);
        assert!(matches!(cli.command, Some(Commands::Tool { ref name, .. }) if name == "triage_issue"));

        let cli = Cli::parse_from(["fixfast", "--max-rounds", "3", "NPE", "in", "login", "ci"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.words, words("NPE in login ci"));
        assert_eq!(cli.overrides().max_rounds, Some(3));
    }

    #[test]
    fn test_render_events() {
        let mut out = Vec::new();
        render_event(&RunEvent::Started, &mut out).unwrap();
        render_event(
            &RunEvent::ToolStarted {
                id: "c1".into(),
                name: "triage_issue".into(),
            },
            &mut out,
        )
        .unwrap();
        render_event(
            &RunEvent::ToolFinished {
                id: "c1".into(),
                name: "triage_issue".into(),
                output: r#"{"priority":"P1"}"#.into(),
                is_error: false,
            },
            &mut out,
        )
        .unwrap();
        render_event(
            &RunEvent::ToolStarted {
                id: "c2".into(),
                name: "nope".into(),
            },
            &mut out,
        )
        .unwrap();
        render_event(
            &RunEvent::ToolFinished {
                id: "c2".into(),
                name: "nope".into(),
                output: "unknown tool: nope".into(),
                is_error: true,
            },
            &mut out,
        )
        .unwrap();
        render_event(&RunEvent::Completed, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("--- Fix Fast Agent Running ---"));
        assert!(text.contains("[tool: triage_issue]\n{\n  \"priority\": \"P1\"\n}"));
        assert!(text.contains("\n\n[tool: nope]\n[tool error: unknown tool: nope]\n"));
        assert!(text.ends_with("--- Analysis Complete ---\n"));
    }

    #[test]
    fn test_pretty_json_passthrough() {
        assert_eq!(pretty_json("not json"), "not json");
    }
}
