use std::io::{self, Read, Write};
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;
use multi_translator_rust::{
    Config, ExecutionOutput, Generation, GenerationTracker, Language, Session, SourceLanguage,
    format_execution_output,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "multi-translator-rust",
    version,
    about = "Translate text by asking several services at once and keeping the best answer"
)]
struct Cli {
    /// Target language (ar, en, fr, es, de, it, ja, ko, zh; default from settings)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Source language. Use "auto" to detect.
    #[arg(short = 'L', long = "source-lang")]
    source_lang: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Show supported languages and exit
    #[arg(long = "show-enabled-languages")]
    show_enabled_languages: bool,

    /// Append every candidate's score to output
    #[arg(long = "with-scores")]
    with_scores: bool,

    /// Append the strategy that produced the output
    #[arg(long = "with-strategy")]
    with_strategy: bool,

    /// Fail each provider call with this probability (0..1)
    #[arg(long = "fault-rate")]
    fault_rate: Option<f64>,

    /// Use the bundled phrasebook only
    #[arg(long = "offline")]
    offline: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            lang: self.lang.clone(),
            source_lang: self.source_lang.clone(),
            settings_path: self.read_settings.clone(),
            show_enabled_languages: self.show_enabled_languages,
            with_scores: self.with_scores,
            with_strategy: self.with_strategy,
            fault_rate: self.fault_rate,
            offline: self.offline,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    multi_translator_rust::logging::init(cli.verbose)?;
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let input = if cli.show_enabled_languages {
        None
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| anyhow!("failed to read stdin as UTF-8 text: {}", err))?;
        Some(buffer)
    };

    let output = multi_translator_rust::run(cli.config(), input).await?;
    println!("{}", output);
    Ok(())
}

struct InteractiveState {
    session: Session,
    with_scores: bool,
    with_strategy: bool,
}

impl InteractiveState {
    fn new(cli: &Cli) -> Result<Self> {
        Ok(Self {
            session: Session::new(&cli.config())?,
            with_scores: cli.with_scores,
            with_strategy: cli.with_strategy,
        })
    }

    fn render(&self, output: &ExecutionOutput) -> String {
        format_execution_output(output, self.with_scores, self.with_strategy)
    }
}

type Finished = (Generation, Result<ExecutionOutput>);

/// Lines arriving closer together than this (a paste) collapse into the last.
const INPUT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Each submitted line supersedes the translation still in flight; lines
/// superseded during the debounce are never translated, and results of
/// lines superseded later are dropped when they arrive.
async fn run_interactive(cli: Cli) -> Result<()> {
    let mut state = InteractiveState::new(&cli)?;
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");

    let tracker = GenerationTracker::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Finished>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let input = line.trim();
                if input.is_empty() {
                    prompt()?;
                    continue;
                }
                if input.starts_with('/') {
                    match handle_interactive_command(input, &mut state) {
                        Ok(true) => return Ok(()),
                        Ok(false) => {}
                        Err(err) => eprintln!("{:#}", err),
                    }
                    prompt()?;
                    continue;
                }

                let generation = tracker.advance();
                let tracker = tracker.clone();
                let session = state.session.clone();
                let text = input.to_string();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if tracker.debounce(generation, INPUT_DEBOUNCE).await.is_none() {
                        debug!("skipping superseded input {:?}", text);
                        return;
                    }
                    let result = session.translate(&text).await;
                    let _ = tx.send((generation, result));
                });
            }
            Some(finished) = rx.recv() => {
                if show_finished(&state, &tracker, finished) {
                    prompt()?;
                }
            }
        }
    }

    // Input closed: let the latest translation finish before exiting.
    drop(tx);
    while let Some(finished) = rx.recv().await {
        show_finished(&state, &tracker, finished);
    }
    Ok(())
}

fn show_finished(state: &InteractiveState, tracker: &GenerationTracker, finished: Finished) -> bool {
    let (generation, result) = finished;
    match tracker.accept(generation, result) {
        None => {
            debug!("discarding superseded translation {}", generation);
            false
        }
        Some(Ok(output)) => {
            println!("{}", state.render(&output));
            true
        }
        Some(Err(err)) => {
            eprintln!("{:#}", err);
            true
        }
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/swap" {
        state.session.pair_mut().swap()?;
        let pair = state.session.pair();
        println!("languages: {} -> {}", pair.source, pair.target);
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/source-lang") {
        let value = arg.trim();
        if value.is_empty() {
            println!("source-lang: {}", state.session.pair().source);
        } else {
            state.session.pair_mut().source = value.parse::<SourceLanguage>()?;
            println!("source-lang set to {}", state.session.pair().source);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/lang") {
        let value = arg.trim();
        if value.is_empty() {
            println!("lang: {}", state.session.pair().target);
        } else {
            state.session.pair_mut().target = value.parse::<Language>()?;
            println!("lang set to {}", state.session.pair().target);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/with-scores") {
        state.with_scores = parse_toggle(arg, state.with_scores)?;
        println!("with-scores: {}", state.with_scores);
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/with-strategy") {
        state.with_strategy = parse_toggle(arg, state.with_strategy)?;
        println!("with-strategy: {}", state.with_strategy);
        return Ok(false);
    }

    Err(anyhow!("unknown command: {}", trimmed))
}

fn parse_toggle(arg: &str, current: bool) -> Result<bool> {
    let value = arg.trim();
    if value.is_empty() {
        return Ok(!current);
    }
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(anyhow!("expected on/off/true/false/1/0")),
    }
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit                 Exit interactive mode");
    println!("  /lang <code>                 Set target language (or show current)");
    println!("  /source-lang <code|auto>     Set source language (or show current)");
    println!("  /swap                        Swap source and target languages");
    println!("  /with-scores [on|off]        Toggle candidate scores in output");
    println!("  /with-strategy [on|off]      Toggle strategy line in output");
}
