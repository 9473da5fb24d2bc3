//! Amble - Daily exercise guidance for cancer recovery.
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use amble::config::{crash_log_path, Config};
use amble::error::exit_codes;
use amble::storage::FileStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// Amble - Daily exercise guidance for cancer recovery
#[derive(Parser)]
#[command(name = "amble")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Patient] Submit today's check-in and get the day's guidance
    Checkin {
        /// User the check-in belongs to
        user: String,
        /// Energy score, 0-10
        #[arg(long, short)]
        energy: i64,
        /// Pain score, 0-10
        #[arg(long, short)]
        pain: i64,
        /// Confidence score, 0-10
        #[arg(long, short)]
        confidence: i64,
        /// Side effect id (repeatable)
        #[arg(long = "side-effect")]
        side_effects: Vec<String>,
        /// Red flag id (repeatable)
        #[arg(long = "red-flag")]
        red_flags: Vec<String>,
        /// Free-text note
        #[arg(long)]
        notes: Option<String>,
        /// Day to check in for (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Patient] Show the day at a glance: status, session mode, and plan
    Today {
        /// User to show
        user: String,
        /// Day to show (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Patient] Show the day's activity plan, generating it on first request
    Plan {
        /// User the plan belongs to
        user: String,
        /// Day to plan for (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Patient/System] Report the recovery phase, optionally evaluating first
    Phase {
        /// User to report on
        user: String,
        /// Run a fresh evaluation before reporting
        #[arg(long)]
        evaluate: bool,
        /// Include recorded phase changes
        #[arg(long)]
        history: bool,
        /// Day to evaluate as of (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [System] Scan recent check-ins for multi-day warning patterns
    Patterns {
        /// User to scan
        user: String,
        /// Day to scan as of (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Coach] List coach alerts or acknowledge one
    Alerts {
        /// Only list alerts with this status (pending, sent, acknowledged)
        #[arg(long, short)]
        status: Option<String>,
        /// Acknowledge this alert instead of listing
        #[arg(long)]
        ack: Option<u64>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Patient] Record session completions, feedback, and seen-markers
    Session {
        #[command(subcommand)]
        action: SessionAction,
        /// Output as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress output
        #[arg(long, short, global = true)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Record a completed session
    Complete {
        /// User the session belongs to
        user: String,
    },
    /// Record how the last session felt
    Feedback {
        /// User the feedback belongs to
        user: String,
        /// comfortable, a_bit_tiring, or too_much
        rating: String,
    },
    /// Mark the latest phase change as seen in the app
    SeenPhase {
        /// User to mark
        user: String,
    },
    /// Mark the progress reflection as seen in the app
    SeenReflection {
        /// User to mark
        user: String,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    // Set up panic handler
    setup_panic_handler();

    // Run the CLI
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("amble error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to the crash log under the Amble home and exits with
/// code 3 so wrappers can tell a crash apart from a failed command.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        // Log to stderr
        eprintln!("amble panic: {}", info);

        // Try to log to crash file
        if let Some(crash_log) = crash_log_path() {
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Checkin {
            user,
            energy,
            pain,
            confidence,
            side_effects,
            red_flags,
            notes,
            date,
            json,
            quiet,
        } => run_checkin(
            &user,
            energy,
            pain,
            confidence,
            side_effects,
            red_flags,
            notes,
            date,
            json,
            quiet,
        ),
        Commands::Today {
            user,
            date,
            json,
            quiet,
        } => run_today(&user, date, json, quiet),
        Commands::Plan {
            user,
            date,
            json,
            quiet,
        } => run_plan(&user, date, json, quiet),
        Commands::Phase {
            user,
            evaluate,
            history,
            date,
            json,
            quiet,
        } => run_phase(&user, evaluate, history, date, json, quiet),
        Commands::Patterns {
            user,
            date,
            json,
            quiet,
        } => run_patterns(&user, date, json, quiet),
        Commands::Alerts {
            status,
            ack,
            json,
            quiet,
        } => run_alerts(status, ack, json, quiet),
        Commands::Session {
            action,
            json,
            quiet,
        } => run_session(action, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::OK as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

/// Open the file store at the configured data directory.
fn open_store(config: &Config) -> Result<FileStore, Box<dyn std::error::Error>> {
    let store = match config.storage.resolved_data_dir() {
        Some(dir) => FileStore::with_dir(dir)?,
        None => FileStore::new()?,
    };
    Ok(store)
}

#[allow(clippy::too_many_arguments)]
fn run_checkin(
    user: &str,
    energy: i64,
    pain: i64,
    confidence: i64,
    side_effects: Vec<String>,
    red_flags: Vec<String>,
    notes: Option<String>,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use amble::cli::checkin::{CheckinCommand, CheckinOptions};
    use amble::core::CheckinInput;

    let config = Config::load();
    let store = open_store(&config)?;

    let now = Utc::now();
    let date = date.unwrap_or_else(|| now.date_naive());
    let input = CheckinInput {
        energy,
        pain,
        confidence,
        side_effects,
        red_flags,
        notes,
    };

    let cmd = CheckinCommand::new(store, config);
    let options = CheckinOptions { json, quiet };

    let output = cmd.run(user, date, &input, now, &options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_today(
    user: &str,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use amble::cli::today::{TodayCommand, TodayOptions};

    let config = Config::load();
    let store = open_store(&config)?;

    let now = Utc::now();
    let date = date.unwrap_or_else(|| now.date_naive());

    let cmd = TodayCommand::new(store, config);
    let options = TodayOptions { json, quiet };

    let output = cmd.run(user, date, now, &options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_plan(
    user: &str,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use amble::cli::plan::{PlanCommand, PlanOptions};

    let config = Config::load();
    let store = open_store(&config)?;

    let now = Utc::now();
    let date = date.unwrap_or_else(|| now.date_naive());

    let cmd = PlanCommand::new(store, config);
    let options = PlanOptions { json, quiet };

    let output = cmd.run(user, date, now, &options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_phase(
    user: &str,
    evaluate: bool,
    history: bool,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use amble::cli::phase::{PhaseCommand, PhaseOptions};

    let config = Config::load();
    let store = open_store(&config)?;

    let now = Utc::now();
    let date = date.unwrap_or_else(|| now.date_naive());

    let cmd = PhaseCommand::new(store, config);
    let options = PhaseOptions {
        json,
        quiet,
        evaluate,
        history,
    };

    let output = cmd.run(user, date, now, &options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_patterns(
    user: &str,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use amble::cli::patterns::{PatternsCommand, PatternsOptions};

    let config = Config::load();
    let store = open_store(&config)?;

    let now = Utc::now();
    let date = date.unwrap_or_else(|| now.date_naive());

    let cmd = PatternsCommand::new(store, config);
    let options = PatternsOptions { json, quiet };

    let output = cmd.run(user, date, now, &options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_alerts(
    status: Option<String>,
    ack: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use amble::cli::alerts::{AlertsCommand, AlertsOptions};

    let config = Config::load();
    let store = open_store(&config)?;

    let cmd = AlertsCommand::new(store, config);
    let options = AlertsOptions {
        json,
        quiet,
        status,
        ack,
    };

    let output = cmd.run(&options);
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_session(
    action: SessionAction,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use amble::cli::session::{SessionCommand, SessionOptions};

    let config = Config::load();
    let store = open_store(&config)?;

    let now = Utc::now();
    let cmd = SessionCommand::new(store, config);
    let options = SessionOptions { json, quiet };

    let output = match &action {
        SessionAction::Complete { user } => cmd.complete(user, now, &options),
        SessionAction::Feedback { user, rating } => {
            cmd.feedback(user, rating, now.date_naive(), now, &options)
        }
        SessionAction::SeenPhase { user } => cmd.seen_phase(user, now, &options),
        SessionAction::SeenReflection { user } => cmd.seen_reflection(user, now, &options),
    };
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}
