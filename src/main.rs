use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode},
    tty::IsTty,
};
use std::{
    error::Error,
    fs,
    io::{self, stdin, Write},
    path::PathBuf,
};
use tracing_subscriber::{fmt, EnvFilter};

use typedrill::{
    config::{Config, ConfigStore, FileConfigStore},
    problem::{EmbeddedProblems, ProblemId, ProblemStore},
    quota::{QuotaEnforcer, QuotaError, UserId},
    runtime::{ChannelEventSource, DriveOutcome, SessionDriver},
    session::{DurationBudget, TypingSession},
    text::ReferenceText,
};

/// practice typing out algorithm solutions against the clock
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type a reference solution from memory of your fingers: every keystroke is \
scored against the text, the clock runs for 60 or 120 seconds, and signed-in users get three \
recorded attempts per day."
)]
pub struct Cli {
    /// id of a built-in problem to drill (see --list)
    #[clap(short = 'p', long)]
    problem: Option<String>,

    /// path to a solution file to drill instead of a built-in problem
    #[clap(short = 'f', long)]
    solution: Option<PathBuf>,

    /// seconds on the clock, 60 or 120
    #[clap(short = 's', long)]
    secs: Option<u32>,

    /// user id to record the attempt under; omit to practice without recording
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// attempt store location override
    #[clap(long)]
    db: Option<PathBuf>,

    /// print today's quota status and exit
    #[clap(long)]
    status: bool,

    /// list built-in problems and exit
    #[clap(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = FileConfigStore::new().load();

    if cli.list {
        for id in EmbeddedProblems.ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let user = cli
        .user
        .clone()
        .or_else(|| config.user.clone())
        .map(UserId::new);

    if cli.status {
        let Some(user) = user else {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::MissingRequiredArgument, "--status needs --user")
                .exit();
        };
        let enforcer = open_enforcer(&cli, &config)?;
        let status = enforcer.quota_status(&user)?;
        println!(
            "{user}: {}/{} attempts used today, {} remaining",
            status.used,
            enforcer.cap(),
            status.remaining
        );
        return Ok(());
    }

    let budget = resolve_budget(&cli, &config);
    let (problem_id, reference) = resolve_reference(&cli)?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut enforcer = match &user {
        Some(_) => Some(open_enforcer(&cli, &config)?),
        None => None,
    };

    println!("problem: {problem_id}  clock: {budget}");
    if let (Some(user), Some(enforcer)) = (&user, &enforcer) {
        let status = enforcer.quota_status(user)?;
        if status.can_attempt {
            println!(
                "{user}: {} of {} recorded attempts left today",
                status.remaining,
                enforcer.cap()
            );
        } else {
            println!("{user}: daily limit reached, this run will not be recorded");
        }
    } else {
        println!("practicing without recording (pass --user to keep results)");
    }
    println!();
    println!("{reference}");
    println!();

    enable_raw_mode()?;
    let source = ChannelEventSource::from_terminal();
    let driver = SessionDriver::new(TypingSession::new(reference), source);
    let outcome = driver.run_with(budget, |session, _| draw_status_line(session));
    disable_raw_mode()?;
    println!();

    let result = match outcome {
        DriveOutcome::Canceled => {
            println!("attempt abandoned");
            return Ok(());
        }
        DriveOutcome::Finished(result) => result,
    };

    println!(
        "{} wpm  {}% accuracy  {}s  {}",
        result.wpm,
        result.accuracy,
        result.time_spent_secs,
        if result.completed {
            "solution completed"
        } else {
            "time expired"
        }
    );

    match (&user, &mut enforcer) {
        (Some(user), Some(enforcer)) => {
            match enforcer.try_record_attempt(user, &problem_id, &result) {
                Ok(record) => {
                    let status = enforcer.quota_status(user)?;
                    println!(
                        "recorded attempt #{} ({}/{} used today)",
                        record.id,
                        status.used,
                        enforcer.cap()
                    );
                }
                Err(err @ QuotaError::Exceeded { .. }) => {
                    println!("not recorded: {err}");
                }
                Err(err @ QuotaError::Store(_)) => {
                    println!("not recorded: {err}; your quota was not consumed, try again");
                }
            }
        }
        _ => println!("practice run, nothing recorded"),
    }

    Ok(())
}

fn resolve_budget(cli: &Cli, config: &Config) -> DurationBudget {
    match cli.secs {
        Some(secs) => DurationBudget::from_secs(secs).unwrap_or_else(|| {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::InvalidValue,
                format!("--secs must be 60 or 120, got {secs}"),
            )
            .exit();
        }),
        None => config.duration_budget(),
    }
}

fn resolve_reference(cli: &Cli) -> Result<(ProblemId, ReferenceText), Box<dyn Error>> {
    if let Some(path) = &cli.solution {
        let raw = fs::read_to_string(path)?;
        let id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("custom");
        return Ok((ProblemId::new(id), ReferenceText::normalize(&raw)));
    }

    let id = match &cli.problem {
        Some(problem) => ProblemId::new(problem.clone()),
        None => EmbeddedProblems
            .ids()
            .into_iter()
            .next()
            .ok_or("no built-in problems compiled in")?,
    };
    match EmbeddedProblems.solution(&id) {
        Some(text) => Ok((id, text)),
        None => {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::InvalidValue,
                format!("unknown problem '{id}', --list shows the built-in ids"),
            )
            .exit();
        }
    }
}

fn open_enforcer(cli: &Cli, config: &Config) -> Result<QuotaEnforcer, QuotaError> {
    match cli.db.clone().or_else(|| config.db_path.clone()) {
        Some(path) => QuotaEnforcer::open(path),
        None => QuotaEnforcer::open_default(),
    }
}

/// Single-line progress readout, redrawn in place while raw mode is on.
fn draw_status_line(session: &TypingSession) {
    print!(
        "\r{:>4}s  {:>4}/{} typed  {:>3} errors ",
        session.remaining_secs(),
        session.cursor(),
        session.reference().len(),
        session.error_count(),
    );
    let _ = io::stdout().flush();
}
