//! Home navigation agent CLI.
//!
//! Plans a list of tasks into named locations and walks the agent there step
//! by step. Configuration lives in `navigator.toml`; without it the built-in
//! six-room layout and offline keyword planning are used.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use navigator::core::invariants::validate_trace;
use navigator::core::routines::Routine;
use navigator::core::types::SessionTrace;
use navigator::exit_codes;
use navigator::io::config::{DEFAULT_CONFIG_FILE, NavConfig, load_config, write_config};
use navigator::io::llm::{ChatClient, HttpChatClient, OfflineChatClient};
use navigator::io::trace_log::{load_trace, write_trace};
use navigator::logging;
use navigator::session::NavigationSession;

#[derive(Parser)]
#[command(
    name = "navigator",
    version,
    about = "Plan tasks into locations and walk a home agent through them"
)]
struct Cli {
    /// Config file (TOML). Missing file means built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the configured locations.
    Locations,
    /// Print the plan for the given tasks as JSON.
    Plan(TaskArgs),
    /// Plan and execute, printing one line per location.
    Run {
        #[command(flatten)]
        tasks: TaskArgs,
        /// Write the session trace as JSON to this path.
        #[arg(long)]
        trace: Option<PathBuf>,
    },
    /// Check a saved session trace against movement invariants.
    Validate {
        /// Trace file written by `navigator run --trace`.
        trace: PathBuf,
    },
    /// Write the default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
struct TaskArgs {
    /// Natural-language tasks, in order.
    #[arg(conflicts_with = "routine")]
    tasks: Vec<String>,
    /// Use a predefined routine instead of explicit tasks.
    #[arg(long)]
    routine: Option<Routine>,
    /// Skip the model and plan with keyword rules only.
    #[arg(long)]
    offline: bool,
}

impl TaskArgs {
    fn task_list(&self) -> Vec<String> {
        match self.routine {
            Some(routine) => routine.task_list(),
            None => self.tasks.clone(),
        }
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Locations => cmd_locations(&cli.config),
        Command::Plan(args) => cmd_plan(&cli.config, &args),
        Command::Run { tasks, trace } => cmd_run(&cli.config, &tasks, trace.as_deref()),
        Command::Validate { trace } => cmd_validate(&trace),
        Command::Init { force } => cmd_init(&cli.config, force),
    }
}

fn cmd_locations(config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    for location in config.registry()?.iter() {
        println!("{}\t{}", location.name, location.position);
    }
    Ok(exit_codes::OK)
}

fn cmd_plan(config_path: &Path, args: &TaskArgs) -> Result<i32> {
    let config = load_config(config_path)?;
    let session = NavigationSession::from_config(&config, chat_client(&config, args.offline)?)?;
    let plan = session.plan(&args.task_list());
    println!(
        "{}",
        serde_json::to_string_pretty(&plan).context("serialize plan")?
    );
    Ok(exit_codes::OK)
}

fn cmd_run(config_path: &Path, args: &TaskArgs, trace_path: Option<&Path>) -> Result<i32> {
    let config = load_config(config_path)?;
    let session = NavigationSession::from_config(&config, chat_client(&config, args.offline)?)?;
    let trace = session.run(&args.task_list());

    print_summary(&trace);
    if let Some(path) = trace_path {
        write_trace(path, &trace)?;
        debug!(path = %path.display(), "wrote session trace");
    }

    if trace.all_reached() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::INCOMPLETE)
    }
}

fn cmd_validate(trace_path: &Path) -> Result<i32> {
    let trace = load_trace(trace_path)?;
    let errors = validate_trace(&trace);
    if !errors.is_empty() {
        eprintln!("invariant violations:\n- {}", errors.join("\n- "));
        return Ok(exit_codes::INVALID);
    }
    println!(
        "ok: {} outcomes, {} reached",
        trace.outcomes.len(),
        trace.reached_count()
    );
    Ok(exit_codes::OK)
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        );
    }
    write_config(config_path, &NavConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn chat_client(config: &NavConfig, offline: bool) -> Result<Box<dyn ChatClient>> {
    if offline {
        return Ok(Box::new(OfflineChatClient));
    }
    match HttpChatClient::from_config(&config.llm)? {
        Some(client) => Ok(Box::new(client)),
        None => Ok(Box::new(OfflineChatClient)),
    }
}

fn print_summary(trace: &SessionTrace) {
    println!(
        "plan ({}): {}",
        trace.plan.source.as_str(),
        trace.plan.locations.join(" -> ")
    );
    for outcome in &trace.outcomes {
        println!(
            "{}: {} in {} steps, now at {}",
            outcome.location,
            outcome.status.as_str(),
            outcome.step_count,
            outcome.end
        );
    }
    println!(
        "reached {}/{} locations",
        trace.reached_count(),
        trace.outcomes.len()
    );
}
