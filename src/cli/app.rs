//! Main CLI application

use crate::config::{load_project, validate_config, Config};
use crate::runner::{BuildMode, Context, Executor, TaskRegistry, Verbosity};
use crate::server::{self, ServeOptions};
use crate::tasks;
use crate::watch::Watcher;
use anyhow::{anyhow, Context as _};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("brisk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Front-end asset build pipeline with a live-reload dev server")
        .arg(
            Arg::new("dir")
                .short('C')
                .long("dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Run as if started in DIR")
                .global(true),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to brisk.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print warnings and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new(tasks::DEFAULT).about("Production build (the default)"))
        .subcommand(
            Command::new(tasks::SERVE)
                .about("Development build, then serve with live reload and watch sources")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .value_parser(value_parser!(u16))
                        .help("Port for the dev server"),
                )
                .arg(
                    Arg::new("no-open")
                        .long("no-open")
                        .help("Do not open a browser")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run a single task by name")
                .arg(Arg::new("task").value_name("TASK").required(true)),
        )
        .subcommand(Command::new("list").about("List available tasks"))
        .subcommand(
            Command::new("completions")
                .about("Print shell completions")
                .arg(
                    Arg::new("shell")
                        .value_name("SHELL")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Load `.env` from the project root, if present
fn load_dotenv(root: &Path) {
    match dotenvy::from_path(root.join(".env")) {
        Ok(()) => debug!("loaded {}", root.join(".env").display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("ignoring .env: {}", e),
    }
}

/// Print registered tasks with their usage
fn print_tasks(registry: &TaskRegistry) {
    let width = registry.names().iter().map(String::len).max().unwrap_or(0);
    for name in registry.names() {
        let Some(usage) = registry.usage(name) else {
            continue;
        };
        let shape = registry.describe(name).unwrap_or_default();
        println!(
            "  {:<width$}  {}  {}",
            name.bold(),
            usage,
            shape.dimmed(),
            width = width
        );
    }
}

/// Run `task` and print its summary
async fn build(executor: &Executor, task: &str, verbosity: Verbosity) -> anyhow::Result<()> {
    let summary = executor.run(task).await?;
    if verbosity != Verbosity::Silent {
        summary.print();
    }
    summary.into_result()?;
    Ok(())
}

/// Initial development build, then serve and watch until Ctrl-C
async fn develop(
    executor: Arc<Executor>,
    config: &Config,
    root: PathBuf,
    matches: &ArgMatches,
    verbosity: Verbosity,
) -> anyhow::Result<()> {
    build(&executor, tasks::SERVE, verbosity).await?;

    let mut options = ServeOptions::from_config(root.clone(), &config.server, tasks::WATCHED_ASSETS);
    if let Some(port) = matches.get_one::<u16>("port") {
        options.port = *port;
    }
    if matches.get_flag("no-open") {
        options.open_browser = false;
    }

    let handle = server::serve(&options)
        .await
        .with_context(|| format!("failed to start the dev server on port {}", options.port))?;

    let watcher = Watcher::new(root, executor, tasks::watch_bindings())?
        .with_reload(&options.watched_assets, handle.server.clone())?;

    watcher
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    handle.shutdown();
    Ok(())
}

/// Execute parsed arguments
pub fn execute(matches: &ArgMatches) -> anyhow::Result<()> {
    let verbosity = get_verbosity(matches);
    crate::logging::init_logging(verbosity);

    if let Some(("completions", sub)) = matches.subcommand() {
        let shell = sub
            .get_one::<Shell>("shell")
            .copied()
            .ok_or_else(|| anyhow!("a shell is required"))?;
        clap_complete::generate(shell, &mut build_command(), "brisk", &mut std::io::stdout());
        return Ok(());
    }

    let start_dir = matches.get_one::<PathBuf>("dir").cloned();
    let file = matches.get_one::<PathBuf>("file").cloned();
    let (config, root) = load_project(start_dir, file)?;
    validate_config(&config)?;

    load_dotenv(&root);
    let mode = BuildMode::from_env();

    let registry = tasks::build_registry(&config)?;

    let (command, sub) = matches.subcommand().unwrap_or((tasks::DEFAULT, matches));
    if command == "list" {
        print_tasks(&registry);
        return Ok(());
    }

    let mut ctx = Context::new(root.clone()).with_mode(mode);
    if let Some(interpreter) = &config.interpreter {
        ctx = ctx.with_interpreter(interpreter.clone());
    }
    info!("Building {} in {} mode", root.display(), mode);
    let executor = Arc::new(Executor::new(registry, ctx));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    match command {
        tasks::SERVE => runtime.block_on(develop(executor, &config, root, sub, verbosity)),
        "run" => {
            let task = sub
                .get_one::<String>("task")
                .ok_or_else(|| anyhow!("a task name is required"))?;
            runtime.block_on(build(&executor, task, verbosity))
        }
        _ => runtime.block_on(build(&executor, tasks::DEFAULT, verbosity)),
    }
}

/// Run the CLI application with process arguments
pub fn run() -> anyhow::Result<()> {
    let matches = build_command().get_matches();
    execute(&matches)
}
