//! focusclock - recurring alarms and a focus countdown
//!
//! The daemon keeps alarms scheduled and drives the countdown; every other
//! command talks to it over a Unix socket:
//! - `focusclock daemon` runs the daemon in the foreground
//! - `focusclock alarm ...` manages alarms
//! - `focusclock timer ...` controls the countdown

use anyhow::Result;
use clap::{CommandFactory, Parser};

use focusclock::cli::{
    AlarmCommand, Cli, Commands, DaemonArgs, Display, IpcClient, TaskCommand, TimerCommand,
};
use focusclock::config::{default_data_dir, AppConfig};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Alarm(command)) => {
            let client = client_for(cli.socket)?;
            run_alarm_command(&client, command).await?;
        }
        Some(Commands::Timer(command)) => {
            let client = client_for(cli.socket)?;
            run_timer_command(&client, command).await?;
        }
        Some(Commands::Daemon(args)) => {
            let config = daemon_config(&args, cli.socket)?;
            focusclock::daemon::run(config).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

async fn run_alarm_command(client: &IpcClient, command: AlarmCommand) -> Result<()> {
    match command {
        AlarmCommand::Add(args) => {
            let response = client.alarm_add(args.to_params()).await?;
            Display::show_alarm_result(&response);
        }
        AlarmCommand::List => {
            let response = client.alarm_list().await?;
            Display::show_alarm_list(&response);
        }
        AlarmCommand::Edit(args) => {
            let response = client.alarm_edit(args.id, args.to_params()).await?;
            Display::show_alarm_result(&response);
        }
        AlarmCommand::On { id } => {
            let response = client.alarm_set_active(id, true).await?;
            Display::show_alarm_result(&response);
        }
        AlarmCommand::Off { id } => {
            let response = client.alarm_set_active(id, false).await?;
            Display::show_alarm_result(&response);
        }
        AlarmCommand::Delete { id } => {
            let response = client.alarm_delete(id).await?;
            Display::show_alarm_result(&response);
        }
        AlarmCommand::Stop { id } => {
            let response = client.alarm_stop(id).await?;
            Display::show_alarm_result(&response);
        }
        AlarmCommand::Snooze { id } => {
            let response = client.alarm_snooze(id).await?;
            Display::show_alarm_result(&response);
        }
    }
    Ok(())
}

async fn run_timer_command(client: &IpcClient, command: TimerCommand) -> Result<()> {
    match command {
        TimerCommand::Start(args) => {
            let response = client.timer_start(args.to_millis()).await?;
            Display::show_timer_result(&response);
        }
        TimerCommand::Pause => {
            let response = client.timer_pause().await?;
            Display::show_timer_result(&response);
        }
        TimerCommand::Resume => {
            let response = client.timer_resume().await?;
            Display::show_timer_result(&response);
        }
        TimerCommand::Stop => {
            let response = client.timer_stop().await?;
            Display::show_timer_result(&response);
        }
        TimerCommand::Status => {
            let response = client.timer_status().await?;
            Display::show_timer_status(&response);
        }
        TimerCommand::ResetCycles => {
            let response = client.timer_reset_cycles().await?;
            Display::show_timer_result(&response);
        }
        TimerCommand::Config(args) => {
            let response = client.timer_configure(args.to_params()).await?;
            Display::show_settings(&response);
        }
        TimerCommand::Task(command) => run_task_command(client, command).await?,
    }
    Ok(())
}

async fn run_task_command(client: &IpcClient, command: TaskCommand) -> Result<()> {
    let response = match command {
        TaskCommand::Add(args) => client.task_add(args.title, args.estimate).await?,
        TaskCommand::List => {
            let response = client.task_list().await?;
            Display::show_task_list(&response);
            return Ok(());
        }
        TaskCommand::Select { id } => client.task_select(Some(id)).await?,
        TaskCommand::Unselect => client.task_select(None).await?,
        TaskCommand::Done { id, undo } => client.task_complete(id, !undo).await?,
        TaskCommand::Delete { id } => client.task_delete(id).await?,
    };
    Display::show_task_result(&response);
    Ok(())
}

/// Builds a client for the given socket, or the one in the data directory.
fn client_for(socket: Option<std::path::PathBuf>) -> Result<IpcClient> {
    let socket = match socket {
        Some(path) => path,
        None => AppConfig::load(default_data_dir())?.socket_path(),
    };
    Ok(IpcClient::with_socket_path(socket))
}

fn daemon_config(args: &DaemonArgs, socket: Option<std::path::PathBuf>) -> Result<AppConfig> {
    let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    let mut config = AppConfig::load(data_dir)?;
    if let Some(socket) = socket {
        config = config.with_socket(socket);
    }
    if args.mute {
        config = config.with_mute(true);
    }
    Ok(config)
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
