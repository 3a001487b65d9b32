use clap::Parser;
use std::io::IsTerminal;
use task_engine::cli::{Cli, Commands};
use task_engine::cli_handlers::task_commands::build_patch;
use task_engine::cli_handlers::{
    handle_add, handle_delete, handle_list, handle_shell, handle_show, handle_stats,
    handle_update, handle_watch,
};
use task_engine::config::EngineConfig;
use task_engine::error::{ErrorResponse, Result};
use task_engine::logging::{log_file_path, ApplicationMode, LoggingConfig};

#[tokio::main]
async fn main() {
    // Parse CLI arguments first to get logging configuration
    let cli = Cli::parse();

    let mut log_config = LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json);

    // `watch` is long-running; when its stdout is redirected, lifecycle
    // logs go to a file instead of interleaving with the summaries
    if matches!(cli.command, Commands::Watch { .. })
        && !cli.quiet
        && (std::env::var("TASK_ENGINE_WATCH_LOG_FILE").is_ok() || !std::io::stdout().is_terminal())
    {
        log_config = LoggingConfig::for_mode(ApplicationMode::Watch);
        log_config.file_output = log_file_path(ApplicationMode::Watch);
    }

    if let Err(e) = task_engine::logging::init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli).await {
        print_error(&e.to_error_response());
        std::process::exit(1);
    }
}

fn print_error(response: &ErrorResponse) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}: {}", response.code, response.error),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let mut config = EngineConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }

    match cli.command.clone() {
        Commands::List { sort, format } => handle_list(&config, sort.as_deref(), &format).await?,

        Commands::Show { id, format } => handle_show(&config, &id, &format).await?,

        Commands::Add {
            title,
            description,
            assignee,
            status,
            format,
        } => {
            handle_add(
                &config,
                title,
                description,
                assignee,
                status.as_deref(),
                &format,
            )
            .await?
        },

        Commands::Update {
            id,
            title,
            description,
            assignee,
            status,
            format,
        } => {
            let patch = build_patch(title, description, assignee, status.as_deref())?;
            handle_update(&config, &id, patch, &format).await?
        },

        Commands::Delete { id } => handle_delete(&config, &id).await?,

        Commands::Stats { format } => handle_stats(&config, &format).await?,

        Commands::Watch { notify_url } => handle_watch(&config, notify_url).await?,

        Commands::Shell {
            notify_url,
            no_listen,
        } => handle_shell(&config, notify_url, no_listen).await?,
    }

    Ok(())
}
