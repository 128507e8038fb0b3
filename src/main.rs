//! Entry point for chatapp-mcp.
use std::process::ExitCode;

use chatapp_mcp::{
    cli::{execute_cli_command, CliCommand, LaunchProfile, LaunchProfileArgs, ParsedCommand},
    lib::telemetry,
    server::{
        config::ServerConfig,
        runtime::{self, RuntimeExit, EXIT_FAILURE},
    },
};
use clap::Parser;

fn main() -> ExitCode {
    let args = match LaunchProfileArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start the async runtime: {err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let code = runtime.block_on(async {
        match bootstrap(args).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(exit) => exit.report(),
        }
    });
    // The stdio reader blocks on stdin and cannot be cancelled; don't wait for it.
    runtime.shutdown_background();
    code
}

async fn bootstrap(args: LaunchProfileArgs) -> Result<(), RuntimeExit> {
    telemetry::init_tracing(args.log_format).map_err(RuntimeExit::from_error)?;
    let command = args.into_command().map_err(RuntimeExit::from_error)?;

    match command {
        ParsedCommand::RunServer(profile) => run_server(profile).await,
        ParsedCommand::Cli(command) => handle_cli_command(command),
    }
}

async fn run_server(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    let config = ServerConfig::load(
        profile.config_path.clone(),
        profile.config_source.file_required(),
    )
    .map_err(RuntimeExit::from_error)?;
    runtime::run_server(profile, config).await
}

fn handle_cli_command(command: CliCommand) -> Result<(), RuntimeExit> {
    let message = execute_cli_command(command).map_err(RuntimeExit::from_error)?;
    println!("{message}");
    Ok(())
}
