//! feelslap: command-line client for the Feel the Slap social network.
//! Every command runs through one session: cached reads, invalidating writes.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod context;
mod handlers;
mod io;
mod print;

use std::process::ExitCode;

use clap::Parser;
use feelslap::config;
use feelslap::infra::telemetry;
use tracing::error;

use args::{Cli, Commands};
use context::{CliError, open_session};
use handlers::{admin, comments, feed, friends, posts, profile, react, signup, validate};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("error: {err}");
            if let Some(hint) = err.hint() {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = config::load(&cli.global)?;
    telemetry::init(&settings.logging)?;

    let command = match cli.command {
        Commands::Validate(cmd) => return validate::handle(cmd.action),
        command => command,
    };

    let session = open_session(&settings).await?;
    match command {
        Commands::Feed(args) => feed::handle(&session, args).await,
        Commands::Post(cmd) => posts::handle(&session, cmd.action).await,
        Commands::Comments(cmd) => comments::handle(&session, cmd.action).await,
        Commands::React(cmd) => react::handle(&session, cmd.action).await,
        Commands::Friends(cmd) => friends::handle(&session, cmd.action).await,
        Commands::Profile(cmd) => profile::handle(&session, cmd.action).await,
        Commands::Signup(args) => signup::handle(&session, args).await,
        Commands::Admin(cmd) => admin::handle(&session, cmd.action).await,
        Commands::Validate(cmd) => validate::handle(cmd.action),
    }
}
