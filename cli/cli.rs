use mothball_core::{Action, CliArgs, Command as CoreCommand, MothballArgs, config, processor};
mod interaction;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use console::style;
use std::env;
use std::io;
use std::process::ExitCode;

fn print_completions_cli(shell: clap_complete::Shell) {
    let mut cmd = CliArgs::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli: CliArgs = CliArgs::parse();

    if let Some(command) = cli.command {
        match command {
            CoreCommand::Completion(args) => {
                print_completions_cli(args.shell);
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    println!("Mothball - Commented Out Code Archiver. Version 0.1.0\n");

    if env::args().len() <= 1 {
        CliArgs::command().print_long_help()?;
        return Ok(ExitCode::SUCCESS);
    }

    match run_action(&cli.main_opts) {
        Ok(true) => {
            println!("\n{}", style("processing complete.").green());
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", style(format!("Error: {e:#}")).red());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Returns false when the user declined the confirmation prompt.
fn run_action(args: &MothballArgs) -> Result<bool> {
    let action = args.checked_action()?;

    if action == Action::WriteSampleConfig {
        let output = match &args.output {
            Some(output) => output.clone(),
            None => anyhow::bail!("Output path is empty"),
        };
        config::write_sample_config(&output)?;
        println!("Written sample config file to '{}'.", output.display());
        return Ok(true);
    }

    let config_path = match &args.config {
        Some(path) => path,
        None => anyhow::bail!("Missing config file path parameter '-c'"),
    };
    let config = config::read_config(config_path)?;

    if action == Action::Archive
        && !interaction::confirm_archiving(&config.source_root_path, args.no_confirm)?
    {
        return Ok(false);
    }

    processor::run(args, &config, &mut |line| println!("{line}"))?;
    Ok(true)
}
