//! `folder-wizard` - reversible bulk flattening and splitting of directory
//! trees.

use anyhow::Result;
use clap::Parser;

use folder_wizard::cli::{Cli, Command};
use folder_wizard::config::{self, Settings};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_args(&cli.global)?;
    config::init_logging(settings.log_level);

    let exit_code = match cli.command {
        Command::Schema => folder_wizard::engine::schema(),
        Command::Up(args) => folder_wizard::engine::up(&settings, args)?,
        Command::Down(args) => folder_wizard::engine::down(&settings, args)?,
        Command::History(args) => folder_wizard::engine::history(&settings, args)?,
        Command::Rollback(args) => folder_wizard::engine::rollback(&settings, args)?,
    };
    std::process::exit(exit_code);
}
