use clap::Parser;
use colored::Colorize;
use reforge_core::cli::{self, Cli};
use reforge_core::exit::ReforgeExit;
use reforge_core::logging;

fn main() -> ReforgeExit {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let result = if let Some(cmd) = cli.command {
        cli::execute(cmd)
    } else {
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        Ok(ReforgeExit::Success)
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            ReforgeExit::Fatal
        }
    }
}
