mod cli;
mod component;
mod configure;
mod driver;
mod error;
mod fetch;
mod pipeline;
mod report;
mod run;
mod types;
mod util;
mod workspace;

use std::io::IsTerminal;
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,nginx_build=debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    match cli::init(std::env::args().collect()) {
        Err(e) => {
            let _ = e.print();
            exit(e.exit_code());
        }

        Ok(action) => {
            init_logging(action.verbose());
            exit(action.run());
        }
    }
}
