mod cli;

use clap::Parser;
use cli::Cli;
use fee_engine::logger;

fn main() {
    let cli = Cli::parse();
    let config = cli::load_config(&cli);
    logger::init(config.get_log_level());

    match cli::run(cli, config) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
