mod assets;
mod basis;
mod cmd;
mod config;
mod csv_schema;
mod exchanges;
mod normalize;
mod orders;
mod prices;
mod report;
mod utils;

use clap::Parser;
use cmd::run::RunCommand;

/// Prepare US crypto tax forms (Form 8949 and TurboTax TXF) from exchange exports
#[derive(Parser, Debug)]
#[command(name = "cointaxes", version, about)]
struct Opts {
    #[command(flatten)]
    run: RunCommand,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();
    opts.run.exec()
}
