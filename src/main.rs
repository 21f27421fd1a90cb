use color_eyre::eyre::{
    Result,
    eyre,
};
use gama_dice::config::Network;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: gama-dice [--mainnet | --apothem]\n\
         \n\
         Flags:\n\
           --mainnet   GAMA Dice on XDC mainnet (chain id 50, default)\n\
           --apothem   GAMA Dice on the Apothem test network (chain id 51)"
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<Network> {
    let mut network = Network::Mainnet;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--mainnet" => network = Network::Mainnet,
            "--apothem" => network = Network::Apothem,
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }
    Ok(network)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Log to a rolling file; stdout belongs to the terminal UI.
    let file_appender = rolling::daily(".", "gama-dice.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let network = parse_cli_args()?;
    client::run_app(network).await
}
