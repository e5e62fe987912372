//! Console client for a multiplayer blackjack server.
//!
//! Connects to the lobby channel, optionally joins one table's game
//! channel, and mirrors everything the server pushes into plain-text
//! view updates on stdout.

use anyhow::Result;
use pico_args::Arguments;

use ob_client::app;

const HELP: &str = "\
Connect to a blackjack server

USAGE:
  ob_client [OPTIONS]

OPTIONS:
  --server URL          WebSocket server URL  [default: ws://localhost:8000]
  --table NAME          Table to join; lobby-only when omitted

FLAGS:
  -h, --help            Print help information
";

struct Args {
    server_url: String,
    table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server_url: pargs
            .value_from_str("--server")
            .unwrap_or_else(|_| "ws://localhost:8000".to_string()),
        table: pargs.opt_value_from_str("--table").ok().flatten(),
    };

    app::run(&args.server_url, args.table.as_deref()).await
}
