use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tinychain-cli")]
#[command(about = "CLI client for a running tinychain node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction to the pending pool
    Submit {
        /// Sender address
        #[arg(long)]
        sender: String,
        /// Recipient address
        #[arg(long)]
        recipient: String,
        /// Amount to transfer
        #[arg(long)]
        amount: u64,
    },
    /// Mine one block (includes the node's reward transaction)
    Mine,
    /// Print the full chain
    Chain,
    /// Register peer addresses with the node
    Register {
        /// Peer addresses (host:port or http://host:port)
        #[arg(required = true)]
        peers: Vec<String>,
    },
    /// Run conflict resolution against registered peers
    Resolve,
}

#[derive(Serialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct RegisterIn {
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let node = cli.node;

    let res = match cli.cmd {
        Command::Submit { sender, recipient, amount } => {
            let tx = TxIn { sender, recipient, amount };
            client
                .post(format!("{node}/transactions/new"))
                .json(&tx)
                .send()
                .await?
        }
        Command::Mine => client.get(format!("{node}/mine")).send().await?,
        Command::Chain => client.get(format!("{node}/chain")).send().await?,
        Command::Register { peers } => {
            let req = RegisterIn { nodes: peers };
            client
                .post(format!("{node}/nodes/register"))
                .json(&req)
                .send()
                .await?
        }
        Command::Resolve => client.get(format!("{node}/nodes/resolve")).send().await?,
    };

    let status = res.status();
    let body = res.text().await?;
    println!("status: {status}");
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
