use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gossip-chain")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a blockchain node")]
    StartNode {
        #[arg(long, help = "Address to listen on (overrides NODE_ADDRESS)")]
        addr: Option<String>,
        #[arg(long, help = "Enable periodic mining on this node")]
        mine: bool,
        #[arg(long = "peer", help = "Peer address to connect to (repeatable)")]
        peers: Vec<String>,
    },
    #[command(
        name = "mine",
        about = "Mine blocks into a fresh local chain and print it"
    )]
    Mine {
        #[arg(help = "Number of blocks to mine")]
        blocks: usize,
    },
}
