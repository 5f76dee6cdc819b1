// This is my main entry point for the blockchain node CLI
use clap::Parser;
use gossip_chain::{
    find_block, next_difficulty, CancelToken, Chain, Command, MineOutcome, Opt, Server,
    SyncCoordinator, DEFAULT_MINE_INTERVAL, GLOBAL_CONFIG,
};
use log::{error, LevelFilter};
use std::process;

fn main() {
    // I initialize logging first so I can see what the node is doing
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    // I run the actual command and exit non-zero if anything goes wrong
    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        // When I want to run a node: start the coordinator, dial the peers I
        // was given, then sit in the accept loop forever
        Command::StartNode { addr, mine, peers } => {
            if let Some(addr) = addr {
                GLOBAL_CONFIG.set_node_addr(addr);
            }
            GLOBAL_CONFIG.set_mining(mine);
            let socket_addr = GLOBAL_CONFIG.get_node_addr();

            let coordinator =
                SyncCoordinator::start(GLOBAL_CONFIG.is_miner(), DEFAULT_MINE_INTERVAL);

            // Peers are operator-supplied; a peer that is down right now is
            // not a reason to refuse to start
            for peer in peers {
                if let Err(e) = coordinator.add_peer(&peer) {
                    error!("Failed to add peer {peer}: {e}");
                }
            }

            let server = Server::bind(coordinator, &socket_addr)?;
            server.run()?;
        }
        // When I want a quick offline smoke run: mine a few blocks into a
        // fresh chain and print the result
        Command::Mine { blocks } => {
            let mut chain = Chain::genesis();
            for _ in 0..blocks {
                let target = next_difficulty(&chain)?;
                let Some(tip) = chain.tip() else { break };
                let outcome = find_block(tip, target, &[], &CancelToken::new());
                let MineOutcome::Mined(block) = outcome else { break };
                chain = chain.extended_with(block);
            }
            print!("{chain}");
            println!("chain valid: {}", chain.is_valid());
        }
    }
    Ok(())
}
