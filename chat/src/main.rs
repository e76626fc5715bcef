//! Chat CLI Demo
//!
//! Chats with an in-process echo peer over two FIFOs.
//!
//! Usage: `chat <name> [capacity]`

use std::sync::mpsc;

use chat::{
    read_greeting, receive_messages, run_echo_peer, send_session, ChatError, FRAME_LEN,
    FROM_PEER, TO_PEER,
};
use fifos::{FifoConfig, FifoRegistry, Role, DEFAULT_CAPACITY};
use tokio::io::AsyncBufReadExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(name) = args.next() else {
        eprintln!("Usage: chat <name> [capacity]");
        std::process::exit(1);
    };
    let capacity = match args.next() {
        Some(arg) => arg.parse::<usize>()?,
        None => DEFAULT_CAPACITY,
    };
    if capacity < FRAME_LEN {
        return Err(format!("capacity must hold one frame ({FRAME_LEN} bytes)").into());
    }

    let registry: FifoRegistry =
        FifoRegistry::with_config(FifoConfig::default().with_capacity(capacity));
    println!("Starting chat...");

    let peer_task = {
        let registry = registry.clone();
        tokio::task::spawn_blocking(move || {
            run_echo_peer(&registry, "echo", TO_PEER.to_string(), FROM_PEER.to_string())
        })
    };

    let receiver_task = {
        let registry = registry.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, ChatError> {
            let mut input = registry.open(FROM_PEER.to_string(), Role::Consumer)?;
            let peer = read_greeting(&mut input)?;
            println!("Connection established with {peer}");
            let received = receive_messages(&mut input, |text| println!("+{peer} says: {text}"))?;
            eprintln!("Connection closed by the other end");
            Ok(received)
        })
    };

    let (line_tx, line_rx) = mpsc::channel::<String>();
    let sender_task = tokio::task::spawn_blocking(move || -> Result<usize, ChatError> {
        let mut output = registry.open(TO_PEER.to_string(), Role::Producer)?;
        send_session(&mut output, &name, line_rx)
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        if line_tx.send(line).is_err() {
            break;
        }
    }
    drop(line_tx);

    let sent = sender_task.await??;
    let received = receiver_task.await??;
    let echoed = peer_task.await??;
    log::debug!("chat: sent={sent} received={received} echoed={echoed}");

    println!("Bye!");
    Ok(())
}
