//! `raftq-server <ip> <port> [<contact-ip> <contact-port> | -p]`
//!
//! With no third argument, bootstraps a brand-new single-node cluster led by
//! this node. With `<contact-ip> <contact-port>`, joins the cluster reachable
//! there. With `-p`, starts as a passive follower that does not join any
//! cluster on its own; send it `join <ip> <port>` on stdin to have it join in
//! place.

use std::io::{self, BufRead};
use std::sync::Arc;

use clap::Parser;

use raftq::common::Address;
use raftq::rpc::transport::TcpTransport;
use raftq::{FifoQueue, Node};

#[derive(Parser, Debug)]
#[command(name = "raftq-server", about = "Run one node of a raftq cluster")]
struct Args {
    ip: String,
    port: u16,
    contact_ip: Option<String>,
    contact_port: Option<u16>,
    #[arg(short = 'p', long = "passive", conflicts_with = "contact_port")]
    passive: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let self_addr = Address::new(args.ip, args.port);
    let transport = Arc::new(TcpTransport);

    let node = if args.passive {
        log::info!("starting {self_addr} as a passive follower");
        Node::bootstrap_passive(self_addr, transport, Box::new(FifoQueue::new()))
    } else if let (Some(ip), Some(port)) = (args.contact_ip, args.contact_port) {
        let contact = Address::new(ip, port);
        log::info!("starting {self_addr}, joining via {contact}");
        match Node::join(self_addr, contact, transport, Box::new(FifoQueue::new())) {
            Ok(node) => node,
            Err(e) => {
                eprintln!("failed to join cluster: {e}");
                std::process::exit(1);
            }
        }
    } else {
        log::info!("starting {self_addr} as a seed leader");
        Node::bootstrap_leader(self_addr, transport, Box::new(FifoQueue::new()))
    };

    run_stdin_loop(&node);
}

/// Accepts `join <ip> <port>` lines on stdin so a passive node can be told
/// to join a cluster after it's already running, and `status`/`quit` for
/// convenience during manual testing.
fn run_stdin_loop(node: &Arc<Node>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("join") => {
                let (Some(ip), Some(port)) = (parts.next(), parts.next()) else {
                    eprintln!("usage: join <ip> <port>");
                    continue;
                };
                let Ok(port) = port.parse::<u16>() else {
                    eprintln!("invalid port: {port}");
                    continue;
                };
                match node.initiate_join(Address::new(ip, port)) {
                    Ok(()) => println!("joined via {ip}:{port}"),
                    Err(e) => eprintln!("join failed: {e}"),
                }
            }
            Some("status") => println!("{}", node.address()),
            Some("quit") | Some("exit") => {
                node.stop();
                break;
            }
            Some(other) => eprintln!("unrecognized command: {other}"),
            None => {}
        }
    }
}
