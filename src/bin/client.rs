//! `raftq-client <ip> <port>`: an interactive REPL speaking to a raftq
//! cluster through any one node, following redirects to the leader.
//!
//! Commands: `enqueue <msg>` (alias `enq`), `dequeue` (alias `deq`),
//! `log` (alias `request_log`), `node status [<ip> <port>]`,
//! `node change <ip> <port>`, `help`, `exit`.

use std::io::{self, Write};

use clap::Parser;

use raftq::client::GatewayClient;
use raftq::common::Address;

#[derive(Parser, Debug)]
#[command(name = "raftq-client", about = "Interactive client for a raftq cluster")]
struct Args {
    ip: String,
    port: u16,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let mut client = GatewayClient::new(Address::new(args.ip, args.port));

    println!("raftq client. Type 'help' for commands, 'exit' to quit.");
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "enqueue" | "enq" => match client.enqueue(rest.to_string()) {
                Ok(true) => println!("ok"),
                Ok(false) => println!("failed"),
                Err(e) => println!("error: {e}"),
            },
            "dequeue" | "deq" => match client.dequeue() {
                Ok(true) => println!("ok"),
                Ok(false) => println!("failed"),
                Err(e) => println!("error: {e}"),
            },
            "log" | "request_log" => match client.request_log() {
                Ok(log) => println!("{log}"),
                Err(e) => println!("error: {e}"),
            },
            "node" => match rest.splitn(2, char::is_whitespace).next() {
                Some("status") => {
                    let target_spec = rest.trim_start_matches("status").trim();
                    let target = if target_spec.is_empty() {
                        client.current_addr().clone()
                    } else {
                        let mut spec_parts = target_spec.split_whitespace();
                        match (spec_parts.next(), spec_parts.next().and_then(|p| p.parse().ok())) {
                            (Some(ip), Some(port)) => Address::new(ip, port),
                            _ => {
                                println!("usage: node status [<ip> <port>]");
                                continue;
                            }
                        }
                    };
                    match client.node_status(target) {
                        Ok(status) => println!("{status:#?}"),
                        Err(e) => println!("error: {e}"),
                    }
                }
                Some("change") => {
                    let target_spec = rest.trim_start_matches("change").trim();
                    let mut spec_parts = target_spec.split_whitespace();
                    match (spec_parts.next(), spec_parts.next().and_then(|p| p.parse().ok())) {
                        (Some(ip), Some(port)) => {
                            client.set_current_addr(Address::new(ip, port));
                            println!("now talking to {}", client.current_addr());
                        }
                        _ => println!("usage: node change <ip> <port>"),
                    }
                }
                _ => println!("usage: node status [<ip> <port>] | node change <ip> <port>"),
            },
            "help" => print_help(),
            "exit" | "quit" => break,
            other => println!("unrecognized command: {other} (try 'help')"),
        }
    }
}

fn print_help() {
    println!(
        "commands:\n  \
         enqueue <msg> (enq)\n  \
         dequeue (deq)\n  \
         log (request_log)\n  \
         node status [<ip> <port>]\n  \
         node change <ip> <port>\n  \
         help\n  \
         exit"
    );
}
