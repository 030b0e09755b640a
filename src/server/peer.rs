//! Ephemeral outbound fan-out workers.
//!
//! Spawns one short-lived worker thread per peer *per tick* (a sync round
//! or an election round) and joins all of them before the caller's
//! commit- or election-advance step runs, so a replication tick is a
//! synchronous round: send to every peer, collect every response, then
//! decide.

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;

use crate::common::{Address, Error};
use crate::rpc::transport::Transport;
use crate::rpc::{Request, SyncRequest, SyncResponse, VoteRequest, VoteResponse};

/// Send `request` to every `(Address, SyncRequest)` pair concurrently and
/// collect all responses (successful, failed or timed out) before
/// returning, so every peer's outcome for this tick is known before the
/// leader advances commit.
pub fn fan_out_sync(
    transport: &Arc<dyn Transport>,
    targets: Vec<(Address, SyncRequest)>,
) -> Vec<(Address, Result<SyncResponse, Error>)> {
    let (tx, rx) = channel();
    let n = targets.len();
    for (addr, request) in targets {
        let tx = tx.clone();
        let transport = Arc::clone(transport);
        thread::spawn(move || {
            let result = match transport.send(&addr, &Request::Heartbeat(request)) {
                Ok(crate::rpc::Response::Heartbeat(resp)) => Ok(resp),
                Ok(_) => Err(Error::Malformed("unexpected response variant for sync".into())),
                Err(e) => Err(e),
            };
            // The receiving end outlives every sender clone for the
            // duration of this call, so this can only fail if the
            // caller already dropped rx, which never happens here.
            let _ = tx.send((addr, result));
        });
    }
    drop(tx);
    (0..n).filter_map(|_| rx.recv().ok()).collect()
}

/// Same fan-out, for `handle_vote_request` during an election round.
pub fn fan_out_votes(
    transport: &Arc<dyn Transport>,
    targets: Vec<(Address, VoteRequest)>,
) -> Vec<(Address, Result<VoteResponse, Error>)> {
    let (tx, rx) = channel();
    let n = targets.len();
    for (addr, request) in targets {
        let tx = tx.clone();
        let transport = Arc::clone(transport);
        thread::spawn(move || {
            let result = match transport.send(&addr, &Request::HandleVoteRequest(request)) {
                Ok(crate::rpc::Response::HandleVoteRequest(resp)) => Ok(resp),
                Ok(_) => Err(Error::Malformed("unexpected response variant for vote".into())),
                Err(e) => Err(e),
            };
            let _ = tx.send((addr, result));
        });
    }
    drop(tx);
    (0..n).filter_map(|_| rx.recv().ok()).collect()
}
