//! The node actor: role engine, replication engine, membership, and client
//! gateway, all mutated behind one coarse mutex so the role loop and the
//! inbound RPC handlers never interleave a log or commit mutation.

pub mod peer;

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::common::{constants, random_election_timeout, Address, Error, Term};
use crate::log::{Command, Log, LogEntry};
use crate::rpc::transport::{self, Transport};
use crate::rpc::{
    ApplyMembershipRequest, ApplyMembershipResponse, ExecuteRequest, ExecuteResponse,
    NodeStatusResponse, Request, RequestLogResponse, Response, Status, SyncRequest, SyncResponse,
    VoteRequest, VoteResponse,
};
use crate::state_machine::StateMachine;

/// The three roles a node can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::Follower => "follower",
            Role::Candidate => "candidate",
            Role::Leader => "leader",
        }
    }
}

/// Leader-side per-follower replication cursor: the standard Raft
/// `matchIndex`/`nextIndex` pair, used both to pick the log suffix to ship
/// a follower next and to derive the majority-commit line.
#[derive(Debug, Clone, Copy, Default)]
struct PeerProgress {
    next_index: usize,
    match_index: usize,
}

/// Leader-side diagnostic recorded from a follower's negative sync ack,
/// used to choose the next sync's prefix for that one peer.
#[derive(Debug, Clone)]
struct RepairHint {
    last_message: String,
    last_term: Term,
    log_length: usize,
}

struct NodeState {
    self_addr: Address,
    role: Role,
    term: Term,
    voted_for: Option<(Term, Address)>,
    log: Log,
    state_machine: Box<dyn StateMachine>,
    /// Ordered for stable human inspection; includes `self_addr`.
    peer_order: Vec<Address>,
    progress: HashMap<Address, PeerProgress>,
    repair_hints: HashMap<Address, RepairHint>,
    leader_addr: Option<Address>,
    last_leader_contact: Instant,
    election_timeout: Duration,
}

impl NodeState {
    fn peers_excluding_self(&self) -> Vec<Address> {
        self.peer_order.iter().filter(|a| **a != self.self_addr).cloned().collect()
    }
}

/// A single cluster node: owns all consensus state behind one `Mutex`,
/// exposes the RPC handlers the transport dispatches to, and drives its own
/// role/replication timers on background threads.
pub struct Node {
    state: Mutex<NodeState>,
    commit_cv: Condvar,
    transport: Arc<dyn Transport>,
    shutdown: Arc<AtomicBool>,
}

impl Node {
    /// Starts as the seed leader of a brand-new, single-node cluster.
    pub fn bootstrap_leader(
        self_addr: Address,
        transport: Arc<dyn Transport>,
        state_machine: Box<dyn StateMachine>,
    ) -> Arc<Node> {
        let state = NodeState {
            self_addr: self_addr.clone(),
            role: Role::Leader,
            // The seed leader is trivially elected leader of term 1: there is
            // no term 0 leader to supersede, so term 1 is the cluster's first
            // leadership epoch.
            term: Term(1),
            voted_for: None,
            log: Log::new(),
            state_machine,
            peer_order: vec![self_addr.clone()],
            progress: HashMap::new(),
            repair_hints: HashMap::new(),
            leader_addr: Some(self_addr),
            last_leader_contact: Instant::now(),
            election_timeout: random_election_timeout(),
        };
        Self::spawn_from_state(state, transport)
    }

    /// Starts as a passive follower with no known peers, awaiting contact.
    /// Never self-promotes via election timeout while it knows of no other
    /// peer (see `run_timer_loop`); becomes active once either a leader's
    /// sync reaches it or `initiate_join` is called.
    pub fn bootstrap_passive(
        self_addr: Address,
        transport: Arc<dyn Transport>,
        state_machine: Box<dyn StateMachine>,
    ) -> Arc<Node> {
        let state = NodeState {
            self_addr: self_addr.clone(),
            role: Role::Follower,
            term: Term::zero(),
            voted_for: None,
            log: Log::new(),
            state_machine,
            peer_order: vec![self_addr],
            progress: HashMap::new(),
            repair_hints: HashMap::new(),
            leader_addr: None,
            last_leader_contact: Instant::now(),
            election_timeout: random_election_timeout(),
        };
        Self::spawn_from_state(state, transport)
    }

    /// Joins an existing cluster by sending `apply_membership` to
    /// `contact_addr`, following redirects until the real leader is found.
    pub fn join(
        self_addr: Address,
        contact_addr: Address,
        transport: Arc<dyn Transport>,
        state_machine: Box<dyn StateMachine>,
    ) -> Result<Arc<Node>, Error> {
        let (resp, leader_addr) = handshake_join(transport.as_ref(), &self_addr, contact_addr)?;
        let state = state_from_join_response(self_addr, leader_addr, resp, state_machine);
        Ok(Self::spawn_from_state(state, transport))
    }

    /// Performs the join handshake against an already-running passive node,
    /// mutating it in place instead of constructing a new `Node`. Used to
    /// bring a `-p` node into a cluster after the fact.
    pub fn initiate_join(self: &Arc<Self>, contact_addr: Address) -> Result<(), Error> {
        let self_addr = self.state.lock().unwrap().self_addr.clone();
        let (resp, leader_addr) =
            handshake_join(self.transport.as_ref(), &self_addr, contact_addr)?;
        let mut state = self.state.lock().unwrap();
        apply_join_response(&mut state, leader_addr, resp);
        drop(state);
        self.commit_cv.notify_all();
        Ok(())
    }

    fn spawn_from_state(state: NodeState, transport: Arc<dyn Transport>) -> Arc<Node> {
        let node = Arc::new(Node {
            state: Mutex::new(state),
            commit_cv: Condvar::new(),
            transport,
            shutdown: Arc::new(AtomicBool::new(false)),
        });
        node.spawn();
        node
    }

    /// Binds the RPC listener and starts the accept and timer threads.
    fn spawn(self: &Arc<Self>) {
        let self_addr = self.state.lock().unwrap().self_addr.clone();
        let socket_addr = self_addr
            .to_socket_addr()
            .unwrap_or_else(|e| panic!("could not resolve own address {self_addr}: {e}"));
        let listener =
            TcpListener::bind(socket_addr).unwrap_or_else(|e| panic!("bind {self_addr}: {e}"));

        let node = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);
        thread::spawn(move || {
            transport::serve(listener, Arc::new(move |req| node.handle_request(req)), shutdown);
        });

        let node = Arc::clone(self);
        thread::spawn(move || node.run_timer_loop());
    }

    /// Stops the accept loop and (on its next check) the timer loop. Used
    /// by tests to tear a node down without leaking threads.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn address(&self) -> Address {
        self.state.lock().unwrap().self_addr.clone()
    }

    // ----- RPC dispatch -----------------------------------------------

    pub fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::Heartbeat(req) => Response::Heartbeat(self.handle_sync(req)),
            Request::ApplyMembership(req) => {
                Response::ApplyMembership(self.handle_apply_membership(req))
            }
            Request::HandleVoteRequest(req) => {
                Response::HandleVoteRequest(self.handle_vote_request(req))
            }
            Request::Execute(req) => Response::Execute(self.handle_execute(req)),
            Request::RequestLog => Response::RequestLog(self.handle_request_log()),
            Request::GetNodeStatus => Response::GetNodeStatus(self.handle_get_node_status()),
        }
    }

    /// Handles an inbound sync/heartbeat message from the current (or a
    /// newly-elected) leader.
    fn handle_sync(&self, req: SyncRequest) -> SyncResponse {
        let mut state = self.state.lock().unwrap();
        let sender_term = Term(req.curr_term);

        if sender_term < state.term {
            return SyncResponse { status: Status::Failure, ..Default::default() };
        }

        for addr in &req.cluster_addr_list {
            if !state.peer_order.contains(addr) {
                state.peer_order.push(addr.clone());
            }
        }

        if sender_term > state.term {
            state.term = sender_term;
            state.voted_for = None;
        }
        state.role = Role::Follower;
        state.leader_addr = Some(req.cluster_leader_addr.clone());
        state.last_leader_contact = Instant::now();
        state.election_timeout = random_election_timeout();

        let prefix_last_term = Term(req.last_term);
        if !state.log.consistent(req.prefix_len, prefix_last_term) {
            let addr = state.self_addr.clone();
            let message_len = state.log.length();
            let last_message = state.log.entries().last().map(|e| e.command.to_string());
            let last_term = state.log.last_term().0;
            return SyncResponse {
                status: Status::Success,
                ack: false,
                addr: Some(addr),
                message_len: Some(message_len),
                last_message: last_message.or(Some(String::new())),
                last_term: Some(last_term),
            };
        }

        let entries: Vec<LogEntry> = req
            .messages
            .iter()
            .zip(req.terms.iter())
            .filter_map(|(m, t)| Command::parse(m).map(|command| LogEntry { term: Term(*t), command }))
            .collect();
        state.log.append(&entries, req.prefix_len);

        if req.leader_commit > state.log.committed_length() {
            let target = req.leader_commit.min(state.log.length());
            Self::apply_committed_range(&mut state, target);
        }
        drop(state);
        self.commit_cv.notify_all();

        SyncResponse { status: Status::Success, ack: true, ..Default::default() }
    }

    /// Handles an inbound vote request from a candidate.
    fn handle_vote_request(&self, req: VoteRequest) -> VoteResponse {
        let mut state = self.state.lock().unwrap();
        let self_addr = state.self_addr.clone();
        let candidate_term = Term(req.election_term);

        if candidate_term < state.term {
            return VoteResponse {
                status: Status::Failure,
                address: self_addr,
                message: Some("stale term".into()),
            };
        }

        if candidate_term > state.term {
            state.term = candidate_term;
            state.voted_for = None;
            state.role = Role::Follower;
        }

        let voted_for_other = matches!(
            &state.voted_for,
            Some((t, addr)) if *t == candidate_term && *addr != req.candidate_addr
        );
        if voted_for_other {
            return VoteResponse {
                status: Status::Failure,
                address: self_addr,
                message: Some("Already voted for another candidate".into()),
            };
        }

        state.voted_for = Some((candidate_term, req.candidate_addr.clone()));
        state.role = Role::Follower;
        state.election_timeout = random_election_timeout();
        state.last_leader_contact = Instant::now();
        VoteResponse { status: Status::Success, address: self_addr, message: None }
    }

    /// Handles an inbound membership-join request.
    fn handle_apply_membership(&self, req: ApplyMembershipRequest) -> ApplyMembershipResponse {
        let mut state = self.state.lock().unwrap();
        if state.role != Role::Leader {
            return ApplyMembershipResponse {
                status: Status::Redirected,
                cluster_addr_list: None,
                message_log: None,
                term_log: None,
                election_term: None,
                leader_commit: None,
                address: state.leader_addr.clone(),
            };
        }

        if !state.peer_order.contains(&req.address) {
            state.peer_order.push(req.address.clone());
            let next_index = state.log.length() + 1;
            state.progress.insert(req.address.clone(), PeerProgress { next_index, match_index: 0 });
        }

        ApplyMembershipResponse {
            status: Status::Success,
            cluster_addr_list: Some(state.peer_order.clone()),
            message_log: Some(state.log.entries().iter().map(|e| e.command.to_string()).collect()),
            term_log: Some(state.log.entries().iter().map(|e| e.term.0).collect()),
            election_term: Some(state.term.0),
            leader_commit: Some(state.log.committed_length()),
            address: None,
        }
    }

    /// Client gateway entry point for `enqueue`/`dequeue`: appends locally
    /// on the leader, then blocks the caller until the appended entry
    /// commits (or a bounded timeout elapses) before reporting success.
    fn handle_execute(&self, req: ExecuteRequest) -> ExecuteResponse {
        let command = match req.method.as_str() {
            "enqueue" => {
                let message = req.params.as_ref().and_then(|p| p.first()).cloned().unwrap_or_default();
                Command::Enqueue(message)
            }
            "dequeue" => Command::Dequeue,
            _ => return ExecuteResponse { status: Status::Failure, ack: None, address: None },
        };

        let target_index = {
            let mut state = self.state.lock().unwrap();
            if state.role != Role::Leader {
                return ExecuteResponse {
                    status: Status::Redirected,
                    ack: None,
                    address: state.leader_addr.clone(),
                };
            }
            let term = state.term;
            let len = state.log.length();
            state.log.append(&[LogEntry { term, command }], len);
            state.log.length()
        };

        self.leader_tick();

        if self.wait_for_commit(target_index) {
            ExecuteResponse { status: Status::Success, ack: Some("true".into()), address: None }
        } else {
            ExecuteResponse { status: Status::Failure, ack: Some("false".into()), address: None }
        }
    }

    fn handle_request_log(&self) -> RequestLogResponse {
        let state = self.state.lock().unwrap();
        if state.role != Role::Leader {
            return RequestLogResponse {
                status: Status::Redirected,
                log: None,
                address: state.leader_addr.clone(),
            };
        }
        RequestLogResponse { status: Status::Success, log: Some(state.log.render()), address: None }
    }

    fn handle_get_node_status(&self) -> NodeStatusResponse {
        let state = self.state.lock().unwrap();
        NodeStatusResponse {
            status: Status::Success,
            election_term: state.term.0,
            cluster_leader_addr: state.leader_addr.clone(),
            cluster_addr_list: state.peer_order.clone(),
            message_log: state.log.entries().iter().map(|e| e.command.to_string()).collect(),
            term_log: state.log.entries().iter().map(|e| e.term.0).collect(),
            committed_length: state.log.committed_length(),
            role: state.role.label().to_string(),
            voted_for: state.voted_for.as_ref().map(|(_, addr)| addr.clone()),
        }
    }

    // ----- Role engine ---------------------------------------------------

    /// Cooperative role/replication timer loop: one dedicated thread per
    /// node. Exits each iteration's wait promptly on role change and exits
    /// entirely once `stop()` is called.
    fn run_timer_loop(self: Arc<Self>) {
        while !self.shutdown.load(Ordering::SeqCst) {
            let role = self.state.lock().unwrap().role;
            match role {
                Role::Follower => {
                    thread::sleep(Duration::from_millis(15));
                    let should_campaign = {
                        let state = self.state.lock().unwrap();
                        state.role == Role::Follower
                            && state.peer_order.len() > 1
                            && state.last_leader_contact.elapsed() >= state.election_timeout
                    };
                    if should_campaign {
                        self.start_election();
                    }
                }
                Role::Candidate => {
                    self.start_election();
                    let (still_candidate, backoff) = {
                        let state = self.state.lock().unwrap();
                        (state.role == Role::Candidate, state.election_timeout)
                    };
                    if still_candidate {
                        thread::sleep(backoff);
                    }
                }
                Role::Leader => {
                    thread::sleep(Duration::from_millis(constants::HEARTBEAT_INTERVAL));
                    if self.state.lock().unwrap().role == Role::Leader {
                        self.leader_tick();
                    }
                }
            }
        }
    }

    /// Runs one candidacy: bump term, vote for self, broadcast
    /// `handle_vote_request` to every peer concurrently, and become Leader
    /// on a strict majority while still Candidate.
    fn start_election(self: &Arc<Self>) {
        let (targets, vote_req, election_term) = {
            let mut state = self.state.lock().unwrap();
            if state.role == Role::Leader {
                return;
            }
            state.role = Role::Candidate;
            state.term = state.term.next();
            let self_addr = state.self_addr.clone();
            state.voted_for = Some((state.term, self_addr.clone()));
            state.election_timeout = random_election_timeout();
            state.last_leader_contact = Instant::now();

            let vote_req = VoteRequest {
                election_term: state.term.0,
                candidate_addr: self_addr,
                commit_index: state.log.committed_length(),
            };
            let targets: Vec<(Address, VoteRequest)> =
                state.peers_excluding_self().into_iter().map(|a| (a, vote_req.clone())).collect();
            (targets, vote_req, state.term)
        };

        let responses = peer::fan_out_votes(&self.transport, targets);
        let granted = responses.iter().filter(|(_, r)| matches!(r, Ok(v) if v.status == Status::Success)).count();
        let votes = 1 + granted;

        let mut state = self.state.lock().unwrap();
        if state.role != Role::Candidate || state.term != election_term {
            return;
        }
        let majority = state.peer_order.len() / 2 + 1;
        if votes >= majority {
            state.role = Role::Leader;
            let self_addr = state.self_addr.clone();
            state.leader_addr = Some(self_addr);
            let next_index = state.log.length() + 1;
            for peer in state.peers_excluding_self() {
                state.progress.insert(peer, PeerProgress { next_index, match_index: 0 });
            }
            drop(state);
            log::info!("became leader for term {}", vote_req.election_term);
            self.leader_tick();
        }
    }

    /// Runs one leader heartbeat/sync tick: fan out sync requests to every
    /// peer, collect their acks, then advance commit.
    fn leader_tick(self: &Arc<Self>) {
        let (sent, current_term) = {
            let state = self.state.lock().unwrap();
            if state.role != Role::Leader {
                return;
            }
            let mut sent = HashMap::new();
            for peer in state.peers_excluding_self() {
                sent.insert(peer.clone(), Self::build_sync_request(&state, &peer));
            }
            (sent, state.term)
        };

        let targets: Vec<(Address, SyncRequest)> =
            sent.iter().map(|(addr, (req, _))| (addr.clone(), req.clone())).collect();
        let responses = peer::fan_out_sync(&self.transport, targets);

        let mut state = self.state.lock().unwrap();
        if state.role != Role::Leader || state.term != current_term {
            return;
        }

        for (addr, result) in responses {
            match result {
                Ok(resp) if resp.ack => {
                    if let Some((_, resulting_match_index)) = sent.get(&addr) {
                        let progress = state.progress.entry(addr.clone()).or_default();
                        if *resulting_match_index > progress.match_index {
                            progress.match_index = *resulting_match_index;
                        }
                        progress.next_index = progress.match_index + 1;
                    }
                    state.repair_hints.remove(&addr);
                }
                Ok(resp) if resp.status == Status::Success => {
                    state.repair_hints.insert(
                        addr,
                        RepairHint {
                            last_message: resp.last_message.unwrap_or_default(),
                            last_term: Term(resp.last_term.unwrap_or(0)),
                            log_length: resp.message_len.unwrap_or(0),
                        },
                    );
                }
                Ok(_) => { /* stale-term rejection: the peer outranks us, not a repair case */ }
                Err(_) => { /* transient peer failure: not counted this round */ }
            }
        }

        Self::advance_commit(&mut state);
        drop(state);
        self.commit_cv.notify_all();
    }

    /// Builds the sync request for one follower, applying any pending
    /// repair hint, and returns alongside it the log length the follower
    /// will have matched if it acks successfully.
    fn build_sync_request(state: &NodeState, peer: &Address) -> (SyncRequest, usize) {
        let (prefix_len, entries): (usize, Vec<LogEntry>) = match state.repair_hints.get(peer) {
            Some(hint) if hint.log_length == 0 => (0, state.log.entries().to_vec()),
            Some(hint) => {
                let mut found = None;
                for i in (0..state.log.length()).rev() {
                    if let Some(entry) = state.log.entry(i) {
                        if entry.command.to_string() == hint.last_message && entry.term == hint.last_term {
                            found = Some(i);
                            break;
                        }
                    }
                }
                match found {
                    Some(i) => (i, state.log.entries_from(i).to_vec()),
                    None => (0, state.log.entries().to_vec()),
                }
            }
            None => {
                let progress = state.progress.get(peer).copied().unwrap_or_default();
                let prefix_len = progress.next_index.saturating_sub(1).min(state.log.length());
                (prefix_len, state.log.entries_from(prefix_len).to_vec())
            }
        };

        let prefix_last_term = if prefix_len > 0 {
            state.log.entry(prefix_len - 1).map(|e| e.term).unwrap_or_else(Term::zero)
        } else {
            Term::zero()
        };
        let resulting_match_index = prefix_len + entries.len();
        let messages = entries.iter().map(|e| e.command.to_string()).collect();
        let terms = entries.iter().map(|e| e.term.0).collect();

        let req = SyncRequest {
            election_term: state.term.0,
            cluster_leader_addr: state.self_addr.clone(),
            cluster_addr_list: state.peer_order.clone(),
            method: "sync".to_string(),
            curr_term: state.term.0,
            prefix_len,
            last_term: prefix_last_term.0,
            messages,
            terms,
            leader_commit: state.log.committed_length(),
        };
        (req, resulting_match_index)
    }

    /// Raises `committed_length` to the median of all peers' match indices
    /// (including the leader's own log length), provided the entry that
    /// would newly commit was appended under the current term: the
    /// standard Raft safety rule against committing a previous leader's
    /// entries by indirect majority (invariant 4).
    fn advance_commit(state: &mut NodeState) {
        let mut match_indices: Vec<usize> = state
            .peer_order
            .iter()
            .map(|addr| {
                if *addr == state.self_addr {
                    state.log.length()
                } else {
                    state.progress.get(addr).map(|p| p.match_index).unwrap_or(0)
                }
            })
            .collect();
        match_indices.sort_unstable();
        let n = match_indices.len();
        if n == 0 {
            return;
        }
        let majority = n / 2 + 1;
        let candidate_index = match_indices[n - majority];
        if candidate_index <= state.log.committed_length() || candidate_index == 0 {
            return;
        }
        let committed_under_current_term =
            state.log.entry(candidate_index - 1).map(|e| e.term) == Some(state.term);
        if committed_under_current_term {
            Self::apply_committed_range(state, candidate_index);
        }
    }

    /// Applies every not-yet-applied committed command up to `target_len`,
    /// in order, exactly once (invariant 5). `committed_length` only ever
    /// grows here; a committed `Dequeue` is applied to the state machine
    /// alone and never removes anything from the log itself.
    fn apply_committed_range(state: &mut NodeState, target_len: usize) {
        let count = target_len.saturating_sub(state.log.committed_length());
        for _ in 0..count {
            let idx = state.log.committed_length();
            let Some(entry) = state.log.entry(idx).cloned() else { break };
            let result = state.state_machine.apply(&entry.command);
            log::debug!("applied {} -> {:?}", entry.command, result);
            state.log.advance_committed(idx + 1);
        }
    }

    /// Blocks until `log.committed_length() >= target_index`, stepping
    /// down cancels the wait (the entry may never commit under this
    /// leader's term), bounded by `COMMIT_WAIT_TIMEOUT`.
    fn wait_for_commit(&self, target_index: usize) -> bool {
        let mut state = self.state.lock().unwrap();
        let deadline = Instant::now() + constants::COMMIT_WAIT_TIMEOUT;
        while state.log.committed_length() < target_index && state.role == Role::Leader {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _timeout) = self.commit_cv.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
        state.log.committed_length() >= target_index
    }
}

/// Shared request/response plumbing for `Node::join` and `initiate_join`.
fn handshake_join(
    transport: &dyn Transport,
    self_addr: &Address,
    contact_addr: Address,
) -> Result<(ApplyMembershipResponse, Address), Error> {
    let mut current = contact_addr;
    for _ in 0..16 {
        let req = Request::ApplyMembership(ApplyMembershipRequest { address: self_addr.clone() });
        match transport.send(&current, &req)? {
            Response::ApplyMembership(resp) => match resp.status {
                Status::Success => return Ok((resp, current)),
                Status::Redirected => match resp.address {
                    Some(addr) => current = addr,
                    None => return Err(Error::Connect(current, no_leader_known())),
                },
                Status::Failure => return Err(Error::Connect(current, no_leader_known())),
            },
            _ => return Err(Error::Malformed("unexpected response to apply_membership".into())),
        }
    }
    Err(Error::Timeout(current))
}

fn no_leader_known() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, "no leader known")
}

fn state_from_join_response(
    self_addr: Address,
    leader_addr: Address,
    resp: ApplyMembershipResponse,
    state_machine: Box<dyn StateMachine>,
) -> NodeState {
    let mut log = Log::new();
    let entries = entries_from_join_response(&resp);
    log.append(&entries, 0);
    let mut state = NodeState {
        self_addr,
        role: Role::Follower,
        term: Term(resp.election_term.unwrap_or(0)),
        voted_for: None,
        log,
        state_machine,
        peer_order: resp.cluster_addr_list.clone().unwrap_or_default(),
        progress: HashMap::new(),
        repair_hints: HashMap::new(),
        leader_addr: Some(leader_addr),
        last_leader_contact: Instant::now(),
        election_timeout: random_election_timeout(),
    };
    let target = resp.leader_commit.unwrap_or(0);
    Node::apply_committed_range(&mut state, target);
    state
}

fn apply_join_response(state: &mut NodeState, leader_addr: Address, resp: ApplyMembershipResponse) {
    let entries = entries_from_join_response(&resp);
    let mut log = Log::new();
    log.append(&entries, 0);
    state.log = log;
    state.term = Term(resp.election_term.unwrap_or(0));
    state.peer_order = resp.cluster_addr_list.clone().unwrap_or_default();
    state.leader_addr = Some(leader_addr);
    state.role = Role::Follower;
    state.last_leader_contact = Instant::now();
    state.election_timeout = random_election_timeout();
    let target = resp.leader_commit.unwrap_or(0);
    Node::apply_committed_range(state, target);
}

fn entries_from_join_response(resp: &ApplyMembershipResponse) -> Vec<LogEntry> {
    let commands = resp.message_log.clone().unwrap_or_default();
    let terms = resp.term_log.clone().unwrap_or_default();
    commands
        .iter()
        .zip(terms.iter())
        .filter_map(|(m, t)| Command::parse(m).map(|command| LogEntry { term: Term(*t), command }))
        .collect()
}
