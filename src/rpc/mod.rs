//! The wire protocol: one JSON object per request, one JSON object per
//! response.

pub mod transport;

use serde::{Deserialize, Serialize};

use crate::common::Address;

/// Dispatch tag identifying which call a request line invokes: `heartbeat`,
/// `apply_membership`, `handle_vote_request`, `execute`, `request_log`, or
/// `get_node_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rpc", content = "body", rename_all = "snake_case")]
pub enum Request {
    Heartbeat(SyncRequest),
    ApplyMembership(ApplyMembershipRequest),
    HandleVoteRequest(VoteRequest),
    Execute(ExecuteRequest),
    RequestLog,
    GetNodeStatus,
}

/// The combined heartbeat + append-entries sync message, sent by the
/// leader on every `HEARTBEAT_INTERVAL` tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub election_term: u64,
    pub cluster_leader_addr: Address,
    pub cluster_addr_list: Vec<Address>,
    pub method: String,
    pub curr_term: u64,
    pub prefix_len: usize,
    pub last_term: u64,
    pub messages: Vec<String>,
    pub terms: Vec<u64>,
    pub leader_commit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyMembershipRequest {
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub election_term: u64,
    pub candidate_addr: Address,
    pub commit_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Redirected,
    Failure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: Status,
    #[serde(default)]
    pub ack: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_term: Option<u64>,
}

impl Default for Status {
    fn default() -> Self {
        Status::Failure
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyMembershipResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_addr_list: Option<Vec<Address>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_log: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_log: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_term: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_commit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub status: Status,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub status: Status,
    pub election_term: u64,
    pub cluster_leader_addr: Option<Address>,
    pub cluster_addr_list: Vec<Address>,
    pub message_log: Vec<String>,
    pub term_log: Vec<u64>,
    pub committed_length: usize,
    #[serde(rename = "type")]
    pub role: String,
    pub voted_for: Option<Address>,
}

/// Tagged response envelope, mirroring `Request`'s discriminant so a
/// transport that multiplexes several call kinds over one connection type
/// can deserialize without out-of-band knowledge of which call was made.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rpc", content = "body", rename_all = "snake_case")]
pub enum Response {
    Heartbeat(SyncResponse),
    ApplyMembership(ApplyMembershipResponse),
    HandleVoteRequest(VoteResponse),
    Execute(ExecuteResponse),
    RequestLog(RequestLogResponse),
    GetNodeStatus(NodeStatusResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Success).unwrap(), "\"success\"");
        assert_eq!(serde_json::to_string(&Status::Redirected).unwrap(), "\"redirected\"");
        assert_eq!(serde_json::to_string(&Status::Failure).unwrap(), "\"failure\"");
    }

    #[test]
    fn vote_request_round_trips_through_json() {
        let req = Request::HandleVoteRequest(VoteRequest {
            election_term: 4,
            candidate_addr: Address::new("10.0.0.1", 9000),
            commit_index: 2,
        });
        let encoded = serde_json::to_string(&req).unwrap();
        let decoded: Request = serde_json::from_str(&encoded).unwrap();
        match decoded {
            Request::HandleVoteRequest(v) => {
                assert_eq!(v.election_term, 4);
                assert_eq!(v.candidate_addr, Address::new("10.0.0.1", 9000));
                assert_eq!(v.commit_index, 2);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn sync_request_carries_the_fields_spec_6_names() {
        let req = SyncRequest {
            election_term: 1,
            cluster_leader_addr: Address::new("127.0.0.1", 7000),
            cluster_addr_list: vec![Address::new("127.0.0.1", 7000)],
            method: "sync".to_string(),
            curr_term: 1,
            prefix_len: 0,
            last_term: 0,
            messages: vec!["enqueue(\"a\")".to_string()],
            terms: vec![1],
            leader_commit: 0,
        };
        let value = serde_json::to_value(&req).unwrap();
        for field in [
            "election_term",
            "cluster_leader_addr",
            "cluster_addr_list",
            "method",
            "curr_term",
            "prefix_len",
            "last_term",
            "messages",
            "terms",
            "leader_commit",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }
}
