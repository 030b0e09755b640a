//! Shared constants, addressing, and the error type used at RPC/transport boundaries.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod constants {
    use std::time::Duration;

    /// Minimum randomized election timeout, in milliseconds.
    ///
    /// Kept well above a handful of heartbeat intervals so a slow heartbeat
    /// round doesn't trigger a spurious election.
    pub const ELECTION_TIMEOUT_MIN: u64 = 300;
    /// Maximum randomized election timeout, in milliseconds.
    pub const ELECTION_TIMEOUT_MAX: u64 = 600;
    /// Interval between leader heartbeat/sync ticks, in milliseconds.
    pub const HEARTBEAT_INTERVAL: u64 = 75;
    /// Hard per-call timeout for outbound RPCs.
    pub const RPC_TIMEOUT: Duration = Duration::from_millis(250);
    /// Bound on how long `execute()` will block waiting for commit before
    /// giving up and reporting failure.
    pub const COMMIT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);
}

/// A stable peer key: host + port, compared and hashed by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub ip: String,
    pub port: u16,
}

impl Address {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Address { ip: ip.into(), port }
    }

    pub fn to_socket_addr(&self) -> Result<SocketAddr, Error> {
        (self.ip.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| Error::InvalidAddress(self.clone()))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(self.clone()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Monotonically non-decreasing leadership epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Term(pub u64);

impl Term {
    pub fn zero() -> Self {
        Term(0)
    }

    pub fn next(self) -> Self {
        Term(self.0 + 1)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced at the transport / RPC boundary.
///
/// None of these are fatal to a node: the replication engine treats any of
/// them on an outbound call as a transient peer failure (the peer is simply
/// not counted toward majority this round), and inbound handlers never
/// panic as a result of malformed input.
#[derive(Debug)]
pub enum Error {
    /// The TCP connection to a peer could not be established or was reset.
    Connect(Address, std::io::Error),
    /// The call did not complete within `RPC_TIMEOUT`.
    Timeout(Address),
    /// The response (or request) body was not valid JSON for the expected shape.
    Malformed(String),
    /// An `Address` could not be resolved to a socket address.
    InvalidAddress(Address),
    /// Local I/O failure binding or accepting on the server socket.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connect(addr, e) => write!(f, "failed to connect to {addr}: {e}"),
            Error::Timeout(addr) => write!(f, "rpc to {addr} timed out"),
            Error::Malformed(msg) => write!(f, "malformed rpc payload: {msg}"),
            Error::InvalidAddress(addr) => write!(f, "could not resolve address {addr}"),
            Error::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connect(_, e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// A single random draw from `[ELECTION_TIMEOUT_MIN, ELECTION_TIMEOUT_MAX]`.
pub fn random_election_timeout() -> Duration {
    use rand::Rng;
    let millis = rand::thread_rng()
        .gen_range(constants::ELECTION_TIMEOUT_MIN..=constants::ELECTION_TIMEOUT_MAX);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn election_timeout_min_clears_several_heartbeat_intervals() {
        assert!(
            constants::ELECTION_TIMEOUT_MIN > 2 * constants::HEARTBEAT_INTERVAL,
            "ELECTION_TIMEOUT_MIN must exceed a few HEARTBEAT_INTERVALs to avoid spurious elections"
        );
    }

    #[test]
    fn random_election_timeout_stays_within_bounds() {
        for _ in 0..200 {
            let timeout = random_election_timeout();
            assert!(timeout.as_millis() as u64 >= constants::ELECTION_TIMEOUT_MIN);
            assert!(timeout.as_millis() as u64 <= constants::ELECTION_TIMEOUT_MAX);
        }
    }

    #[test]
    fn address_displays_as_host_colon_port() {
        let addr = Address::new("127.0.0.1", 9001);
        assert_eq!(addr.to_string(), "127.0.0.1:9001");
    }

    #[test]
    fn address_equality_is_by_value() {
        assert_eq!(Address::new("10.0.0.1", 1), Address::new("10.0.0.1", 1));
        assert_ne!(Address::new("10.0.0.1", 1), Address::new("10.0.0.1", 2));
    }

    #[test]
    fn term_ordering_and_next_are_monotonic() {
        let t = Term::zero();
        assert!(t.next() > t);
        assert_eq!(Term(5).next(), Term(6));
    }
}
