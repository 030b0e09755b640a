//! A small replicated message queue backed by a Raft-family consensus engine.

pub mod client;
pub mod common;
pub mod log;
pub mod rpc;
pub mod server;
pub mod state_machine;

pub use common::{Address, Error, Term};
pub use server::{Node, Role};
pub use state_machine::{ApplyResult, FifoQueue, StateMachine};
