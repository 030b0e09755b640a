//! A thin, redirect-following client used by the interactive CLI binary.
//!
//! Keeps client logic separate from a node's own RPC handlers: this struct
//! only ever sends `Request`s through a `Transport` and interprets the
//! `Status` it gets back.

use crate::common::{Address, Error};
use crate::rpc::transport::{TcpTransport, Transport};
use crate::rpc::{
    ExecuteRequest, ExecuteResponse, NodeStatusResponse, Request, RequestLogResponse, Response,
    Status,
};

/// Bound on how many redirects a single call will follow before giving up.
/// A well-formed cluster converges to its leader in a small, bounded
/// number of hops; anything past that means no leader is currently known.
const MAX_REDIRECTS: u32 = 8;

pub struct GatewayClient {
    transport: Box<dyn Transport>,
    current: Address,
}

impl GatewayClient {
    pub fn new(initial_addr: Address) -> Self {
        GatewayClient { transport: Box::new(TcpTransport), current: initial_addr }
    }

    pub fn current_addr(&self) -> &Address {
        &self.current
    }

    /// Points the client at a different node without a handshake. The next
    /// call still follows redirects from there if `addr` isn't the leader.
    pub fn set_current_addr(&mut self, addr: Address) {
        self.current = addr;
    }

    pub fn enqueue(&mut self, message: String) -> Result<bool, Error> {
        let req = ExecuteRequest { method: "enqueue".to_string(), params: Some(vec![message]) };
        let resp = self.execute_with_redirect(req)?;
        Ok(resp.status == Status::Success)
    }

    pub fn dequeue(&mut self) -> Result<bool, Error> {
        let req = ExecuteRequest { method: "dequeue".to_string(), params: None };
        let resp = self.execute_with_redirect(req)?;
        Ok(resp.status == Status::Success)
    }

    pub fn request_log(&mut self) -> Result<String, Error> {
        let resp = self.with_redirect(Request::RequestLog, |r| match r {
            Response::RequestLog(resp) => Some(resp),
            _ => None,
        })?;
        Ok(resp.log.unwrap_or_default())
    }

    pub fn node_status(&mut self, target: Address) -> Result<NodeStatusResponse, Error> {
        self.transport
            .send(&target, &Request::GetNodeStatus)
            .and_then(|r| match r {
                Response::GetNodeStatus(resp) => Ok(resp),
                _ => Err(Error::Malformed("unexpected response to get_node_status".into())),
            })
    }

    fn execute_with_redirect(&mut self, req: ExecuteRequest) -> Result<ExecuteResponse, Error> {
        self.with_redirect(Request::Execute(req.clone()), move |r| match r {
            Response::Execute(resp) => Some(resp),
            _ => None,
        })
    }

    /// Sends `request` to `self.current`, following `Redirected` responses
    /// up to `MAX_REDIRECTS` times and remembering the final leader address
    /// for subsequent calls.
    fn with_redirect<T, F>(&mut self, request: Request, extract: F) -> Result<T, Error>
    where
        T: RedirectAware,
        F: Fn(Response) -> Option<T>,
    {
        for _ in 0..MAX_REDIRECTS {
            let response = self.transport.send(&self.current, &request)?;
            let parsed = extract(response)
                .ok_or_else(|| Error::Malformed("unexpected response variant".into()))?;
            match parsed.status() {
                Status::Redirected => {
                    if let Some(addr) = parsed.redirect_addr() {
                        self.current = addr;
                        continue;
                    }
                    return Err(Error::Connect(
                        self.current.clone(),
                        std::io::Error::new(std::io::ErrorKind::Other, "no leader known"),
                    ));
                }
                _ => return Ok(parsed),
            }
        }
        Err(Error::Timeout(self.current.clone()))
    }
}

trait RedirectAware {
    fn status(&self) -> Status;
    fn redirect_addr(&self) -> Option<Address>;
}

impl RedirectAware for ExecuteResponse {
    fn status(&self) -> Status {
        self.status
    }
    fn redirect_addr(&self) -> Option<Address> {
        self.address.clone()
    }
}

impl RedirectAware for RequestLogResponse {
    fn status(&self) -> Status {
        self.status
    }
    fn redirect_addr(&self) -> Option<Address> {
        self.address.clone()
    }
}
