//! Delivering a request to a peer and getting back its response, or a
//! failure, as newline-delimited JSON over a blocking TCP connection, one
//! connection per call.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::common::{constants, Address, Error};
use crate::rpc::{Request, Response};

/// Deliver a request message to a peer address and return its response or
/// a failure. Implementations must be stateless and usable concurrently
/// from multiple threads.
pub trait Transport: Send + Sync {
    fn send(&self, addr: &Address, request: &Request) -> Result<Response, Error>;
}

/// The default transport: one short-lived TCP connection per call, with
/// read/write timeouts bounded by `RPC_TIMEOUT`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn send(&self, addr: &Address, request: &Request) -> Result<Response, Error> {
        let socket_addr = addr.to_socket_addr()?;
        let mut stream = TcpStream::connect_timeout(&socket_addr, constants::RPC_TIMEOUT)
            .map_err(|e| Error::Connect(addr.clone(), e))?;
        stream
            .set_read_timeout(Some(constants::RPC_TIMEOUT))
            .map_err(|e| Error::Connect(addr.clone(), e))?;
        stream
            .set_write_timeout(Some(constants::RPC_TIMEOUT))
            .map_err(|e| Error::Connect(addr.clone(), e))?;

        let mut line = serde_json::to_string(request)
            .map_err(|e| Error::Malformed(e.to_string()))?;
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .map_err(|_| Error::Timeout(addr.clone()))?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        let n = reader
            .read_line(&mut response_line)
            .map_err(|_| Error::Timeout(addr.clone()))?;
        if n == 0 {
            return Err(Error::Connect(
                addr.clone(),
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "peer closed connection"),
            ));
        }
        serde_json::from_str(response_line.trim_end())
            .map_err(|e| Error::Malformed(e.to_string()))
    }
}

/// Runs an accept loop on `listener`, handing each inbound connection to a
/// short-lived worker thread that decodes one request line, invokes
/// `handle`, and writes back one response line.
///
/// Polls `shutdown` between accepts (the listener is non-blocking) so a
/// node can be torn down cleanly in tests without leaking the accept
/// thread.
pub fn serve<F>(listener: TcpListener, handle: Arc<F>, shutdown: Arc<AtomicBool>)
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    if listener.set_nonblocking(true).is_err() {
        log::warn!("failed to set listener non-blocking; shutdown polling disabled");
    }
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    if let Err(e) = serve_one(stream, handle.as_ref()) {
                        log::debug!("rpc connection error: {e}");
                    }
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                log::warn!("accept failed: {e}");
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

fn serve_one<F>(mut stream: TcpStream, handle: &F) -> Result<(), Error>
where
    F: Fn(Request) -> Response,
{
    stream.set_read_timeout(Some(constants::RPC_TIMEOUT))?;
    stream.set_write_timeout(Some(constants::RPC_TIMEOUT))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Ok(());
    }
    let request: Request =
        serde_json::from_str(line.trim_end()).map_err(|e| Error::Malformed(e.to_string()))?;
    let response = handle(request);
    let mut out = serde_json::to_string(&response).map_err(|e| Error::Malformed(e.to_string()))?;
    out.push('\n');
    stream.write_all(out.as_bytes())?;
    Ok(())
}
