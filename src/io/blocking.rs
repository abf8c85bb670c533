// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of the blocking I/O provider.

// Error handling: an I/O error ends the task that hit it. For the TCP
// accept loop and the UDP workers, the thread then respawns (see
// crate::thread); for a TCP connection, the connection is dropped.
// Failed UDP sends are logged and otherwise ignored.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use super::socket::{write_all_parts, TcpListener, TcpListenerApi, UdpSocket, UdpSocketApi};
use crate::message::constants::MAX_MESSAGE_SIZE;
use crate::server::{Context, Server, Transport};
use crate::thread::{PushError, ThreadGroup, WorkQueue};

/// A blocking I/O provider.
///
/// Each UDP socket is served by a fixed number of worker threads that
/// all receive from it. Each TCP listener has an accept thread that
/// hands connections to a shared pool of TCP workers through a
/// [`WorkQueue`]. Every worker owns a server [`Context`], so message
/// handling never contends for locks.
///
/// Graceful shutdown (by shutting down the [`ThreadGroup`] passed to
/// [`BlockingIoProvider::start`]) requires `poll_accept` support; see
/// [`BlockingIoProvider::SUPPORTS_GRACEFUL_SHUTDOWN`].
pub struct BlockingIoProvider {
    config: BlockingIoConfig,
    tcp_listeners: Vec<TcpListener>,
    udp_sockets: Vec<UdpSocket>,
}

/// Configuration options for the [`BlockingIoProvider`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockingIoConfig {
    /// The number of worker threads per UDP socket.
    pub udp_workers_per_socket: usize,

    /// The number of TCP worker threads, shared by all listeners. This
    /// is the number of TCP connections served at once.
    pub tcp_workers: usize,

    /// How many accepted TCP connections may wait for a worker before
    /// new ones are closed right away.
    pub tcp_backlog: usize,
}

impl Default for BlockingIoConfig {
    fn default() -> Self {
        Self {
            udp_workers_per_socket: 4,
            tcp_workers: 4,
            tcp_backlog: 64,
        }
    }
}

impl BlockingIoProvider {
    /// Whether the `BlockingIoProvider` supports graceful shutdown on
    /// this target.
    pub const SUPPORTS_GRACEFUL_SHUTDOWN: bool = TcpListener::POLL_ACCEPT_WORKS;

    /// Binds TCP and UDP sockets in preparation for serving, but does
    /// not start serving.
    pub fn bind<T, U>(config: BlockingIoConfig, tcp_addrs: T, udp_addrs: U) -> io::Result<Self>
    where
        T: IntoIterator<Item = SocketAddr>,
        U: IntoIterator<Item = SocketAddr>,
    {
        let mut tcp_listeners = Vec::new();
        for addr in tcp_addrs {
            let listener = TcpListener::bind(addr)?;
            if TcpListener::POLL_ACCEPT_WORKS {
                listener.set_nonblocking(true)?;
            }
            tcp_listeners.push(listener);
        }

        let mut udp_sockets = Vec::new();
        for addr in udp_addrs {
            let socket = UdpSocket::bind(addr)?;
            socket.set_read_timeout(Some(CHECK_FOR_SHUTDOWN_TIMEOUT))?;
            udp_sockets.push(socket);
        }

        Ok(Self {
            config,
            tcp_listeners,
            udp_sockets,
        })
    }

    /// Returns the addresses actually bound, TCP first.
    pub fn local_addrs(&self) -> io::Result<Vec<(Transport, SocketAddr)>> {
        let tcp = self
            .tcp_listeners
            .iter()
            .map(|listener| listener.local_addr().map(|addr| (Transport::Tcp, addr)));
        let udp = self
            .udp_sockets
            .iter()
            .map(|socket| socket.local_addr().map(|addr| (Transport::Udp, addr)));
        tcp.chain(udp).collect()
    }

    /// Starts serving on the provided [`ThreadGroup`].
    pub fn start(
        self,
        server: &Arc<Server>,
        group: &Arc<ThreadGroup>,
    ) -> Result<(), crate::thread::Error> {
        if !self.tcp_listeners.is_empty() {
            let queue = group.start_queue(self.config.tcp_backlog)?;
            for i in 0..self.config.tcp_workers {
                let queue = queue.clone();
                let server = server.clone();
                let task = move || run_tcp_worker(&queue, &server);
                group.start_respawnable(format!("tcp worker {}", i), task)?;
            }
            for (i, listener) in self.tcp_listeners.into_iter().enumerate() {
                let queue = queue.clone();
                let group_clone = group.clone();
                let task = move || {
                    log_io_errors(run_tcp_listener(&group_clone, &queue, &listener));
                };
                group.start_respawnable(format!("tcp listener {}", i), task)?;
            }
        }

        for (i, udp_socket) in self.udp_sockets.into_iter().enumerate() {
            for j in 0..self.config.udp_workers_per_socket {
                let group_clone = group.clone();
                let server = server.clone();
                let udp_socket = udp_socket.clone();
                let task = move || {
                    log_io_errors(run_udp_worker(&group_clone, &server, udp_socket.clone()));
                };
                group.start_respawnable(format!("udp worker {}/{}", i, j), task)?;
            }
        }

        info!("Serving with the blocking I/O provider.");
        Ok(())
    }
}

/// The longest a listener or UDP worker blocks before checking for
/// shutdown.
const CHECK_FOR_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a client may take to send a complete message over TCP
/// before the connection is closed.
const READ_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a response write over TCP may stall before the connection
/// is closed.
const WRITE_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// The TCP accept loop.
fn run_tcp_listener(
    group: &ThreadGroup,
    queue: &WorkQueue<TcpStream>,
    listener: &TcpListener,
) -> io::Result<()> {
    loop {
        if group.is_shutting_down() {
            return Ok(());
        }

        // Without poll_accept support, this returns true at once and
        // accept blocks (the listener is then in blocking mode).
        if !listener.poll_accept(CHECK_FOR_SHUTDOWN_TIMEOUT)? {
            continue;
        }
        loop {
            let (client, peer) = match retry_if_interrupted(|| listener.accept()) {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            };
            match queue.push(client) {
                Ok(()) => (),
                Err(PushError::Full(_)) => {
                    debug!("Closing TCP connection from {}: no worker available.", peer)
                }
                Err(PushError::Closed(_)) => return Ok(()),
            }
        }
    }
}

/// The loop of a TCP worker, serving one connection at a time.
fn run_tcp_worker(queue: &WorkQueue<TcpStream>, server: &Server) {
    let mut context = Context::new();
    let mut buf = vec![0; 2 + MAX_MESSAGE_SIZE];
    while let Some(stream) = queue.pop() {
        log_io_errors(handle_tcp_connection(queue, server, stream, &mut context, &mut buf));
    }
}

/// Serves the messages of one TCP connection until the client closes
/// it, stalls, or sends something that merits no response.
fn handle_tcp_connection(
    queue: &WorkQueue<TcpStream>,
    server: &Server,
    mut stream: TcpStream,
    context: &mut Context,
    buf: &mut [u8],
) -> io::Result<()> {
    prepare_tcp_stream(&stream)?;
    let mut n_read = 0;

    loop {
        let deadline = Instant::now() + READ_MESSAGE_TIMEOUT;

        // A pipelining client may already have sent the next message
        // (or part of it), so check what is buffered before reading.
        let message_len = loop {
            if n_read >= 2 {
                let message_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
                if n_read >= 2 + message_len {
                    break message_len;
                }
            }
            let timeout = match deadline.checked_duration_since(Instant::now()) {
                Some(timeout) if !timeout.is_zero() => timeout,
                _ => return Ok(()),
            };
            stream.set_read_timeout(Some(timeout))?;
            match stream.read(&mut buf[n_read..]) {
                Ok(0) => return Ok(()),
                Ok(n) => n_read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Ok(()),
                Err(e) => return Err(e),
            }
        };

        let message = &buf[2..2 + message_len];
        match server.handle_message(message, Transport::Tcp, context) {
            Some(response) => {
                let prefix = (response.len() as u16).to_be_bytes();
                if !write_response(&mut stream, [&prefix, response.head(), response.body()])? {
                    return Ok(());
                }
            }
            None => return Ok(()),
        }

        if queue.is_closed() {
            return Ok(());
        }

        let consumed = 2 + message_len;
        buf.copy_within(consumed..n_read, 0);
        n_read -= consumed;
    }
}

/// Puts an accepted stream in blocking mode, which it may have
/// inherited from the listener, and bounds how long writes may block.
fn prepare_tcp_stream(stream: &TcpStream) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(WRITE_RESPONSE_TIMEOUT))
}

/// Writes a length-prefixed response. Returns `Ok(false)` if the client
/// stopped reading long enough for the write to time out, in which case
/// the connection should be closed.
fn write_response(stream: &mut TcpStream, parts: [&[u8]; 3]) -> io::Result<bool> {
    match write_all_parts(stream, parts) {
        Ok(()) => Ok(true),
        Err(e) if is_timeout(&e) => {
            if let Ok(peer) = stream.peer_addr() {
                debug!("Closing TCP connection from {}: response write timed out.", peer);
            }
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Returns whether `e` is how a socket timeout is reported. This is
/// `WouldBlock` on Unix and `TimedOut` on Windows.
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// The UDP receive/handle/send loop.
fn run_udp_worker(group: &ThreadGroup, server: &Server, mut socket: UdpSocket) -> io::Result<()> {
    let mut context = Context::new();
    let mut buf = vec![0; MAX_MESSAGE_SIZE];

    loop {
        if group.is_shutting_down() {
            return Ok(());
        }

        // On interruption, go back around to check for shutdown rather
        // than retrying right away.
        let (len, src) = match socket.recv(&mut buf) {
            Ok(received) => received,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(e) => return Err(e),
        };

        if let Some(response) = server.handle_message(&buf[..len], Transport::Udp, &mut context) {
            log_io_errors(retry_if_interrupted(|| {
                socket.send_parts(response.parts(), src)
            }));
        }
    }
}

/// Executes `f`, retrying the operation if it is interrupted.
fn retry_if_interrupted<F, R>(mut f: F) -> io::Result<R>
where
    F: FnMut() -> io::Result<R>,
{
    loop {
        match f() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Logs the error, if any, that a task ended with.
fn log_io_errors<T>(result: io::Result<T>) {
    if let Err(e) = result {
        let current_thread = thread::current();
        let thread_name = current_thread.name().unwrap_or("anonymous thread");
        error!("I/O error in thread {}: {}", thread_name, e);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::{Ipv4Addr, UdpSocket as StdUdpSocket};

    use super::*;
    use crate::fixtures::ROOT_ZONE;
    use crate::index::{SharedIndex, ZoneIndex};
    use crate::message::{Rcode, Reader};

    const ROOT_SOA_QUERY: &[u8] = b"\xbe\xef\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00\x06\x00\x01";

    fn start() -> (Arc<ThreadGroup>, Vec<(Transport, SocketAddr)>) {
        let shared = Arc::new(SharedIndex::new());
        shared.publish(ZoneIndex::build(&ROOT_ZONE, true).unwrap());
        let server = Arc::new(Server::new(shared));
        let localhost: SocketAddr = (Ipv4Addr::LOCALHOST, 0).into();
        let config = BlockingIoConfig {
            udp_workers_per_socket: 1,
            tcp_workers: 1,
            tcp_backlog: 4,
        };
        let provider = BlockingIoProvider::bind(config, [localhost], [localhost]).unwrap();
        let addrs = provider.local_addrs().unwrap();
        let group = ThreadGroup::new();
        provider.start(&server, &group).unwrap();
        (group, addrs)
    }

    fn check_soa_response(response: &[u8]) {
        let reader = Reader::try_from(response).unwrap();
        assert_eq!(reader.id(), 0xbeef);
        assert!(reader.qr());
        assert_eq!(reader.rcode(), Rcode::NoError);
        assert_eq!(reader.ancount(), 1);
    }

    #[test]
    fn provider_answers_over_udp_and_tcp() {
        let (group, addrs) = start();
        assert_eq!(addrs.len(), 2);
        let (_, tcp_addr) = addrs[0];
        let (_, udp_addr) = addrs[1];

        let client = StdUdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.send_to(ROOT_SOA_QUERY, udp_addr).unwrap();
        let mut buf = [0; 512];
        let len = client.recv(&mut buf).unwrap();
        check_soa_response(&buf[..len]);

        // Two pipelined queries on one connection.
        let mut stream = TcpStream::connect(tcp_addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut request = Vec::new();
        for _ in 0..2 {
            request.extend_from_slice(&(ROOT_SOA_QUERY.len() as u16).to_be_bytes());
            request.extend_from_slice(ROOT_SOA_QUERY);
        }
        stream.write_all(&request).unwrap();
        for _ in 0..2 {
            let mut prefix = [0; 2];
            stream.read_exact(&mut prefix).unwrap();
            let mut response = vec![0; u16::from_be_bytes(prefix) as usize];
            stream.read_exact(&mut response).unwrap();
            check_soa_response(&response);
        }
        drop(stream);

        group.shut_down();
        if BlockingIoProvider::SUPPORTS_GRACEFUL_SHUTDOWN {
            group.await_shutdown();
        }
    }

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        (server_side, client)
    }

    #[test]
    fn accepted_streams_get_a_write_timeout() {
        let (server_side, _client) = connected_pair();
        server_side.set_nonblocking(true).unwrap();
        prepare_tcp_stream(&server_side).unwrap();
        assert_eq!(server_side.write_timeout().unwrap(), Some(WRITE_RESPONSE_TIMEOUT));
    }

    #[test]
    fn writes_to_a_client_that_never_reads_give_up() {
        let (mut server_side, client) = connected_pair();
        server_side
            .set_write_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        // Far more than the socket buffers of both ends can hold.
        let body = vec![0; 64 << 20];
        let start = Instant::now();
        assert!(!write_response(&mut server_side, [b"\x00\x00", b"", &body]).unwrap());
        assert!(start.elapsed() < Duration::from_secs(30));
        drop(client);
    }
}
