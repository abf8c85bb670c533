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

//! Target-specific socket support.
//!
//! Two socket features used by the [blocking I/O
//! provider](super::BlockingIoProvider) go beyond what the Rust
//! standard library offers:
//!
//! 1. **Accepting with a timeout.** TCP listeners implement
//!    `poll_accept`, which waits for a connection for a bounded time so
//!    that listener threads notice shutdown. Without it, graceful
//!    shutdown is not possible.
//!
//! 2. **Scatter-gather output.** A response is a per-query head and a
//!    shared, precomputed body (see [`Response`](crate::server::Response)).
//!    Where the target supports it, both are handed to the kernel in a
//!    single `sendmsg` or `writev` call, so the body is never copied.
//!    Elsewhere the parts are joined in a per-socket buffer first.
//!
//! Both are available on **Unix** targets.

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// The API that the concrete, target-specific [`TcpListener`] must
/// implement.
pub(crate) trait TcpListenerApi: Sized {
    /// Whether this implementation has a functional
    /// [`poll_accept`](TcpListenerApi::poll_accept) method.
    const POLL_ACCEPT_WORKS: bool;

    fn bind(addr: SocketAddr) -> io::Result<Self>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    /// Blocks until a new connection is available, the timeout expires,
    /// or the call is interrupted, and returns whether a connection is
    /// available. Implementations that cannot wait return `Ok(true)`
    /// immediately.
    fn poll_accept(&self, timeout: Duration) -> io::Result<bool>;

    fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

/// The API that the concrete, target-specific [`UdpSocket`] must
/// implement. Clones share the underlying socket.
pub(crate) trait UdpSocketApi: Clone + Sized {
    fn bind(addr: SocketAddr) -> io::Result<Self>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Receives a datagram, returning its length and source.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Sends one datagram made of `parts` in order.
    fn send_parts(&mut self, parts: [&[u8]; 2], dest: SocketAddr) -> io::Result<usize>;
}

/// The implementation of [`TcpListener`] for this target.
#[cfg_attr(unix, path = "unix_tcp.rs")]
#[cfg_attr(not(unix), path = "std_tcp.rs")]
mod tcp_impl;

/// The implementation of [`UdpSocket`] for this target.
#[cfg_attr(unix, path = "unix_udp.rs")]
#[cfg_attr(not(unix), path = "std_udp.rs")]
mod udp_impl;

pub(crate) use tcp_impl::{write_all_parts, TcpListener};
pub(crate) use udp_impl::UdpSocket;
