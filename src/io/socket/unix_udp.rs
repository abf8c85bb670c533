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

use std::io::{self, IoSlice};
use std::net::{self, SocketAddr};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::socket::{sendmsg, MsgFlags, SockaddrStorage};

use super::UdpSocketApi;

/// A UDP socket that sends responses with `sendmsg`, gathering the
/// head and body of a response without copying them.
#[derive(Clone)]
pub struct UdpSocket(Arc<net::UdpSocket>);

impl UdpSocketApi for UdpSocket {
    fn bind(addr: SocketAddr) -> io::Result<Self> {
        net::UdpSocket::bind(addr).map(Arc::new).map(Self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.0.set_read_timeout(timeout)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.0.recv_from(buf)
    }

    fn send_parts(&mut self, parts: [&[u8]; 2], dest: SocketAddr) -> io::Result<usize> {
        let iov = parts.map(IoSlice::new);
        let dest = SockaddrStorage::from(dest);
        sendmsg(
            self.0.as_raw_fd(),
            &iov,
            &[],
            MsgFlags::empty(),
            Some(&dest),
        )
        .map_err(Into::into)
    }
}
