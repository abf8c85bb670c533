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

use std::io;
use std::net::{self, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use super::UdpSocketApi;

/// A UDP socket implementation using the Rust standard library. The
/// parts of a datagram are joined in a buffer owned by each clone.
pub struct UdpSocket {
    socket: Arc<net::UdpSocket>,
    send_buf: Vec<u8>,
}

impl Clone for UdpSocket {
    fn clone(&self) -> Self {
        Self {
            socket: self.socket.clone(),
            send_buf: Vec::new(),
        }
    }
}

impl UdpSocketApi for UdpSocket {
    fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            socket: Arc::new(net::UdpSocket::bind(addr)?),
            send_buf: Vec::new(),
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf)
    }

    fn send_parts(&mut self, parts: [&[u8]; 2], dest: SocketAddr) -> io::Result<usize> {
        self.send_buf.clear();
        for part in parts {
            self.send_buf.extend_from_slice(part);
        }
        self.socket.send_to(&self.send_buf, dest)
    }
}
