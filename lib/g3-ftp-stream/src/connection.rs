/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream};

/// A host:port pair as found in the url, not necessarily resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FtpEndpoint {
    host: String,
    port: u16,
}

impl FtpEndpoint {
    pub fn new(host: String, port: u16) -> Self {
        FtpEndpoint { host, port }
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for FtpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[async_trait]
pub trait FtpConnectionProvider<T: AsyncRead + AsyncWrite, E: Error, UD> {
    async fn new_control_connection(
        &mut self,
        upstream: &FtpEndpoint,
        user_data: &UD,
    ) -> Result<T, E>;
    async fn new_data_connection(
        &mut self,
        server_addr: &FtpEndpoint,
        user_data: &UD,
    ) -> Result<T, E>;
}

#[derive(Default)]
pub struct TcpConnectionProvider {
    bind_ip: Option<IpAddr>,
    remote_addr: Option<SocketAddr>,
}

impl TcpConnectionProvider {
    pub fn new() -> Self {
        TcpConnectionProvider::default()
    }

    pub fn set_bind_ip(&mut self, ip: IpAddr) {
        self.bind_ip = Some(ip);
    }

    async fn connect(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        if let Some(ip) = self.bind_ip {
            socket.bind(SocketAddr::new(ip, 0))?;
        }
        socket.connect(addr).await
    }
}

#[async_trait]
impl FtpConnectionProvider<TcpStream, io::Error, ()> for TcpConnectionProvider {
    async fn new_control_connection(
        &mut self,
        upstream: &FtpEndpoint,
        _user_data: &(),
    ) -> io::Result<TcpStream> {
        let mut err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addr resolved");
        for addr in tokio::net::lookup_host((upstream.host(), upstream.port())).await? {
            match self.connect(addr).await {
                Ok(stream) => {
                    self.remote_addr = Some(addr);
                    return Ok(stream);
                }
                Err(e) => err = e,
            }
        }

        Err(err)
    }

    async fn new_data_connection(
        &mut self,
        server_addr: &FtpEndpoint,
        _user_data: &(),
    ) -> io::Result<TcpStream> {
        // connect to the address the control connection actually reached,
        // servers behind NAT tend to misreport their PASV address
        match self.remote_addr {
            Some(addr) => {
                self.connect(SocketAddr::new(addr.ip(), server_addr.port()))
                    .await
            }
            None => Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no resolved upstream addr found",
            )),
        }
    }
}
