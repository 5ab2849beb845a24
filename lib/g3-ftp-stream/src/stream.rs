/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::io::SeekFrom;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use url::Url;

use crate::config::FtpStreamConfig;
use crate::connection::{FtpConnectionProvider, FtpEndpoint};
use crate::error::FtpStreamError;
use crate::session::{FtpTransferSession, TransferState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FtpStreamMode {
    Read,
    Write,
}

struct UrlParts {
    endpoint: FtpEndpoint,
    username: Option<String>,
    password: Option<String>,
    path: String,
}

fn split_url<E: Error>(raw: &str) -> Result<UrlParts, FtpStreamError<E>> {
    let url = Url::parse(raw)?;
    if url.scheme() != "ftp" {
        return Err(FtpStreamError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = url.host_str().ok_or(FtpStreamError::NoHostInUrl)?.to_string();
    let port = url.port_or_known_default().unwrap_or(21);
    let username = (!url.username().is_empty()).then(|| url.username().to_string());
    let password = url.password().map(|p| p.to_string());
    Ok(UrlParts {
        endpoint: FtpEndpoint::new(host, port),
        username,
        password,
        path: url.path().to_string(),
    })
}

/// A single remote file reachable over `ftp://`, usable as a byte stream
/// that can seek when the server lets it.
///
/// All methods borrow the stream mutably, one operation runs at a time.
pub struct FtpFileStream<C, T, E, UD>
where
    T: AsyncRead + AsyncWrite,
    E: Error,
    C: FtpConnectionProvider<T, E, UD>,
{
    config: Arc<FtpStreamConfig>,
    session: FtpTransferSession<C, T, E, UD>,
    mode: FtpStreamMode,
    streamed: bool,
}

impl<C, T, E, UD> std::fmt::Debug for FtpFileStream<C, T, E, UD>
where
    T: AsyncRead + AsyncWrite,
    E: Error,
    C: FtpConnectionProvider<T, E, UD>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpFileStream")
            .field("mode", &self.mode)
            .field("streamed", &self.streamed)
            .finish_non_exhaustive()
    }
}

impl<C, T, E, UD> FtpFileStream<C, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Unpin,
    E: Error,
    C: FtpConnectionProvider<T, E, UD>,
{
    /// Open `ftp://[user[:password]@]host[:port]/path` for reading or
    /// writing.
    ///
    /// The control connection is established and logged in right away, the
    /// data connection only once the first read or write needs it. A
    /// failed open holds on to nothing.
    pub async fn open(
        url: &str,
        mode: FtpStreamMode,
        provider: C,
        user_data: UD,
        config: Arc<FtpStreamConfig>,
    ) -> Result<Self, FtpStreamError<E>> {
        let parts = split_url(url)?;
        let session = FtpTransferSession::new(
            parts.endpoint,
            parts.username,
            parts.password,
            provider,
            user_data,
            Arc::clone(&config),
        );
        let mut stream = FtpFileStream {
            config,
            session,
            mode,
            streamed: false,
        };
        match stream.init(&parts.path).await {
            Ok(()) => Ok(stream),
            Err(e) => {
                stream.session.close_both();
                Err(e)
            }
        }
    }

    async fn init(&mut self, url_path: &str) -> Result<(), FtpStreamError<E>> {
        self.session.connect_control().await?;
        self.session.discover_working_directory().await?;
        self.session.append_resource_path(url_path);

        let size_known = self.session.query_size().await.is_ok();
        match self.mode {
            FtpStreamMode::Read => {
                if !size_known {
                    // without a known size the stream can only go forward
                    self.streamed = true;
                }
            }
            FtpStreamMode::Write => {
                if !self.config.write_seekable {
                    self.streamed = true;
                }
            }
        }
        Ok(())
    }

    /// Read from the remote file at the current position.
    ///
    /// A data connection and a RETR transfer are set up on demand. When a
    /// seekable stream gets an empty read below the known size the server
    /// has dropped an idle data connection; the transfer is restarted at
    /// the same position and retried once, a second empty read goes back
    /// to the caller untouched.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FtpStreamError<E>> {
        let mut retry_done = false;
        loop {
            if self.session.state() == TransferState::Disconnected {
                self.session.open_data_connection().await?;
            }
            if self.session.state() == TransferState::Ready {
                self.session.begin_retrieve().await?;
            }
            if self.session.state() != TransferState::Downloading {
                return Err(FtpStreamError::NotReady);
            }

            let nr = self.session.read_data(buf).await?;
            if let Some(size) = self.session.filesize() {
                if self.session.position() >= size {
                    // the server closes the data stream once it is drained,
                    // get the control connection back in shape first
                    self.session.abort_and_reconnect().await?;
                } else if nr == 0 && !self.streamed {
                    let position = self.session.position();
                    log::info!("ftp server closed the data connection, reconnecting");
                    self.session.abort_and_reconnect().await?;
                    self.seek(SeekFrom::Start(position)).await?;
                    if !retry_done {
                        retry_done = true;
                        continue;
                    }
                }
            }
            return Ok(nr);
        }
    }

    /// Write to the remote file at the current position. A data connection
    /// and a STOR transfer are set up on demand.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, FtpStreamError<E>> {
        if self.session.state() == TransferState::Disconnected {
            self.session.open_data_connection().await?;
        }
        if self.session.state() == TransferState::Ready {
            self.session.begin_store().await?;
        }
        if self.session.state() != TransferState::Uploading {
            return Err(FtpStreamError::NotReady);
        }
        self.session.write_data(buf).await
    }

    /// Move the stream position.
    ///
    /// `SeekFrom::End` needs a known file size. The target is clamped to
    /// the file bounds. Moving away from the current position cuts a
    /// running transfer by a full reconnect; the data connection reopens
    /// lazily on the next read or write.
    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64, FtpStreamError<E>> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.session.position() as i128 + delta as i128,
            SeekFrom::End(delta) => {
                let Some(size) = self.session.filesize() else {
                    return Err(FtpStreamError::SizeUnknown);
                };
                size as i128 + delta as i128
            }
        };

        if self.streamed {
            return Err(FtpStreamError::NotSeekable);
        }

        let mut target = target.max(0) as u64;
        if let Some(size) = self.session.filesize() {
            target = target.min(size);
        }

        if target != self.session.position() {
            self.session.abort_and_reconnect().await?;
            self.session.set_position(target);
        }
        Ok(target)
    }

    /// The known file size. Costs no socket activity; `None` until a SIZE
    /// reply or a write established one.
    pub fn size(&self) -> Option<u64> {
        self.session.filesize()
    }

    pub fn position(&self) -> u64 {
        self.session.position()
    }

    /// Whether seeking is unsupported on this stream.
    pub fn is_streamed(&self) -> bool {
        self.streamed
    }

    pub fn connection_provider(&self) -> &C {
        self.session.provider()
    }

    /// Forward a write-half shutdown to the data connection.
    pub async fn shutdown(&mut self) -> Result<(), FtpStreamError<E>> {
        self.session.shutdown_data().await
    }

    /// Drop both connections. Idempotent; dropping the stream does the
    /// same.
    pub fn close(&mut self) {
        self.session.close_both();
    }
}

#[cfg(unix)]
impl<C, T, E, UD> FtpFileStream<C, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Unpin + std::os::fd::AsRawFd,
    E: Error,
    C: FtpConnectionProvider<T, E, UD>,
{
    /// The raw descriptor of the data connection, for callers that poll it
    /// themselves.
    pub fn native_handle(&self) -> Result<std::os::fd::RawFd, FtpStreamError<E>> {
        self.session
            .data_native_handle()
            .ok_or(FtpStreamError::NoDataConnection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_split() {
        let parts = split_url::<std::io::Error>("ftp://u:p@host:2121/dir/file.bin").unwrap();
        assert_eq!(parts.endpoint, FtpEndpoint::new("host".to_string(), 2121));
        assert_eq!(parts.username.as_deref(), Some("u"));
        assert_eq!(parts.password.as_deref(), Some("p"));
        assert_eq!(parts.path, "/dir/file.bin");
    }

    #[test]
    fn url_split_defaults() {
        let parts = split_url::<std::io::Error>("ftp://host/file").unwrap();
        assert_eq!(parts.endpoint.port(), 21);
        assert!(parts.username.is_none());
        assert!(parts.password.is_none());
        assert_eq!(parts.path, "/file");
    }

    #[test]
    fn url_split_rejects() {
        assert!(matches!(
            split_url::<std::io::Error>("http://host/file"),
            Err(FtpStreamError::UnsupportedScheme(_))
        ));
        assert!(split_url::<std::io::Error>("not a url").is_err());
    }
}
