/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::FtpStreamConfig;
use crate::connection::{FtpConnectionProvider, FtpEndpoint};
use crate::control::FtpControlChannel;
use crate::error::{FtpCommandError, FtpConnectError, FtpStreamError};
use crate::log_msg;

const DEFAULT_ANONYMOUS_PASSWORD: &str = "nopassword";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TransferState {
    Disconnected,
    Ready,
    Downloading,
    Uploading,
}

/// One logged-in control connection plus at most one data connection,
/// tracking the byte position inside a single remote file.
pub(crate) struct FtpTransferSession<C, T, E, UD>
where
    T: AsyncRead + AsyncWrite,
    E: Error,
    C: FtpConnectionProvider<T, E, UD>,
{
    config: Arc<FtpStreamConfig>,
    provider: C,
    user_data: UD,
    endpoint: FtpEndpoint,
    username: Option<String>,
    password: Option<String>,
    path: String,
    control: Option<FtpControlChannel<T>>,
    data: Option<T>,
    data_port: Option<u16>,
    filesize: Option<u64>,
    position: u64,
    state: TransferState,
    _e: PhantomData<E>,
}

impl<C, T, E, UD> FtpTransferSession<C, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Unpin,
    E: Error,
    C: FtpConnectionProvider<T, E, UD>,
{
    pub(crate) fn new(
        endpoint: FtpEndpoint,
        username: Option<String>,
        password: Option<String>,
        provider: C,
        user_data: UD,
        config: Arc<FtpStreamConfig>,
    ) -> Self {
        FtpTransferSession {
            config,
            provider,
            user_data,
            endpoint,
            username,
            password,
            path: String::new(),
            control: None,
            data: None,
            data_port: None,
            filesize: None,
            position: 0,
            state: TransferState::Disconnected,
            _e: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> TransferState {
        self.state
    }

    #[inline]
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    #[inline]
    pub(crate) fn filesize(&self) -> Option<u64> {
        self.filesize
    }

    #[inline]
    pub(crate) fn provider(&self) -> &C {
        &self.provider
    }

    pub(crate) fn append_resource_path(&mut self, path: &str) {
        self.path.push_str(path);
    }

    fn control_channel(&mut self) -> Result<&mut FtpControlChannel<T>, FtpCommandError> {
        self.control.as_mut().ok_or(FtpCommandError::NotConnected)
    }

    /// Establish and negotiate the control connection. A no-op when one is
    /// already up.
    pub(crate) async fn connect_control(&mut self) -> Result<(), FtpConnectError<E>> {
        if self.control.is_some() {
            return Ok(());
        }

        log_msg!("connecting to {}", self.endpoint);
        let stream = match tokio::time::timeout(
            self.config.connect_timeout,
            self.provider
                .new_control_connection(&self.endpoint, &self.user_data),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(FtpConnectError::ConnectIoError(e)),
            Err(_) => return Err(FtpConnectError::ConnectTimedOut),
        };

        let mut control = FtpControlChannel::new(stream, self.config.control.clone());
        match tokio::time::timeout(self.config.greeting_timeout, control.wait_greetings()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(FtpConnectError::GreetingFailed(e)),
            Err(_) => return Err(FtpConnectError::GreetingTimedOut),
        }

        self.authenticate(&mut control).await?;
        control
            .request_binary_type()
            .await
            .map_err(FtpConnectError::NegotiationFailed)?;

        self.control = Some(control);
        Ok(())
    }

    async fn authenticate(
        &self,
        control: &mut FtpControlChannel<T>,
    ) -> Result<(), FtpConnectError<E>> {
        let anonymous_password;
        let (user, pass) = match self.username.as_deref() {
            Some(user) => (user, self.password.as_deref()),
            None => {
                anonymous_password = self
                    .config
                    .anonymous_password
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ANONYMOUS_PASSWORD.to_string());
                ("anonymous", Some(anonymous_password.as_str()))
            }
        };

        let code = match control.send_username(user).await {
            Ok(code) => code,
            Err(FtpCommandError::NoExpectedReply(_)) => return Err(FtpConnectError::AccessDenied),
            Err(e) => return Err(FtpConnectError::NegotiationFailed(e)),
        };
        if code == 331 {
            let Some(pass) = pass else {
                return Err(FtpConnectError::AccessDenied);
            };
            match control.send_password(pass).await {
                Ok(()) => {}
                Err(FtpCommandError::NoExpectedReply(_)) => {
                    return Err(FtpConnectError::AccessDenied);
                }
                Err(e) => return Err(FtpConnectError::NegotiationFailed(e)),
            }
        }
        Ok(())
    }

    /// Ask for the server side working directory and keep it as the base of
    /// the resource path.
    pub(crate) async fn discover_working_directory(&mut self) -> Result<(), FtpCommandError> {
        let control = self.control_channel()?;
        let dir = control.request_working_directory().await?;
        self.path = dir;
        Ok(())
    }

    /// Ask for the size of the resource. On failure the size stays unknown,
    /// which read-mode callers treat as "not seekable".
    pub(crate) async fn query_size(&mut self) -> Result<(), FtpCommandError> {
        let control = self.control.as_mut().ok_or(FtpCommandError::NotConnected)?;
        match control.request_size(&self.path).await {
            Ok(size) => {
                self.filesize = Some(size);
                Ok(())
            }
            Err(e) => {
                self.filesize = None;
                Err(e)
            }
        }
    }

    async fn enter_passive_mode(&mut self) -> Result<(), FtpCommandError> {
        let control = self.control.as_mut().ok_or(FtpCommandError::NotConnected)?;
        match control.request_pasv_port().await {
            Ok(port) => {
                log_msg!("server data port: {}", port);
                self.data_port = Some(port);
                Ok(())
            }
            Err(e) => {
                self.data_port = None;
                Err(e)
            }
        }
    }

    /// Open the data connection via passive mode and restart the transfer
    /// at the current position when it is not zero. A no-op when a data
    /// connection already exists.
    pub(crate) async fn open_data_connection(&mut self) -> Result<(), FtpStreamError<E>> {
        if self.data.is_none() {
            self.enter_passive_mode().await?;
            let Some(port) = self.data_port else {
                return Err(FtpStreamError::NoDataConnection);
            };
            let data_endpoint = FtpEndpoint::new(self.endpoint.host().to_string(), port);

            let stream = match tokio::time::timeout(
                self.config.connect_timeout,
                self.provider
                    .new_data_connection(&data_endpoint, &self.user_data),
            )
            .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(FtpConnectError::ConnectIoError(e).into()),
                Err(_) => return Err(FtpConnectError::ConnectTimedOut.into()),
            };
            self.data = Some(stream);

            if self.position > 0 {
                let position = self.position;
                self.control_channel()?.request_restart(position).await?;
            }
        }
        self.state = TransferState::Ready;
        Ok(())
    }

    pub(crate) async fn begin_retrieve(&mut self) -> Result<(), FtpCommandError> {
        let control = self.control.as_mut().ok_or(FtpCommandError::NotConnected)?;
        control.start_retrieve(&self.path).await?;
        self.state = TransferState::Downloading;
        Ok(())
    }

    pub(crate) async fn begin_store(&mut self) -> Result<(), FtpCommandError> {
        let control = self.control.as_mut().ok_or(FtpCommandError::NotConnected)?;
        control.start_store(&self.path).await?;
        self.state = TransferState::Uploading;
        Ok(())
    }

    pub(crate) async fn read_data(&mut self, buf: &mut [u8]) -> Result<usize, FtpStreamError<E>> {
        let Some(data) = self.data.as_mut() else {
            return Err(FtpStreamError::NotReady);
        };
        let nr = data.read(buf).await.map_err(FtpStreamError::TransferIoFailed)?;
        self.position += nr as u64;
        Ok(nr)
    }

    pub(crate) async fn write_data(&mut self, buf: &[u8]) -> Result<usize, FtpStreamError<E>> {
        let Some(data) = self.data.as_mut() else {
            return Err(FtpStreamError::NotReady);
        };
        let nw = data
            .write(buf)
            .await
            .map_err(FtpStreamError::TransferIoFailed)?;
        self.position += nw as u64;
        // while uploading the known size is only a lower bound
        self.filesize = Some(self.filesize.map_or(self.position, |s| s.max(self.position)));
        Ok(nw)
    }

    pub(crate) async fn shutdown_data(&mut self) -> Result<(), FtpStreamError<E>> {
        let Some(data) = self.data.as_mut() else {
            return Err(FtpStreamError::NoDataConnection);
        };
        data.shutdown()
            .await
            .map_err(FtpStreamError::TransferIoFailed)
    }

    /// Drop both connections. Dropping closes the underlying sockets; any
    /// logical position is gone with them and has to be restored by the
    /// caller through a seek.
    pub(crate) fn close_both(&mut self) {
        self.control = None;
        self.data = None;
        self.position = 0;
        self.state = TransferState::Disconnected;
    }

    /// Tear down both connections and redial the control one. ABOR
    /// handshakes are unreliable across server implementations, closing
    /// and reconnecting is the robust way to resynchronize.
    pub(crate) async fn abort_and_reconnect(&mut self) -> Result<(), FtpConnectError<E>> {
        self.close_both();
        self.connect_control().await
    }
}

#[cfg(unix)]
impl<C, T, E, UD> FtpTransferSession<C, T, E, UD>
where
    T: AsyncRead + AsyncWrite + Unpin + std::os::fd::AsRawFd,
    E: Error,
    C: FtpConnectionProvider<T, E, UD>,
{
    pub(crate) fn data_native_handle(&self) -> Option<std::os::fd::RawFd> {
        use std::os::fd::AsRawFd;

        self.data.as_ref().map(|d| d.as_raw_fd())
    }
}
