/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::FtpControlConfig;
use crate::error::{FtpCommandError, FtpLineError};

mod command;
pub(crate) use command::FtpCommand;

mod line;
use line::{LineReader, WaitMode};

mod response;
use response::FtpReply;

/// how long and how often to poll for a delayed status line once the
/// server has started talking
const REPLY_WAIT_MAX_POLLS: usize = 100;
const REPLY_WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite,
{
    config: FtpControlConfig,
    stream: T,
    reader: LineReader,
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: T, config: FtpControlConfig) -> Self {
        let reader = LineReader::new(config.max_line_len);
        FtpControlChannel {
            config,
            stream,
            reader,
        }
    }

    /// Collect reply lines until one carries a code from `expected`.
    ///
    /// Servers may interleave informational lines with the authoritative
    /// status line, so every available line is scanned. The first line is
    /// awaited, later ones are only drained; once the server has started
    /// talking but the expected code has not shown up yet, the drain is
    /// retried on a short interval for a bounded while.
    async fn read_reply(
        &mut self,
        cmd: FtpCommand,
        expected: &[u16],
    ) -> Result<FtpReply, FtpCommandError> {
        let mut matched: Option<FtpReply> = None;
        let mut mode = WaitMode::Blocking;
        let mut wait_count = REPLY_WAIT_MAX_POLLS;

        loop {
            match self.reader.read_line(&mut self.stream, mode).await {
                Ok(line) => {
                    // first line received, get the rest without waiting
                    mode = WaitMode::Drain;

                    #[cfg(feature = "log-raw-io")]
                    crate::debug::log_rsp(&line);

                    if matched.is_none() {
                        if let Some(code) = response::parse_reply_code(&line) {
                            if expected.contains(&code) {
                                matched = Some(FtpReply { code, line });
                            }
                        }
                    }
                }
                Err(FtpLineError::NoLineAvailable) => {
                    if let Some(reply) = matched.take() {
                        return Ok(reply);
                    }
                    if wait_count == 0 {
                        return Err(FtpCommandError::NoExpectedReply(cmd));
                    }
                    wait_count -= 1;
                    tokio::time::sleep(REPLY_WAIT_POLL_INTERVAL).await;
                }
                Err(e) => {
                    // a found match wins over whatever ends the drain
                    return match matched.take() {
                        Some(reply) => Ok(reply),
                        None => Err(e.into()),
                    };
                }
            }
        }
    }

    async fn timed_read_reply(
        &mut self,
        cmd: FtpCommand,
        expected: &[u16],
    ) -> Result<FtpReply, FtpCommandError> {
        match tokio::time::timeout(self.config.command_timeout, self.read_reply(cmd, expected))
            .await
        {
            Ok(r) => r,
            Err(_) => Err(FtpCommandError::ReplyTimedOut(cmd)),
        }
    }

    /// Send a command and wait for a reply carrying one of the expected
    /// codes. Stray input left over from an earlier exchange is flushed
    /// first so it cannot be taken for the new reply.
    async fn exchange(
        &mut self,
        cmd: FtpCommand,
        expected: &[u16],
    ) -> Result<FtpReply, FtpCommandError> {
        self.reader.flush_available_input(&mut self.stream).await?;
        self.send_cmd(cmd)
            .await
            .map_err(FtpCommandError::SendFailed)?;
        self.timed_read_reply(cmd, expected).await
    }

    async fn exchange1(
        &mut self,
        cmd: FtpCommand,
        param1: &str,
        expected: &[u16],
    ) -> Result<FtpReply, FtpCommandError> {
        self.reader.flush_available_input(&mut self.stream).await?;
        self.send_cmd1(cmd, param1)
            .await
            .map_err(FtpCommandError::SendFailed)?;
        self.timed_read_reply(cmd, expected).await
    }

    /// Wait for the 220 service-ready greeting. Early chatter before it is
    /// ridden out by the reply poll loop.
    pub(crate) async fn wait_greetings(&mut self) -> Result<(), FtpCommandError> {
        self.read_reply(FtpCommand::GREETING, &[220]).await?;
        Ok(())
    }

    /// Returns the reply code, 331 when a password is required next.
    pub(crate) async fn send_username(&mut self, name: &str) -> Result<u16, FtpCommandError> {
        let reply = self.exchange1(FtpCommand::USER, name, &[331, 230]).await?;
        Ok(reply.code)
    }

    pub(crate) async fn send_password(&mut self, pass: &str) -> Result<(), FtpCommandError> {
        self.exchange1(FtpCommand::PASS, pass, &[230]).await?;
        Ok(())
    }

    pub(crate) async fn request_binary_type(&mut self) -> Result<(), FtpCommandError> {
        self.exchange(FtpCommand::TYPE_I, &[200]).await?;
        Ok(())
    }

    pub(crate) async fn request_working_directory(&mut self) -> Result<String, FtpCommandError> {
        let reply = self.exchange(FtpCommand::PWD, &[257]).await?;
        response::parse_pwd_reply(&reply.line)
            .ok_or(FtpCommandError::InvalidReplySyntax(FtpCommand::PWD, 257))
    }

    pub(crate) async fn request_size(&mut self, path: &str) -> Result<u64, FtpCommandError> {
        let reply = self.exchange1(FtpCommand::SIZE, path, &[213]).await?;
        response::parse_size_reply(&reply.line)
            .ok_or(FtpCommandError::InvalidReplySyntax(FtpCommand::SIZE, 213))
    }

    pub(crate) async fn request_pasv_port(&mut self) -> Result<u16, FtpCommandError> {
        let reply = self.exchange(FtpCommand::PASV, &[227]).await?;
        response::parse_pasv_reply(&reply.line)
            .ok_or(FtpCommandError::InvalidReplySyntax(FtpCommand::PASV, 227))
    }

    pub(crate) async fn request_restart(&mut self, position: u64) -> Result<(), FtpCommandError> {
        self.exchange1(FtpCommand::REST, &position.to_string(), &[350])
            .await?;
        Ok(())
    }

    pub(crate) async fn start_retrieve(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.exchange1(FtpCommand::RETR, path, &[150]).await?;
        Ok(())
    }

    pub(crate) async fn start_store(&mut self, path: &str) -> Result<(), FtpCommandError> {
        self.exchange1(FtpCommand::STOR, path, &[150]).await?;
        Ok(())
    }
}
