/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpCommandError, FtpConnectError};

#[derive(Debug, Error)]
pub enum FtpStreamError<E: std::error::Error> {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported url scheme {0}")]
    UnsupportedScheme(String),
    #[error("no host found in url")]
    NoHostInUrl,
    #[error("connect failed: {0}")]
    ConnectFailed(FtpConnectError<E>),
    #[error("command failed: {0}")]
    CommandFailed(#[from] FtpCommandError),
    #[error("data transfer failed: {0:?}")]
    TransferIoFailed(io::Error),
    #[error("stream is not seekable")]
    NotSeekable,
    #[error("file size is not known")]
    SizeUnknown,
    #[error("no data connection")]
    NoDataConnection,
    #[error("data stream is not ready")]
    NotReady,
}

impl<E: std::error::Error> From<FtpConnectError<E>> for FtpStreamError<E> {
    fn from(e: FtpConnectError<E>) -> Self {
        FtpStreamError::ConnectFailed(e)
    }
}
