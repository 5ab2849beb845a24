/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod debug;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};

mod config;
pub use config::{FtpControlConfig, FtpStreamConfig};

mod connection;
pub use connection::{FtpConnectionProvider, FtpEndpoint, TcpConnectionProvider};

mod error;
pub use error::{FtpCommandError, FtpConnectError, FtpLineError, FtpStreamError};

mod control;

mod session;

mod stream;
pub use stream::{FtpFileStream, FtpStreamMode};
