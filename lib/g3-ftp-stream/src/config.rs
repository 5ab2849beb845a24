/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

const DEFAULT_MAX_LINE_LEN: usize = 1024;
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_GREETING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct FtpControlConfig {
    /// reply lines longer than this are truncated, not rejected
    pub max_line_len: usize,
    pub command_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FtpStreamConfig {
    pub control: FtpControlConfig,
    pub connect_timeout: Duration,
    pub greeting_timeout: Duration,
    /// upload resume is not generally safe, so write streams stay
    /// non-seekable unless this is set
    pub write_seekable: bool,
    /// password sent for anonymous logins, an email address should be used
    pub anonymous_password: Option<String>,
}

impl Default for FtpStreamConfig {
    fn default() -> Self {
        FtpStreamConfig {
            control: FtpControlConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            greeting_timeout: DEFAULT_GREETING_TIMEOUT,
            write_seekable: false,
            anonymous_password: None,
        }
    }
}
