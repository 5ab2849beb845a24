/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};

use g3_ftp_stream::{FtpFileStream, FtpStreamConfig, FtpStreamMode, TcpConnectionProvider};

pub(crate) const COMMAND: &str = "stat";

const COMMAND_ARG_URL: &str = "url";

pub(crate) fn command() -> Command {
    Command::new(COMMAND).about("show remote file info").arg(
        Arg::new(COMMAND_ARG_URL)
            .help("ftp url of the remote file")
            .num_args(1)
            .value_name("URL")
            .required(true),
    )
}

pub(crate) async fn run(
    args: &ArgMatches,
    provider: TcpConnectionProvider,
    config: Arc<FtpStreamConfig>,
) -> anyhow::Result<()> {
    let url = crate::resolve_url(args, COMMAND_ARG_URL)?;

    let mut stream = FtpFileStream::open(&url, FtpStreamMode::Read, provider, (), config)
        .await
        .map_err(|e| anyhow!("unable to open {url}: {e}"))?;

    match stream.size() {
        Some(size) => println!("size: {size}"),
        None => println!("size: unknown"),
    }
    println!("seekable: {}", !stream.is_streamed());
    stream.close();

    Ok(())
}
