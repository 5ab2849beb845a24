/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};
use tokio::io::AsyncReadExt;

use g3_ftp_stream::{FtpFileStream, FtpStreamConfig, FtpStreamMode, TcpConnectionProvider};

pub(crate) const COMMAND: &str = "put";

const COMMAND_ARG_URL: &str = "url";
const COMMAND_ARG_FILE: &str = "file";

pub(crate) fn command() -> Command {
    Command::new(COMMAND)
        .about("upload a file")
        .arg(
            Arg::new(COMMAND_ARG_URL)
                .help("ftp url of the remote file")
                .num_args(1)
                .value_name("URL")
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_FILE)
                .help("local file to upload")
                .num_args(1)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
}

pub(crate) async fn run(
    args: &ArgMatches,
    provider: TcpConnectionProvider,
    config: Arc<FtpStreamConfig>,
) -> anyhow::Result<()> {
    let url = crate::resolve_url(args, COMMAND_ARG_URL)?;
    let path = args.get_one::<PathBuf>(COMMAND_ARG_FILE).unwrap();

    let mut file = tokio::fs::File::open(path)
        .await
        .context("unable to open the local file")?;
    let mut stream = FtpFileStream::open(&url, FtpStreamMode::Write, provider, (), config)
        .await
        .map_err(|e| anyhow!("unable to open {url}: {e}"))?;

    let mut buf = vec![0u8; 32 * 1024];
    let mut copied: u64 = 0;
    loop {
        let nr = file
            .read(&mut buf)
            .await
            .context("unable to read the local file")?;
        if nr == 0 {
            break;
        }
        let mut offset = 0;
        while offset < nr {
            let nw = stream
                .write(&buf[offset..nr])
                .await
                .map_err(|e| anyhow!("write failed after {copied} bytes: {e}"))?;
            if nw == 0 {
                return Err(anyhow!("write stalled after {copied} bytes"));
            }
            offset += nw;
            copied += nw as u64;
        }
    }
    if copied > 0 {
        stream
            .shutdown()
            .await
            .map_err(|e| anyhow!("unable to finish the upload: {e}"))?;
    }
    stream.close();

    log::info!("uploaded {copied} bytes");
    Ok(())
}
