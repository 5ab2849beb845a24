/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use g3_ftp_stream::{FtpFileStream, FtpStreamConfig, FtpStreamMode, TcpConnectionProvider};

pub(crate) const COMMAND: &str = "get";

const COMMAND_ARG_URL: &str = "url";
const COMMAND_ARG_OUTPUT: &str = "output";
const COMMAND_ARG_OFFSET: &str = "offset";

pub(crate) fn command() -> Command {
    Command::new(COMMAND)
        .about("download a file")
        .arg(
            Arg::new(COMMAND_ARG_URL)
                .help("ftp url of the remote file")
                .num_args(1)
                .value_name("URL")
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_OUTPUT)
                .help("local output file, stdout when not set")
                .num_args(1)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .short('o')
                .long("output"),
        )
        .arg(
            Arg::new(COMMAND_ARG_OFFSET)
                .help("start reading at this byte offset")
                .num_args(1)
                .value_name("OFFSET")
                .value_parser(value_parser!(u64))
                .long("offset"),
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

    if let Some(offset) = args.get_one::<u64>(COMMAND_ARG_OFFSET) {
        stream
            .seek(SeekFrom::Start(*offset))
            .await
            .map_err(|e| anyhow!("unable to seek to offset {offset}: {e}"))?;
    }

    let mut output: Box<dyn AsyncWrite + Unpin> = match args.get_one::<PathBuf>(COMMAND_ARG_OUTPUT)
    {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .context("unable to create the output file")?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut buf = vec![0u8; 32 * 1024];
    let mut copied: u64 = 0;
    loop {
        let nr = stream
            .read(&mut buf)
            .await
            .map_err(|e| anyhow!("read failed after {copied} bytes: {e}"))?;
        if nr == 0 {
            break;
        }
        output
            .write_all(&buf[..nr])
            .await
            .context("unable to write the output file")?;
        copied += nr as u64;
        if stream.size().is_some_and(|size| stream.position() >= size) {
            break;
        }
    }
    output.flush().await.context("unable to flush the output")?;
    stream.close();

    log::info!("downloaded {copied} bytes");
    Ok(())
}
