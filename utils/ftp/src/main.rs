/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use url::Url;

use g3_ftp_stream::{FtpStreamConfig, TcpConnectionProvider};

mod logger;

mod cmd_get;
mod cmd_put;
mod cmd_stat;

const GLOBAL_ARG_USERNAME: &str = "username";
const GLOBAL_ARG_PASSWORD: &str = "password";
const GLOBAL_ARG_SOURCE_IP: &str = "source-ip";
const GLOBAL_ARG_VERBOSE: &str = "verbose";

fn build_cli_args() -> Command {
    Command::new("g3-ftp-stream-cli")
        .arg(
            Arg::new(GLOBAL_ARG_USERNAME)
                .help("FTP username")
                .num_args(1)
                .value_name("USERNAME")
                .short('u')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_PASSWORD)
                .help("FTP password")
                .num_args(1)
                .value_name("PASSWORD")
                .short('p')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SOURCE_IP)
                .help("source ip address")
                .num_args(1)
                .value_name("IP ADDRESS")
                .value_parser(value_parser!(IpAddr))
                .long("source")
                .short('s')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_VERBOSE)
                .help("show verbose message")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .global(true),
        )
        .subcommand(cmd_get::command())
        .subcommand(cmd_put::command())
        .subcommand(cmd_stat::command())
}

/// Fold the credential flags into the url, flags win over what the url
/// carries.
fn resolve_url(args: &ArgMatches, arg_name: &str) -> anyhow::Result<String> {
    let raw = args.get_one::<String>(arg_name).unwrap();
    let mut url = Url::parse(raw).map_err(|e| anyhow!("invalid url {raw}: {e}"))?;
    if let Some(user) = args.get_one::<String>(GLOBAL_ARG_USERNAME) {
        url.set_username(user)
            .map_err(|_| anyhow!("unable to set username on url {raw}"))?;
    }
    if let Some(pass) = args.get_one::<String>(GLOBAL_ARG_PASSWORD) {
        url.set_password(Some(pass))
            .map_err(|_| anyhow!("unable to set password on url {raw}"))?;
    }
    Ok(String::from(url))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = build_cli_args().get_matches();

    let verbose_level = args
        .get_one::<u8>(GLOBAL_ARG_VERBOSE)
        .copied()
        .unwrap_or_default();
    let logger = logger::SyncLogger::new(verbose_level);
    logger.into_global_logger().unwrap();

    let mut provider = TcpConnectionProvider::new();
    if let Some(ip) = args.get_one::<IpAddr>(GLOBAL_ARG_SOURCE_IP) {
        provider.set_bind_ip(*ip);
    }

    let config = Arc::new(FtpStreamConfig::default());

    if let Some((subcommand, sub_args)) = args.subcommand() {
        match subcommand {
            cmd_get::COMMAND => cmd_get::run(sub_args, provider, config).await,
            cmd_put::COMMAND => cmd_put::run(sub_args, provider, config).await,
            cmd_stat::COMMAND => cmd_stat::run(sub_args, provider, config).await,
            cmd => Err(anyhow!("invalid subcommand {cmd}")),
        }
    } else {
        Err(anyhow!("no subcommand found"))
    }
}
