/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

#[derive(Debug)]
pub(crate) struct FtpReply {
    pub(crate) code: u16,
    pub(crate) line: String,
}

/// Accumulate the digits among the first 3 characters of a reply line.
///
/// Lenient on purpose: some servers prefix garbage, the digits that are
/// there still decide the code. Lines shorter than 3 characters carry no
/// code at all.
pub(crate) fn parse_reply_code(line: &str) -> Option<u16> {
    let b = line.as_bytes();
    if b.len() < 3 {
        return None;
    }
    let mut code: u16 = 0;
    for c in b.iter().take(3) {
        if c.is_ascii_digit() {
            code = code * 10 + u16::from(c - b'0');
        }
    }
    Some(code)
}

/// Extract the data port from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
/// reply. The host octets are ignored, the caller connects to the control
/// host instead.
pub(crate) fn parse_pasv_reply(line: &str) -> Option<u16> {
    let b = line.as_bytes();
    let p_start = memchr::memchr(b'(', b)?;
    let p_end = memchr::memchr(b')', &b[p_start..])? + p_start;

    let fields: Vec<&str> = line[p_start + 1..p_end].split(',').collect();
    if fields.len() != 6 {
        return None;
    }

    let p1 = u8::from_str(fields[4]).ok()?;
    let p2 = u8::from_str(fields[5]).ok()?;
    Some(((p1 as u16) << 8) + p2 as u16)
}

/// Extract the directory from a `257 "<dir>" ...` reply, with a trailing
/// slash stripped.
pub(crate) fn parse_pwd_reply(line: &str) -> Option<String> {
    let b = line.as_bytes();
    let q_start = memchr::memchr(b'"', b)?;
    let q_end = memchr::memchr(b'"', &b[q_start + 1..])? + q_start + 1;

    let mut dir = &line[q_start + 1..q_end];
    if let Some(stripped) = dir.strip_suffix('/') {
        dir = stripped;
    }
    Some(dir.to_string())
}

/// Extract the file size from a `213 <size>` reply.
pub(crate) fn parse_size_reply(line: &str) -> Option<u64> {
    let rest = line.get(4..)?.trim_start();
    let digits = rest.split(|c: char| !c.is_ascii_digit()).next()?;
    u64::from_str(digits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_code() {
        assert_eq!(parse_reply_code("220 ready"), Some(220));
        assert_eq!(parse_reply_code("331-password required"), Some(331));
        assert_eq!(parse_reply_code("2x0 sloppy server"), Some(20));
        assert_eq!(parse_reply_code("hi"), None);
        assert_eq!(parse_reply_code("abc no code"), Some(0));
    }

    #[test]
    fn pasv_reply() {
        assert_eq!(
            parse_pasv_reply("227 Entering Passive Mode (192,168,1,1,4,1)"),
            Some(1025)
        );
        assert_eq!(
            parse_pasv_reply("227 Entering Passive Mode (10,0,0,1,255,255)"),
            Some(65535)
        );
        // host octets are not interpreted
        assert_eq!(parse_pasv_reply("227 ok (h1,h2,h3,h4,0,21)"), Some(21));
    }

    #[test]
    fn pasv_reply_malformed() {
        assert_eq!(parse_pasv_reply("227 Entering Passive Mode"), None);
        assert_eq!(parse_pasv_reply("227 (192,168,1,1,4,1"), None);
        assert_eq!(parse_pasv_reply("227 (192,168,1,1,4)"), None);
        assert_eq!(parse_pasv_reply("227 (192,168,1,1,4,x)"), None);
        assert_eq!(parse_pasv_reply("227 (192,168,1,1,4,1025)"), None);
    }

    #[test]
    fn pwd_reply() {
        assert_eq!(
            parse_pwd_reply("257 \"/home/u\" is current directory"),
            Some("/home/u".to_string())
        );
        assert_eq!(
            parse_pwd_reply("257 \"/home/u/\" is current directory"),
            Some("/home/u".to_string())
        );
        assert_eq!(parse_pwd_reply("257 \"/\""), Some("".to_string()));
        assert_eq!(parse_pwd_reply("257 no quotes here"), None);
        assert_eq!(parse_pwd_reply("257 \"unterminated"), None);
    }

    #[test]
    fn size_reply() {
        assert_eq!(parse_size_reply("213 1024"), Some(1024));
        assert_eq!(parse_size_reply("213 0"), Some(0));
        assert_eq!(parse_size_reply("213 1024 bytes"), Some(1024));
        assert_eq!(parse_size_reply("213 "), None);
        assert_eq!(parse_size_reply("213 none"), None);
        assert_eq!(parse_size_reply("213"), None);
    }
}
