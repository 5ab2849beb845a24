/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, ReadBuf};

use crate::error::FtpLineError;

const RECV_BUFFER_SIZE: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WaitMode {
    /// wait until the transport yields data
    Blocking,
    /// consume only data the transport can yield without waiting
    Drain,
}

pub(crate) struct LineReader {
    buf: Box<[u8; RECV_BUFFER_SIZE]>,
    rpos: usize,
    end: usize,
    max_line_len: usize,
}

impl LineReader {
    pub(crate) fn new(max_line_len: usize) -> Self {
        LineReader {
            buf: Box::new([0u8; RECV_BUFFER_SIZE]),
            rpos: 0,
            end: 0,
            max_line_len,
        }
    }

    fn poll_refill<R>(&mut self, cx: &mut Context<'_>, io: &mut R) -> Poll<io::Result<usize>>
    where
        R: AsyncRead + Unpin,
    {
        let mut read_buf = ReadBuf::new(self.buf.as_mut_slice());
        match Pin::new(io).poll_read(cx, &mut read_buf) {
            Poll::Ready(Ok(_)) => {
                let len = read_buf.filled().len();
                self.rpos = 0;
                self.end = len;
                Poll::Ready(Ok(len))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }

    async fn next_byte<R>(&mut self, io: &mut R, mode: WaitMode) -> Result<u8, FtpLineError>
    where
        R: AsyncRead + Unpin,
    {
        if self.rpos >= self.end {
            let len = match mode {
                WaitMode::Blocking => std::future::poll_fn(|cx| self.poll_refill(cx, io))
                    .await
                    .map_err(FtpLineError::ReadFailed)?,
                WaitMode::Drain => {
                    let mut cx = Context::from_waker(Waker::noop());
                    match self.poll_refill(&mut cx, io) {
                        Poll::Ready(Ok(len)) => len,
                        Poll::Ready(Err(e)) => return Err(FtpLineError::ReadFailed(e)),
                        Poll::Pending => return Err(FtpLineError::NoLineAvailable),
                    }
                }
            };
            if len == 0 {
                return Err(FtpLineError::ConnectionClosed);
            }
        }
        let ch = self.buf[self.rpos];
        self.rpos += 1;
        Ok(ch)
    }

    /// Read one line with the terminating LF and an optional CR before it
    /// stripped.
    ///
    /// Characters beyond `max_line_len - 1` are consumed and dropped, an
    /// overlong line is not an error. Once the first character of a line has
    /// been read its terminator is always waited for, whatever `mode` says;
    /// the requested mode applies afresh to the next call.
    pub(crate) async fn read_line<R>(
        &mut self,
        io: &mut R,
        mode: WaitMode,
    ) -> Result<String, FtpLineError>
    where
        R: AsyncRead + Unpin,
    {
        let mut line = Vec::<u8>::with_capacity(64);
        let mut mode = mode;
        loop {
            let ch = self.next_byte(io, mode).await?;
            if ch == b'\n' {
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            mode = WaitMode::Blocking; // a started line has to be finished
            if line.len() + 1 < self.max_line_len {
                line.push(ch);
            }
        }
    }

    /// Discard all complete lines the transport can yield without waiting.
    pub(crate) async fn flush_available_input<R>(&mut self, io: &mut R) -> Result<(), FtpLineError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            match self.read_line(io, WaitMode::Drain).await {
                Ok(_) => {}
                Err(FtpLineError::NoLineAvailable) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio_util::io::StreamReader;

    #[tokio::test]
    async fn single_line() {
        let data = b"220 test ftp server\r\n";

        let stream = tokio_stream::iter(vec![io::Result::Ok(data.as_slice())]);
        let mut reader = StreamReader::new(stream);

        let mut b = LineReader::new(512);
        let line = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line, "220 test ftp server");

        let r = b.read_line(&mut reader, WaitMode::Blocking).await;
        assert!(matches!(r, Err(FtpLineError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn multiple_line() {
        let data = b"211-features\r\n211 end\r\n";

        let stream = tokio_stream::iter(vec![io::Result::Ok(data.as_slice())]);
        let mut reader = StreamReader::new(stream);

        let mut b = LineReader::new(512);
        let line1 = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line1, "211-features");
        let line2 = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line2, "211 end");

        let r = b.read_line(&mut reader, WaitMode::Blocking).await;
        assert!(matches!(r, Err(FtpLineError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn split_line() {
        let data1 = b"220 first line\r\n227 second ";
        let data2 = b"line";
        let data3 = b"\r\n";

        let stream = tokio_stream::iter(vec![
            io::Result::Ok(data1.as_slice()),
            io::Result::Ok(data2.as_slice()),
            io::Result::Ok(data3.as_slice()),
        ]);
        let mut reader = StreamReader::new(stream);

        let mut b = LineReader::new(512);
        let line1 = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line1, "220 first line");
        let line2 = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line2, "227 second line");
    }

    #[tokio::test]
    async fn bare_lf_line() {
        let data = b"150 no carriage return\n";

        let stream = tokio_stream::iter(vec![io::Result::Ok(data.as_slice())]);
        let mut reader = StreamReader::new(stream);

        let mut b = LineReader::new(512);
        let line = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line, "150 no carriage return");
    }

    #[tokio::test]
    async fn too_long_line_is_truncated() {
        let data = b"0123456789\r\n213 42\r\n";

        let stream = tokio_stream::iter(vec![io::Result::Ok(data.as_slice())]);
        let mut reader = StreamReader::new(stream);

        let mut b = LineReader::new(8);
        let line1 = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line1, "0123456");
        let line2 = b.read_line(&mut reader, WaitMode::Blocking).await.unwrap();
        assert_eq!(line2, "213 42");
    }

    #[tokio::test]
    async fn drain_stops_when_no_data_left() {
        let (mut local, mut remote) = tokio::io::duplex(1024);

        local.write_all(b"226 done\r\n").await.unwrap();

        let mut b = LineReader::new(512);
        let line = b.read_line(&mut remote, WaitMode::Drain).await.unwrap();
        assert_eq!(line, "226 done");

        let r = b.read_line(&mut remote, WaitMode::Drain).await;
        assert!(matches!(r, Err(FtpLineError::NoLineAvailable)));
    }

    #[tokio::test]
    async fn flush_discards_only_earlier_input() {
        let (mut local, mut remote) = tokio::io::duplex(1024);

        local.write_all(b"125 stale\r\n226 stale\r\n").await.unwrap();

        let mut b = LineReader::new(512);
        b.flush_available_input(&mut remote).await.unwrap();

        local.write_all(b"220 fresh\r\n").await.unwrap();
        let line = b.read_line(&mut remote, WaitMode::Blocking).await.unwrap();
        assert_eq!(line, "220 fresh");
    }

    #[tokio::test]
    async fn flush_with_empty_input() {
        let (_local, mut remote) = tokio::io::duplex(1024);

        let mut b = LineReader::new(512);
        b.flush_available_input(&mut remote).await.unwrap();
    }
}
