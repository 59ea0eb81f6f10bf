//! Output line splitting for child process pipes.
//!
//! `\n`, `\r\n` and a bare `\r` all end a line, so progress output that
//! redraws with carriage returns still arrives line by line. Bytes that are
//! not UTF-8 are replaced rather than treated as a stream failure.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Read `reader` to the end, sending each line to `lines`.
///
/// Stops early when the receiving side is gone. A read error is sent once
/// and ends the pipe.
pub(crate) async fn forward_lines<R>(reader: R, lines: mpsc::Sender<io::Result<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut splitter = LineSplitter::default();
    loop {
        let chunk = match reader.fill_buf().await {
            Ok(chunk) => chunk,
            Err(err) => {
                let _ = lines.send(Err(err)).await;
                return;
            }
        };
        if chunk.is_empty() {
            break;
        }
        let consumed = chunk.len();
        let ready = splitter.push(chunk);
        reader.consume(consumed);
        for line in ready {
            if lines.send(Ok(line)).await.is_err() {
                return;
            }
        }
    }
    if let Some(rest) = splitter.finish() {
        let _ = lines.send(Ok(rest)).await;
    }
}

#[derive(Default)]
struct LineSplitter {
    pending: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut ready = Vec::new();
        for &byte in bytes {
            match byte {
                b'\n' if self.after_cr => self.after_cr = false,
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    ready.push(self.take());
                }
                _ => {
                    self.after_cr = false;
                    self.pending.push(byte);
                }
            }
        }
        ready
    }

    fn finish(mut self) -> Option<String> {
        (!self.pending.is_empty()).then(|| self.take())
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn split(input: &[u8]) -> Vec<String> {
        let (tx, mut rx) = mpsc::channel(16);
        forward_lines(input, tx).await;
        let mut out = Vec::new();
        while let Some(line) = rx.recv().await {
            out.push(line.expect("line"));
        }
        out
    }

    #[tokio::test]
    async fn every_line_ending_splits() {
        assert_eq!(
            split(b"one\ntwo\r\n10%\r20%\rdone").await,
            vec!["one", "two", "10%", "20%", "done"]
        );
    }

    #[test]
    fn crlf_split_across_reads_is_one_ending() {
        let mut splitter = LineSplitter::default();
        assert_eq!(splitter.push(b"a\r"), vec!["a".to_string()]);
        assert!(splitter.push(b"\nb").is_empty());
        assert_eq!(splitter.finish(), Some("b".to_string()));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let lines = split(b"ok\n\xffbad\n").await;
        assert_eq!(lines[0], "ok");
        assert_eq!(lines[1], "\u{fffd}bad");
    }

    #[tokio::test]
    async fn blank_lines_are_kept() {
        assert_eq!(split(b"a\n\nb\n").await, vec!["a", "", "b"]);
    }
}
