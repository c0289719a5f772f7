// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented capture of step output with secret redaction.

use bh_core::{LineKind, LogLine};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Replacement text for masked secret values.
pub const MASK: &str = "********";

/// Accumulates the cleaned lines of one step's log.
///
/// Every line has masked secret values replaced by [`MASK`] before it is
/// stored or forwarded to the live sender.
pub struct LineWriter {
    proc: String,
    secrets: Vec<String>,
    started: Instant,
    lines: Vec<LogLine>,
    live: Option<mpsc::UnboundedSender<LogLine>>,
}

impl LineWriter {
    pub fn new(proc: impl Into<String>, secrets: &[String]) -> Self {
        // Output is masked per line, so a multi-line value (a PEM key, say)
        // is masked line by line
        let mut secrets: Vec<String> = secrets
            .iter()
            .flat_map(|s| s.lines())
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        // Longest first so a secret containing another is replaced whole
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self {
            proc: proc.into(),
            secrets,
            started: Instant::now(),
            lines: Vec::new(),
            live: None,
        }
    }

    /// Also forward each line as it is written.
    pub fn with_live(mut self, live: mpsc::UnboundedSender<LogLine>) -> Self {
        self.live = Some(live);
        self
    }

    /// Record one line. A trailing newline is dropped.
    pub fn write_line(&mut self, raw: &str) {
        let text = raw.strip_suffix('\n').unwrap_or(raw);
        let text = text.strip_suffix('\r').unwrap_or(text);
        let line = LogLine {
            proc: self.proc.clone(),
            time: self.started.elapsed().as_secs() as i64,
            kind: LineKind::Stdout,
            pos: self.lines.len(),
            out: mask(text, &self.secrets),
        };
        if let Some(live) = &self.live {
            // Receiver gone only means nobody streams this step anymore
            let _ = live.send(line.clone());
        }
        self.lines.push(line);
    }

    /// Drain `reader` line by line. Invalid UTF-8 is replaced, not rejected.
    pub async fn copy_from<R: AsyncRead + Unpin>(&mut self, reader: R) -> std::io::Result<()> {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }
            let text = String::from_utf8_lossy(&buf);
            self.write_line(&text);
        }
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<LogLine> {
        self.lines
    }
}

/// Replace every occurrence of each secret in `text`.
///
/// `secrets` must be free of empty strings.
pub fn mask(text: &str, secrets: &[String]) -> String {
    let mut out = text.to_string();
    for secret in secrets {
        if out.contains(secret.as_str()) {
            out = out.replace(secret.as_str(), MASK);
        }
    }
    out
}

#[cfg(test)]
#[path = "line_writer_tests.rs"]
mod tests;
