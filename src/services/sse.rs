//! Incremental `text/event-stream` decoder.
//!
//! Bytes are buffered until a blank line closes a frame, so multi-byte UTF-8
//! sequences split across chunks survive. `\r\n`, `\n` and a lone `\r` all
//! end a line. A frame still open at EOF is discarded. Field handling:
//!
//! - `data:` lines are joined with `\n`
//! - `event:` and `id:` are kept on the frame
//! - `:` comment lines (keep-alives) and `retry:` are ignored
//! - frames with `event: ping` or no data are dropped

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    // last byte seen was '\r'; a following '\n' belongs to it
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk; returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        for &b in chunk {
            if std::mem::take(&mut self.after_cr) && b == b'\n' {
                continue;
            }
            match b {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.after_cr = true;
                }
                _ => self.buffer.push(b),
            }
        }

        let mut frames = Vec::new();
        while let Some(pos) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(frame) = parse_block(&block[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// End of stream. Drops any unterminated frame and returns how many bytes
    /// it held.
    pub fn finish(&mut self) -> usize {
        self.after_cr = false;
        std::mem::take(&mut self.buffer).len()
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(block);

    let mut data_lines: Vec<&str> = Vec::new();
    let mut frame = SseFrame::default();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };

        match field {
            "data" => data_lines.push(value),
            "event" => frame.event = Some(value.to_string()),
            "id" => frame.id = Some(value.to_string()),
            _ => {}
        }
    }

    if frame
        .event
        .as_deref()
        .is_some_and(|e| e.eq_ignore_ascii_case("ping"))
    {
        return None;
    }

    frame.data = data_lines.join("\n");
    if frame.data.is_empty() {
        return None;
    }

    Some(frame)
}
