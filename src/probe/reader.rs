use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads an HTTP/1.x response head, stopping at the blank line, at
/// `max_bytes`, or when the peer closes.
pub struct HeaderReader {
    max_bytes: usize,
}

impl HeaderReader {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes: max_bytes.max(16),
        }
    }

    pub async fn read<T: AsyncRead + Unpin>(&mut self, stream: &mut T) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.max_bytes];
        let mut total = 0usize;
        loop {
            let n = stream.read(&mut buf[total..]).await?;
            if n == 0 {
                break;
            }
            // The terminator may straddle two reads.
            let scan_from = total.saturating_sub(3);
            total += n;
            if let Some(end) = find_header_end(&buf[scan_from..total]) {
                total = scan_from + end;
                break;
            }
            if total >= self.max_bytes {
                break;
            }
        }
        buf.truncate(total);
        Ok(buf)
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Status code from an `HTTP/x.y NNN reason` status line.
pub fn parse_status_code(head: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(head).ok()?;
    let line = text.lines().next()?.trim_start();
    let mut parts = line.split_whitespace();
    let protocol = parts.next()?;
    if !protocol.to_ascii_uppercase().starts_with("HTTP/") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok()
}
