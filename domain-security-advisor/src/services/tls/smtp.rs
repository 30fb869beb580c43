//! Just enough SMTP to reach the STARTTLS upgrade.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{ProbeError, ProbeResult};

/// Upper bound on reply lines, so a chatty server cannot keep us reading forever.
const MAX_REPLY_LINES: usize = 64;
const CLIENT_NAME: &str = "localhost";

/// A parsed (possibly multi-line) SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Client side of an SMTP session that stops right after `STARTTLS`.
pub struct SmtpClient<S> {
    reader: BufReader<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> SmtpClient<S> {
    /// Reads the server greeting. Anything but a 220 is a failed client.
    pub async fn connect(stream: S) -> ProbeResult<Self> {
        let mut client = Self {
            reader: BufReader::new(stream),
        };

        let greeting = client.read_reply().await.map_err(ProbeError::Smtp)?;
        if greeting.code != 220 {
            return Err(ProbeError::Smtp(format!(
                "unexpected greeting {} {}",
                greeting.code,
                greeting.text()
            )));
        }

        Ok(client)
    }

    /// Sends EHLO and STARTTLS and hands back the raw stream, ready for the
    /// TLS handshake.
    pub async fn start_tls(mut self) -> ProbeResult<S> {
        let ehlo = self
            .command(&format!("EHLO {CLIENT_NAME}"))
            .await
            .map_err(ProbeError::Handshake)?;
        if ehlo.code != 250 {
            return Err(ProbeError::Handshake(format!(
                "{} {}",
                ehlo.code,
                ehlo.text()
            )));
        }

        let supports_starttls = ehlo
            .lines
            .iter()
            .any(|line| line.trim().eq_ignore_ascii_case("STARTTLS"));
        if !supports_starttls {
            return Err(ProbeError::Handshake(
                "smtp: server doesn't support STARTTLS".to_string(),
            ));
        }

        let reply = self
            .command("STARTTLS")
            .await
            .map_err(ProbeError::Handshake)?;
        if reply.code != 220 {
            return Err(ProbeError::Handshake(format!(
                "{} {}",
                reply.code,
                reply.text()
            )));
        }

        Ok(self.reader.into_inner())
    }

    async fn command(&mut self, line: &str) -> Result<Reply, String> {
        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|e| e.to_string())?;
        stream.flush().await.map_err(|e| e.to_string())?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Reply, String> {
        let mut lines = Vec::new();
        let mut buf = String::new();

        for _ in 0..MAX_REPLY_LINES {
            buf.clear();
            let read = self
                .reader
                .read_line(&mut buf)
                .await
                .map_err(|e| e.to_string())?;
            if read == 0 {
                return Err("connection closed by server".to_string());
            }

            let (code, more, text) = parse_reply_line(&buf)?;
            lines.push(text.to_string());
            if !more {
                return Ok(Reply { code, lines });
            }
        }

        Err("reply too long".to_string())
    }
}

/// Splits `250-PIPELINING` into `(250, true, "PIPELINING")`.
fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let code = line
        .get(..3)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| format!("invalid reply line: {line:?}"))?;

    match line.as_bytes().get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(_) => Err(format!("invalid reply line: {line:?}")),
    }
}
