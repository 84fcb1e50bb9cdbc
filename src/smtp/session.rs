use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use super::error::SmtpError;
use super::types::SmtpReply;

pub(crate) struct SmtpSession {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    /// false once a read or write timed out or hit a closed connection
    responsive: bool,
}

impl SmtpSession {
    pub(crate) fn connect(
        addrs: &[SocketAddr],
        timeout: Duration,
    ) -> Result<(Self, SocketAddr), SmtpError> {
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout)).map_err(SmtpError::io)?;
                    stream.set_write_timeout(Some(timeout)).map_err(SmtpError::io)?;
                    let reader = BufReader::new(stream.try_clone().map_err(SmtpError::io)?);
                    return Ok((
                        Self {
                            stream,
                            reader,
                            responsive: true,
                        },
                        *addr,
                    ));
                }
                Err(source) => {
                    last_err = Some(SmtpError::Connect {
                        addr: addr.to_string(),
                        source,
                    })
                }
            }
        }
        Err(last_err.unwrap_or_else(|| SmtpError::NoAddress {
            target: "<none>".to_string(),
        }))
    }

    pub(crate) fn is_responsive(&self) -> bool {
        self.responsive
    }

    pub(crate) fn send_command(&mut self, command: &str) -> Result<(), SmtpError> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        let sent = self
            .stream
            .write_all(&line)
            .and_then(|()| self.stream.flush())
            .map_err(SmtpError::io);
        self.track(sent)
    }

    /// Reads one (possibly multi-line) reply.
    pub(crate) fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        let reply = self.read_lines();
        self.track(reply)
    }

    fn track<T>(&mut self, result: Result<T, SmtpError>) -> Result<T, SmtpError> {
        if matches!(result, Err(SmtpError::Timeout | SmtpError::Closed)) {
            self.responsive = false;
        }
        result
    }

    fn read_lines(&mut self) -> Result<SmtpReply, SmtpError> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            let mut raw = String::new();
            let bytes = self.reader.read_line(&mut raw).map_err(SmtpError::io)?;
            if bytes == 0 {
                return Err(SmtpError::Closed);
            }
            if raw.ends_with('\n') {
                raw.pop();
                if raw.ends_with('\r') {
                    raw.pop();
                }
            }

            let parsed_code = parse_code(&raw)?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(SmtpError::protocol(format!(
                        "inconsistent SMTP reply codes: {existing} vs {parsed_code}"
                    )));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
            message_lines.push(raw.get(4..).unwrap_or_default().to_string());
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.ok_or_else(|| SmtpError::protocol("SMTP reply missing status code"))?,
            message: message_lines.join("\n"),
        })
    }
}

fn parse_code(raw: &str) -> Result<u16, SmtpError> {
    let code_part = raw
        .get(..3)
        .ok_or_else(|| SmtpError::protocol(format!("invalid SMTP reply: '{raw}'")))?;
    code_part
        .parse::<u16>()
        .map_err(|_| SmtpError::protocol(format!("invalid SMTP status code: '{code_part}'")))
}
