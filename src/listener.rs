//! Throwaway SMTP listener that accepts every recipient.
//!
//! Used as the default probe target so a batch can run end to end without
//! touching real mail servers. Each client is served on its own thread; the
//! accept loop polls a shutdown flag.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(25);
const CLIENT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct LocalSmtpServer {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl LocalSmtpServer {
    /// Binds `addr` and starts accepting in the background.
    pub fn start<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&shutdown);
        let accept_thread = thread::Builder::new()
            .name("smtp-listener".into())
            .spawn(move || accept_loop(listener, flag))?;

        tracing::info!(%addr, "local SMTP listener started");
        Ok(Self {
            addr,
            shutdown,
            accept_thread: Some(accept_thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_running(&self) -> bool {
        self.accept_thread.is_some()
    }

    /// Stops accepting and waits for the accept loop. Sessions already in
    /// progress run to completion on their own threads.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                tracing::error!(addr = %self.addr, "listener thread panicked");
            }
            tracing::info!(addr = %self.addr, "local SMTP listener stopped");
        }
    }
}

impl Drop for LocalSmtpServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let spawned = thread::Builder::new()
                    .name("smtp-session".into())
                    .spawn(move || {
                        if let Err(err) = handle_client(stream) {
                            tracing::debug!(%peer, error = %err, "session ended with error");
                        }
                    });
                if let Err(err) = spawned {
                    tracing::warn!(%peer, error = %err, "cannot spawn session thread");
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_client(stream: TcpStream) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_IDLE_TIMEOUT))?;
    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    serve_session(reader, &mut writer)
}

fn reply<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\r\n")?;
    writer.flush()
}

/// Plays the server side of one SMTP conversation until `QUIT` or EOF.
fn serve_session<R: BufRead, W: Write>(mut reader: R, writer: &mut W) -> io::Result<()> {
    reply(writer, "220 localhost mailverify stand-in ESMTP")?;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let verb = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        tracing::trace!(command = line.trim_end(), "listener received");
        match verb.as_str() {
            "EHLO" => reply(writer, "250-localhost\r\n250 8BITMIME")?,
            "HELO" => reply(writer, "250 localhost")?,
            "MAIL" | "RCPT" | "RSET" | "NOOP" => reply(writer, "250 OK")?,
            "DATA" => {
                reply(writer, "354 End data with <CR><LF>.<CR><LF>")?;
                discard_message(&mut reader)?;
                reply(writer, "250 OK: message accepted")?;
            }
            "QUIT" => {
                reply(writer, "221 Bye")?;
                return Ok(());
            }
            _ => reply(writer, "502 Command not implemented")?,
        }
    }
}

fn discard_message<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line.trim_end_matches(['\r', '\n']) == "." {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::{MailboxProbe, SmtpProbe, SmtpProbeOptions};
    use std::io::Cursor;

    fn transcript(input: &str) -> String {
        let mut out = Vec::new();
        serve_session(Cursor::new(input), &mut out).expect("session");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn answers_full_dialogue() {
        let out = transcript(
            "EHLO test.com\r\nMAIL FROM:<a@test.com>\r\nRCPT TO:<b@example.com>\r\n\
             DATA\r\nSubject: hi\r\n\r\nbody\r\n.\r\nQUIT\r\n",
        );
        insta::assert_snapshot!(out.replace("\r\n", "\n"), @r"
        220 localhost mailverify stand-in ESMTP
        250-localhost
        250 8BITMIME
        250 OK
        250 OK
        354 End data with <CR><LF>.<CR><LF>
        250 OK: message accepted
        221 Bye
        ");
    }

    #[test]
    fn unknown_command_is_not_implemented() {
        let out = transcript("VRFY someone\r\nhelo x\r\n");
        let lines: Vec<&str> = out.split("\r\n").collect();
        assert_eq!(lines[1], "502 Command not implemented");
        assert_eq!(lines[2], "250 localhost");
    }

    #[test]
    fn probe_against_listener_is_accepted() {
        let mut server = LocalSmtpServer::start("127.0.0.1:0").expect("start");
        let addr = server.local_addr();
        let probe = SmtpProbe::new(SmtpProbeOptions {
            host: addr.ip().to_string(),
            port: addr.port(),
            timeout: Duration::from_secs(2),
            ..SmtpProbeOptions::default()
        });

        for address in ["one@example.com", "two@example.org"] {
            let report = probe.probe(address);
            assert!(report.outcome.is_accepted(), "{:?}", report.outcome);
        }

        server.shutdown();
        assert!(!server.is_running());
    }

    #[test]
    fn shutdown_releases_the_port() {
        let mut server = LocalSmtpServer::start("127.0.0.1:0").expect("start");
        let addr = server.local_addr();
        server.shutdown();
        // the listener socket is gone once the accept thread has returned
        let rebound = TcpListener::bind(addr);
        assert!(rebound.is_ok(), "{rebound:?}");
    }

    #[test]
    fn second_bind_on_same_address_fails() {
        let server = LocalSmtpServer::start("127.0.0.1:0").expect("start");
        assert!(LocalSmtpServer::start(server.local_addr()).is_err());
    }
}
