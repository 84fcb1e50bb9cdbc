use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use super::{AttemptStage, MailboxProbe, SmtpEvent, SmtpOutcome, SmtpProbe, SmtpProbeOptions};

type Script = Vec<(&'static str, &'static str)>;

/// Serves one client: greeting, then one canned response per expected command.
pub(crate) fn spawn_mock_server(greeting: &'static str, script: Script) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        ready_tx.send(()).ok();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = handle_session(&mut stream, greeting, script);
        }
    });
    ready_rx.recv().expect("server ready");
    (port, handle)
}

fn handle_session(stream: &mut TcpStream, greeting: &str, script: Script) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(greeting.as_bytes())?;
    stream.flush()?;
    for (expected, response) in script {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        assert!(
            line.starts_with(expected),
            "expected command starting with '{expected}', got '{line}'"
        );
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
    }
    Ok(())
}

fn options_for(port: u16) -> SmtpProbeOptions {
    SmtpProbeOptions {
        port,
        timeout: Duration::from_secs(2),
        ..SmtpProbeOptions::default()
    }
}

const GREETING: &str = "220 mock.smtp.test ESMTP\r\n";

#[test]
fn accepted_recipient_passes() {
    let (port, handle) = spawn_mock_server(
        GREETING,
        vec![
            ("EHLO test.com", "250-mock.example\r\n250 SIZE 1000\r\n"),
            ("MAIL FROM:<test@test.com>", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:<user@example.com>", "250 2.1.5 Ok\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ],
    );
    let report = SmtpProbe::new(options_for(port)).probe("user@example.com");
    handle.join().expect("server thread");

    assert!(report.outcome.is_accepted(), "{:?}", report.outcome);
    assert_eq!(report.target, format!("127.0.0.1:{port}"));
    assert!(report.transcript.iter().any(|event| matches!(
        event,
        SmtpEvent::Received { stage: AttemptStage::Ehlo, reply } if reply.message == "mock.example\nSIZE 1000"
    )));
    assert!(matches!(
        report.transcript.last(),
        Some(SmtpEvent::Received {
            stage: AttemptStage::Quit,
            ..
        })
    ));
}

#[test]
fn rejected_recipient_fails() {
    let (port, handle) = spawn_mock_server(
        GREETING,
        vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:", "550 5.1.1 User unknown\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ],
    );
    let report = SmtpProbe::new(options_for(port)).probe("nobody@example.com");
    handle.join().expect("server thread");

    match report.outcome {
        SmtpOutcome::Rejected {
            stage: AttemptStage::RcptTo,
            reply,
        } => assert_eq!(reply.code, 550),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn rejected_sender_stops_before_rcpt() {
    let (port, handle) = spawn_mock_server(
        GREETING,
        vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:", "553 sender refused\r\n"),
            ("QUIT", "221 Bye\r\n"),
        ],
    );
    let report = SmtpProbe::new(options_for(port)).probe("user@example.com");
    handle.join().expect("server thread");

    assert!(matches!(
        report.outcome,
        SmtpOutcome::Rejected {
            stage: AttemptStage::MailFrom,
            ..
        }
    ));
    assert!(!report.transcript.iter().any(|event| matches!(
        event,
        SmtpEvent::Sent {
            stage: AttemptStage::RcptTo,
            ..
        }
    )));
}

#[test]
fn close_failure_keeps_verdict() {
    // the server hangs up right after answering RCPT TO
    let (port, handle) = spawn_mock_server(
        GREETING,
        vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:", "250 Ok\r\n"),
            ("RCPT TO:", "250 Ok\r\n"),
        ],
    );
    let report = SmtpProbe::new(options_for(port)).probe("user@example.com");
    handle.join().expect("server thread");

    assert!(report.outcome.is_accepted());
    assert!(report.transcript.iter().any(|event| matches!(
        event,
        SmtpEvent::Error {
            stage: AttemptStage::Quit,
            ..
        }
    )));
}

#[test]
fn refused_connection_fails_at_connect() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let report = SmtpProbe::new(options_for(port)).probe("user@example.com");
    assert!(matches!(
        report.outcome,
        SmtpOutcome::Failed {
            stage: AttemptStage::Connect,
            ..
        }
    ));
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        if let Ok((_stream, _)) = listener.accept() {
            thread::sleep(Duration::from_millis(800));
        }
    });
    let options = SmtpProbeOptions {
        port,
        timeout: Duration::from_millis(200),
        ..SmtpProbeOptions::default()
    };
    let report = SmtpProbe::new(options).probe("user@example.com");
    handle.join().expect("server thread");

    match report.outcome {
        SmtpOutcome::Failed {
            stage: AttemptStage::Greeting,
            message,
        } => assert!(message.contains("timed out"), "{message}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn timed_out_session_does_not_wait_for_quit_reply() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        if let Ok((_stream, _)) = listener.accept() {
            thread::sleep(Duration::from_millis(1500));
        }
    });
    let options = SmtpProbeOptions {
        port,
        timeout: Duration::from_millis(300),
        ..SmtpProbeOptions::default()
    };
    let started = Instant::now();
    let report = SmtpProbe::new(options).probe("user@example.com");
    let elapsed = started.elapsed();
    handle.join().expect("server thread");

    assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
    assert!(!report.outcome.is_accepted());
    let quit_events: Vec<&SmtpEvent> = report
        .transcript
        .iter()
        .filter(|event| {
            matches!(
                event,
                SmtpEvent::Sent { stage: AttemptStage::Quit, .. }
                    | SmtpEvent::Received { stage: AttemptStage::Quit, .. }
                    | SmtpEvent::Error { stage: AttemptStage::Quit, .. }
            )
        })
        .collect();
    assert_eq!(quit_events.len(), 1);
    assert!(matches!(quit_events[0], SmtpEvent::Sent { .. }));
}

#[test]
fn garbage_reply_is_a_protocol_failure() {
    let (port, handle) = spawn_mock_server("hello there\r\n", vec![("QUIT", "221 Bye\r\n")]);
    let report = SmtpProbe::new(options_for(port)).probe("user@example.com");
    handle.join().expect("server thread");

    match report.outcome {
        SmtpOutcome::Failed {
            stage: AttemptStage::Greeting,
            message,
        } => assert!(message.contains("protocol error"), "{message}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
