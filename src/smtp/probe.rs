use std::net::{SocketAddr, ToSocketAddrs};

use super::error::SmtpError;
use super::options::SmtpProbeOptions;
use super::session::SmtpSession;
use super::types::AttemptStage as Stage;
use super::types::{SmtpEvent as Event, SmtpOutcome as Outcome, SmtpProbeReport, SmtpReply};

/// Asks a mail server whether it accepts `address` as a recipient.
pub trait MailboxProbe {
    fn probe(&self, address: &str) -> SmtpProbeReport;
}

impl<T: MailboxProbe + ?Sized> MailboxProbe for &T {
    fn probe(&self, address: &str) -> SmtpProbeReport {
        (**self).probe(address)
    }
}

/// Probe speaking plain-text SMTP to the endpoint in [`SmtpProbeOptions`].
#[derive(Debug, Clone, Default)]
pub struct SmtpProbe {
    options: SmtpProbeOptions,
}

impl SmtpProbe {
    pub fn new(options: SmtpProbeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SmtpProbeOptions {
        &self.options
    }
}

impl MailboxProbe for SmtpProbe {
    fn probe(&self, address: &str) -> SmtpProbeReport {
        let mut transcript = Vec::new();
        let outcome = converse(&self.options, address, &mut transcript);
        SmtpProbeReport {
            target: self.options.target(),
            outcome,
            transcript,
        }
    }
}

fn converse(options: &SmtpProbeOptions, address: &str, transcript: &mut Vec<Event>) -> Outcome {
    let addrs = match resolve_target(options) {
        Ok(addrs) => addrs,
        Err(err) => return fail(Stage::Connect, err, transcript),
    };
    let mut session = match SmtpSession::connect(&addrs, options.timeout) {
        Ok((session, peer)) => {
            tracing::trace!(%peer, "SMTP session opened");
            session
        }
        Err(err) => return fail(Stage::Connect, err, transcript),
    };

    let outcome = match dialogue(&mut session, options, address, transcript) {
        Ok(outcome) | Err(outcome) => outcome,
    };
    send_quit(&mut session, transcript);
    outcome
}

fn dialogue(
    session: &mut SmtpSession,
    options: &SmtpProbeOptions,
    address: &str,
    transcript: &mut Vec<Event>,
) -> Result<Outcome, Outcome> {
    let greeting = read(session, Stage::Greeting, transcript)?;
    if !greeting.is_positive_completion() {
        return Ok(Outcome::Rejected {
            stage: Stage::Greeting,
            reply: greeting,
        });
    }

    let preamble = [
        (Stage::Ehlo, format!("EHLO {}", options.helo)),
        (Stage::MailFrom, format!("MAIL FROM:<{}>", options.mail_from)),
    ];
    for (stage, command) in preamble {
        let reply = exchange(session, stage, &command, transcript)?;
        if !reply.is_positive_completion() {
            return Ok(Outcome::Rejected { stage, reply });
        }
    }

    let rcpt = exchange(
        session,
        Stage::RcptTo,
        &format!("RCPT TO:<{address}>"),
        transcript,
    )?;
    if rcpt.is_positive_completion() {
        Ok(Outcome::Accepted { reply: rcpt })
    } else {
        Ok(Outcome::Rejected {
            stage: Stage::RcptTo,
            reply: rcpt,
        })
    }
}

fn resolve_target(options: &SmtpProbeOptions) -> Result<Vec<SocketAddr>, SmtpError> {
    let addrs: Vec<SocketAddr> = (options.host.as_str(), options.port)
        .to_socket_addrs()
        .map_err(|source| SmtpError::Resolve {
            target: options.target(),
            source,
        })?
        .collect();
    if addrs.is_empty() {
        return Err(SmtpError::NoAddress {
            target: options.target(),
        });
    }
    Ok(addrs)
}

fn exchange(
    session: &mut SmtpSession,
    stage: Stage,
    command: &str,
    transcript: &mut Vec<Event>,
) -> Result<SmtpReply, Outcome> {
    transcript.push(Event::Sent {
        stage,
        command: command.to_string(),
    });
    if let Err(err) = session.send_command(command) {
        return Err(fail(stage, err, transcript));
    }
    read(session, stage, transcript)
}

fn read(
    session: &mut SmtpSession,
    stage: Stage,
    transcript: &mut Vec<Event>,
) -> Result<SmtpReply, Outcome> {
    match session.read_reply() {
        Ok(reply) => {
            transcript.push(Event::Received {
                stage,
                reply: reply.clone(),
            });
            Ok(reply)
        }
        Err(err) => Err(fail(stage, err, transcript)),
    }
}

fn fail(stage: Stage, err: SmtpError, transcript: &mut Vec<Event>) -> Outcome {
    let message = err.to_string();
    transcript.push(Event::Error {
        stage,
        message: message.clone(),
    });
    Outcome::Failed { stage, message }
}

/// Best effort: a failed `QUIT` is recorded in the transcript only. After a
/// timeout or a hang-up the reply is not awaited.
fn send_quit(session: &mut SmtpSession, transcript: &mut Vec<Event>) {
    const QUIT_CMD: &str = "QUIT";
    if !session.is_responsive() {
        transcript.push(Event::Sent {
            stage: Stage::Quit,
            command: QUIT_CMD.to_string(),
        });
        if let Err(err) = session.send_command(QUIT_CMD) {
            tracing::trace!(error = %err, "SMTP session close failed");
        }
        return;
    }
    if let Err(outcome) = exchange(session, Stage::Quit, QUIT_CMD, transcript) {
        tracing::trace!(%outcome, "SMTP session close failed");
    }
}
