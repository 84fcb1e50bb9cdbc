use std::time::Duration;

/// Where and how the probe talks SMTP. Defaults target the local stand-in
/// listener on `127.0.0.1:1025`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpProbeOptions {
    pub host: String,
    pub port: u16,
    /// Bounds the TCP connect and every read/write of the session.
    pub timeout: Duration,
    pub helo: String,
    pub mail_from: String,
}

impl Default for SmtpProbeOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1025,
            timeout: Duration::from_secs(10),
            helo: "test.com".to_string(),
            mail_from: "test@test.com".to_string(),
        }
    }
}

impl SmtpProbeOptions {
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
