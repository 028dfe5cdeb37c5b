use std::sync::Arc;
use parking_lot::Mutex;
use async_trait::async_trait;
use super::errors::WardenError;

#[derive(Clone, Debug, PartialEq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

///
/// Outbound email delivery. The service never waits on delivery and never fails a request
/// because of it.
///
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), WardenError>;
}

///
/// Local dev mailer that logs instead of sending real email.
///
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), WardenError> {
        tracing::info!("Mail to {} - {}", mail.to, mail.subject);
        tracing::debug!("{}", redact_secrets(&mail.body));
        Ok(())
    }
}

const SECRET_PARAM: &str = "token=";

///
/// Mask the secret in any link so a logged mail can't be used to reset or verify an account.
///
fn redact_secrets(body: &str) -> String {
    body.lines()
        .map(|line| match line.find(SECRET_PARAM) {
            Some(start) => {
                let value_at = start + SECRET_PARAM.len();
                let value_len = line[value_at..].find(|c: char| c.is_whitespace() || c == '&').unwrap_or(line.len() - value_at);
                format!("{}********{}", &line[..value_at], &line[value_at + value_len..])
            },
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

///
/// Keeps every message in memory so it can be inspected through the admin API.
///
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<Mail>>,
}

impl OutboxMailer {
    pub fn messages_for(&self, to: &str) -> Vec<Mail> {
        self.sent.lock()
            .iter()
            .filter(|mail| mail.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, mail: Mail) -> Result<(), WardenError> {
        tracing::debug!("Outbox mail to {} - {}", mail.to, mail.subject);
        self.sent.lock().push(mail);
        Ok(())
    }
}

///
/// Fire-and-forget delivery. Failures are logged and dropped.
///
pub fn dispatch(mailer: Arc<dyn Mailer>, mail: Mail) {
    tokio::spawn(async move {
        let to = mail.to.clone();
        if let Err(err) = mailer.send(mail).await {
            tracing::warn!("Unable to send mail to {}: {}", to, err);
        }
    });
}
