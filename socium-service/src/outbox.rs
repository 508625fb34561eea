//! In-process queue between request handling and mail delivery.

use socium_common::model::account::EmailAddress;
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Mail {
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Error)]
#[error("Delivering mail failed: {0}")]
pub struct MailError(pub String);

pub trait Mailer: Send + Sync + 'static {
    fn send(&self, mail: Mail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Writes mails to the log instead of delivering them.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.body, "Sending mail");
        Ok(())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("The mail outbox is closed, dropping mail to {}", .0.to)]
pub struct OutboxClosedError(pub Mail);

#[derive(Clone, Debug)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<Mail>,
}

#[derive(Debug)]
pub struct OutboxReceiver {
    receiver: mpsc::UnboundedReceiver<Mail>,
}

impl Outbox {
    #[must_use]
    pub fn channel() -> (Outbox, OutboxReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Outbox { sender }, OutboxReceiver { receiver })
    }

    pub fn enqueue(&self, mail: Mail) -> Result<(), OutboxClosedError> {
        debug!(to = %mail.to, subject = %mail.subject, "Queueing mail");
        self.sender
            .send(mail)
            .map_err(|mpsc::error::SendError(mail)| OutboxClosedError(mail))
    }
}

impl OutboxReceiver {
    pub async fn recv(&mut self) -> Option<Mail> {
        self.receiver.recv().await
    }

    /// Hands queued mails to `mailer` until `shutdown` fires or every
    /// [`Outbox`] handle is gone. Failed deliveries are logged and dropped.
    pub async fn dispatch<M: Mailer>(mut self, mailer: M, shutdown: CancellationToken) {
        loop {
            let mail = tokio::select! {
                () = shutdown.cancelled() => break,
                mail = self.receiver.recv() => mail,
            };

            let Some(mail) = mail else {
                break;
            };

            let to = mail.to.clone();
            if let Err(error) = mailer.send(mail).await {
                warn!(%to, %error, "Mail could not be delivered");
            }
        }

        info!("Mail dispatcher stopped");
    }
}
