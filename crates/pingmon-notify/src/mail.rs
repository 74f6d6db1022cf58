//! SMTP delivery — one email per flushed area batch.

use std::collections::HashMap;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pingmon_core::MailConfig;
use pingmon_engine::TransitionEvent;
use tracing::info;

use crate::notifier::{NotificationBatch, Notifier, NotifyError, NotifyFuture};

/// Renders a batch into one HTML email and hands it to the SMTP relay.
pub struct MailNotifier {
    config: MailConfig,
    /// Extra recipient per area id, appended to the global recipients.
    area_emails: HashMap<String, String>,
}

impl MailNotifier {
    pub fn new(config: MailConfig, area_emails: HashMap<String, String>) -> Self {
        Self {
            config,
            area_emails,
        }
    }
}

impl Notifier for MailNotifier {
    fn deliver(&self, batch: NotificationBatch) -> NotifyFuture {
        let config = self.config.clone();
        let extra = self.area_emails.get(&batch.area_id).cloned();
        Box::pin(async move { send_batch(&config, extra.as_deref(), batch).await })
    }
}

async fn send_batch(
    config: &MailConfig,
    extra_rcpt: Option<&str>,
    batch: NotificationBatch,
) -> Result<(), NotifyError> {
    let mut builder = Message::builder()
        .from(config.mail_from.parse()?)
        .subject(render_subject(&batch))
        .header(ContentType::TEXT_HTML);
    for rcpt in &config.rcpt_to {
        builder = builder.to(rcpt.parse()?);
    }
    if let Some(rcpt) = extra_rcpt {
        builder = builder.to(rcpt.parse()?);
    }
    let email = builder
        .body(render_body(&batch.events))
        .map_err(|e| NotifyError::Build(e.to_string()))?;

    let mut transport =
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        transport = transport.credentials(Credentials::new(user.clone(), pass.clone()));
    }
    transport.build().send(email).await?;

    info!(
        area = %batch.area_id,
        events = batch.events.len(),
        "notification email sent"
    );
    Ok(())
}

fn render_subject(batch: &NotificationBatch) -> String {
    format!("[{}] {} - host status change", batch.area_id, batch.area_name)
}

/// One numbered line per transition, colored by the new status.
fn render_body(events: &[TransitionEvent]) -> String {
    let mut body = String::new();
    for (i, event) in events.iter().enumerate() {
        let n = i + 1;
        if event.up {
            body.push_str(&format!(
                "<div>{n}. {}: {} <span style=\"color: green;\">up</span><br />\
                 recovered at: {}</div>",
                event.name,
                event.addr,
                format_time(event.last_seen)
            ));
        } else {
            body.push_str(&format!(
                "<div>{n}. {}: {} <span style=\"color: red;\">down</span><br />\
                 last seen: {}</div>",
                event.name,
                event.addr,
                format_time(event.last_seen)
            ));
        }
    }
    body
}

fn format_time(t: Option<SystemTime>) -> String {
    match t {
        Some(t) => DateTime::<Local>::from(t)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "never".to_string(),
    }
}
