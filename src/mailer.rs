//! Outgoing mail through the Resend HTTP API.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_safe};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail delivery is not configured")]
    NotConfigured,
    #[error("Mail provider rejected the message: {0}")]
    Rejected(String),
    #[error("Mail provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), MailError>;
}

pub fn welcome(to: &str, name: &str) -> Message {
    Message {
        to: to.to_string(),
        subject: "Welcome to Reelshelf".to_string(),
        html: format!(
            "<p>Hi {},</p><p>Your account is ready. Start adding the movies you love.</p>",
            encode_safe(name)
        ),
    }
}

pub fn password_recovery(to: &str, public_url: &str, token: &str) -> Message {
    let link = format!("{}/recover/{}", public_url.trim_end_matches('/'), token);
    Message {
        to: to.to_string(),
        subject: "Reset your Reelshelf password".to_string(),
        html: format!(
            "<p>Someone asked to reset your password.</p>\
             <p><a href=\"{}\">{}</a></p>\
             <p>If it wasn't you, ignore this email.</p>",
            encode_double_quoted_attribute(&link),
            encode_safe(&link)
        ),
    }
}

pub fn release_reminder(to: &str, title: &str, release_date: NaiveDate) -> Message {
    Message {
        to: to.to_string(),
        subject: format!("{} is out today", title),
        html: format!(
            "<p><strong>{}</strong> releases today ({}).</p><p>Enjoy the show!</p>",
            encode_safe(title),
            release_date.format("%d/%m/%Y")
        ),
    }
}

#[derive(Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    from: String,
}

impl fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendMailer")
            .field("base_url", &self.base_url)
            .field("from", &self.from)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl ResendMailer {
    pub fn new(base_url: &str, api_key: Option<String>, email_domain: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            from: format!("noreply@{}", email_domain.unwrap_or("localhost")),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        let api_key = self.api_key.as_deref().ok_or(MailError::NotConfigured)?;

        let resp = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(api_key)
            .json(&ResendEmail {
                from: &self.from,
                to: [message.to.as_str()],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{}: {}", status, body)));
        }

        tracing::debug!(to = %message.to, subject = %message.subject, "Mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_recovery_link_points_at_public_url() {
        let msg = password_recovery("a@b.com", "https://reelshelf.app/", "abc123");
        assert!(msg.html.contains("https://reelshelf.app/recover/abc123"));
    }

    #[test]
    fn test_reminder_mentions_title_and_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let msg = release_reminder("a@b.com", "Dune <Part Two>", date);
        assert_eq!(msg.subject, "Dune <Part Two> is out today");
        assert!(msg.html.contains("Dune &lt;Part Two&gt;"));
        assert!(msg.html.contains("07/03/2025"));
    }

    #[test]
    fn test_user_text_cannot_inject_markup() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let msg = release_reminder("a@b.com", "<b>O'Neil</b>", date);
        assert!(!msg.html.contains("<b>"));
        assert!(!msg.html.contains("O'Neil"));

        let msg = welcome("a@b.com", "Ana\" onclick=\"x");
        assert!(!msg.html.contains("\" onclick"));
    }

    #[test]
    fn test_recovery_link_is_attribute_safe() {
        let msg = password_recovery("a@b.com", "https://reelshelf.app/\"onmouseover=\"x", "abc");
        assert!(!msg.html.contains("\"onmouseover"));
        assert!(msg.html.contains("&quot;onmouseover"));
    }

    #[tokio::test]
    async fn test_send_posts_to_resend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_key"))
            .and(body_partial_json(serde_json::json!({
                "from": "noreply@reelshelf.app",
                "to": ["user@example.com"],
                "subject": "Welcome to Reelshelf"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = ResendMailer::new(&server.uri(), Some("re_key".into()), Some("reelshelf.app"));
        mailer.send(welcome("user@example.com", "Ana")).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&server)
            .await;

        let mailer = ResendMailer::new(&server.uri(), Some("re_key".into()), None);
        let err = mailer.send(welcome("user@example.com", "Ana")).await.unwrap_err();
        assert!(matches!(err, MailError::Rejected(ref m) if m.contains("invalid from")));
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_refuses() {
        let mailer = ResendMailer::new("http://127.0.0.1:9", None, None);
        let err = mailer.send(welcome("user@example.com", "Ana")).await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
