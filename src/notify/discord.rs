// Discord channel alerts via the bot REST API.
//
// The destination channel is looked up once (GET /channels/{id}) before the
// first message; a failed lookup is not cached, so a channel created later
// is picked up on the next lead. Every failure comes back as a
// DeliveryError for the dispatcher to log.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{LeadSummary, Notifier};
use crate::db::models::Lead;
use crate::error::DeliveryError;
use crate::output::truncate_chars;

pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// Discord's blue, as an RGB integer.
const EMBED_COLOR: u32 = 0x3498DB;

pub struct DiscordNotifier {
    client: Client,
    api_url: String,
    token: String,
    channel_id: String,
    channel_name: OnceCell<String>,
}

impl DiscordNotifier {
    pub fn new(token: String, channel_id: String) -> Self {
        Self::with_api_url(DEFAULT_API_URL, token, channel_id)
    }

    /// Point at a different API base (tests, proxies).
    pub fn with_api_url(api_url: &str, token: String, channel_id: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            channel_id,
            channel_name: OnceCell::new(),
        }
    }

    /// Resolve the configured channel, caching the result on success.
    async fn channel(&self) -> Result<&str, DeliveryError> {
        let name = self
            .channel_name
            .get_or_try_init(|| async {
                let url = format!("{}/channels/{}", self.api_url, self.channel_id);
                let response = self
                    .client
                    .get(&url)
                    .header("Authorization", format!("Bot {}", self.token))
                    .send()
                    .await?;

                match response.status() {
                    StatusCode::NOT_FOUND => {
                        Err(DeliveryError::ChannelNotFound(self.channel_id.clone()))
                    }
                    status if !status.is_success() => Err(DeliveryError::Rejected {
                        status: status.as_u16(),
                        message: response.text().await.unwrap_or_default(),
                    }),
                    _ => {
                        let channel: ChannelInfo = response.json().await?;
                        let name = channel.name.unwrap_or(channel.id);
                        info!(channel = %name, "Resolved Discord channel");
                        Ok(name)
                    }
                }
            })
            .await?;
        Ok(name.as_str())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn notify(&self, lead: &Lead) -> Result<(), DeliveryError> {
        let channel = self.channel().await?;

        let payload = MessagePayload::for_lead(&LeadSummary::from_lead(lead));
        let url = format!("{}/channels/{}/messages", self.api_url, self.channel_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        debug!(channel, platform = %lead.platform, external_id = %lead.external_id, "Discord alert sent");
        Ok(())
    }
}

// -- Discord API types --

#[derive(Deserialize)]
struct ChannelInfo {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    color: u32,
    fields: Vec<EmbedField>,
    footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: &'static str,
}

impl MessagePayload {
    fn for_lead(summary: &LeadSummary) -> Self {
        // Discord rejects empty field values and caps them at 1024 characters
        let field = |name, value: &str| EmbedField {
            name,
            value: if value.is_empty() {
                "(none)".to_string()
            } else {
                truncate_chars(value, 1000)
            },
            inline: false,
        };

        Self {
            embeds: vec![Embed {
                title: format!("New Lead ({})", summary.platform),
                color: EMBED_COLOR,
                fields: vec![
                    field("Title", &summary.title),
                    field("Description", &summary.description),
                    field("Link", &format!("[View Post]({})", summary.link)),
                ],
                footer: EmbedFooter {
                    text: "Leadwatch",
                },
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn lead() -> Lead {
        Lead {
            id: 1,
            platform: "Reddit".to_string(),
            external_id: "abc123".to_string(),
            title: "remote developer job".to_string(),
            content: "hello world".to_string(),
            link: "http://x".to_string(),
            draft_generated: false,
            applied: false,
            created_at: Utc::now(),
        }
    }

    /// Minimal HTTP/1.1 responder on loopback. `respond` maps
    /// (method, path) to (status line, body); every request is recorded.
    async fn fake_discord(
        respond: fn(&str, &str) -> (&'static str, &'static str),
    ) -> (String, Arc<Mutex<Vec<(String, String)>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let header_end = loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break None;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break Some(pos + 4);
                    }
                };
                let Some(header_end) = header_end else { continue };

                let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let content_length = head
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                while buf.len() < header_end + content_length {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }

                let mut request_line = head.lines().next().unwrap_or("").split_whitespace();
                let method = request_line.next().unwrap_or("").to_string();
                let path = request_line.next().unwrap_or("").to_string();
                let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
                recorded.lock().unwrap().push((format!("{method} {path}"), body));

                let (status, reply) = respond(&method, &path);
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
                    reply.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), seen)
    }

    #[tokio::test]
    async fn test_channel_not_found_is_delivery_error() {
        let (url, seen) = fake_discord(|_, _| ("404 Not Found", r#"{"message":"Unknown Channel"}"#)).await;
        let notifier = DiscordNotifier::with_api_url(&url, "t".into(), "42".into());

        let err = notifier.notify(&lead()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::ChannelNotFound(ref id) if id == "42"));
        // Never got as far as posting
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sends_embed_after_lookup() {
        let (url, seen) = fake_discord(|method, _| match method {
            "GET" => ("200 OK", r#"{"id":"42","name":"leads"}"#),
            _ => ("200 OK", r#"{"id":"1"}"#),
        })
        .await;
        let notifier = DiscordNotifier::with_api_url(&url, "t".into(), "42".into());

        notifier.notify(&lead()).await.unwrap();
        notifier.notify(&lead()).await.unwrap();

        let requests = seen.lock().unwrap();
        let lines: Vec<&str> = requests.iter().map(|(l, _)| l.as_str()).collect();
        // Lookup happens once, then one POST per lead
        assert_eq!(
            lines,
            vec![
                "GET /channels/42",
                "POST /channels/42/messages",
                "POST /channels/42/messages"
            ]
        );

        let body: serde_json::Value = serde_json::from_str(&requests[1].1).unwrap();
        let embed = &body["embeds"][0];
        assert_eq!(embed["title"], "New Lead (Reddit)");
        assert_eq!(embed["fields"][0]["value"], "remote developer job");
        assert_eq!(embed["fields"][1]["value"], "hello world");
        assert_eq!(embed["fields"][2]["value"], "[View Post](http://x)");
    }

    #[tokio::test]
    async fn test_unreachable_api_is_network_error() {
        let notifier = DiscordNotifier::with_api_url("http://127.0.0.1:9", "t".into(), "42".into());
        let err = notifier.notify(&lead()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Network(_)));
    }

    #[test]
    fn test_empty_content_field_is_filled() {
        let mut l = lead();
        l.content.clear();
        let payload = MessagePayload::for_lead(&LeadSummary::from_lead(&l));
        assert_eq!(payload.embeds[0].fields[1].value, "(none)");
    }
}
