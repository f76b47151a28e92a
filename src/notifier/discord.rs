use crate::error::NotifyError;
use crate::models::Property;
use crate::notifier::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, warn};

const DISCORD_API: &str = "https://discord.com/api/v10";
const EMBED_COLOR: u32 = 0x00bfff;

/// Posts new listings as embeds to a Discord channel through a bot account
pub struct DiscordNotifier {
    client: Client,
    token: String,
    channel: String,
    api_base: String,
    site_origin: String,
}

impl DiscordNotifier {
    pub fn new(token: &str, channel: &str, site_origin: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            token: token.to_string(),
            channel: channel.to_string(),
            api_base: DISCORD_API.to_string(),
            site_origin: site_origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.api_base, self.channel)
    }
}

/// Build the embed announcing `property`
pub fn build_embed(property: &Property, site_origin: &str, now: DateTime<Utc>) -> Value {
    let link = format!("{site_origin}{}", property.id);

    let mut fields = vec![
        field("💰 Price", format!("R$ {}", property.price)),
        field("🏘️ Type", property.property_type.clone()),
        field("🛏️ Bedrooms", property.bedrooms.clone()),
        field("🚿 Bathrooms", property.bathrooms.clone()),
        field("🚗 Parking Spaces", property.parking_spaces.clone()),
        field("📏 Area", format!("{} m²", property.area_sqm)),
        field("📍 Distance", format!("{} m", property.distance_meters)),
    ];
    if !property.suites.is_empty() && property.suites != "0" {
        fields.push(field("🛁 Suites", property.suites.clone()));
    }

    let mut embed = json!({
        "title": "New Property Listed! 🏠",
        "description": format!(
            "[{} - {}, {}]({})",
            property.street, property.neighborhood, property.city, link
        ),
        "url": link,
        "color": EMBED_COLOR,
        "fields": fields,
        "footer": { "text": format!("Property ID: {}", property.short_id()) },
        "timestamp": now.to_rfc3339(),
    });

    if property.first_photo.starts_with("http") {
        embed["image"] = json!({ "url": property.first_photo });
    } else {
        warn!(id = %property.id, "Invalid or missing photo URL");
    }

    embed
}

fn field(name: &str, value: String) -> Value {
    // Discord rejects empty field values
    let value = if value.trim().is_empty() { "-".to_string() } else { value };
    json!({ "name": name, "value": value, "inline": true })
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify_new_property(&self, property: &Property) -> Result<(), NotifyError> {
        let embed = build_embed(property, &self.site_origin, Utc::now());

        let response = self
            .client
            .post(self.messages_url())
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "embeds": [embed] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(id = %property.id, status = %status, "Error sending Discord embed");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    fn listing() -> Property {
        Property {
            id: "/detalhes/4521".to_string(),
            first_photo: "https://cdn.example.com/4521.jpg".to_string(),
            price: "1500,00".to_string(),
            street: "Rua Major Claudiano".to_string(),
            neighborhood: "Centro".to_string(),
            city: "Franca".to_string(),
            area_sqm: "70".to_string(),
            bedrooms: "2".to_string(),
            bathrooms: "1".to_string(),
            suites: "0".to_string(),
            parking_spaces: "1".to_string(),
            property_type: "Apartamento".to_string(),
            distance_meters: 3200,
            ..Default::default()
        }
    }

    #[test]
    fn embed_links_listing_and_reports_distance() {
        let embed = build_embed(&listing(), "https://www.arantesimoveis.com", Utc::now());

        assert_eq!(embed["url"], "https://www.arantesimoveis.com/detalhes/4521");
        assert_eq!(embed["footer"]["text"], "Property ID: 4521");
        assert_eq!(embed["image"]["url"], "https://cdn.example.com/4521.jpg");

        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 7);
        assert!(fields.iter().any(|f| f["value"] == "3200 m"));
        assert!(fields.iter().any(|f| f["value"] == "R$ 1500,00"));
    }

    #[test]
    fn embed_adds_suites_and_skips_relative_photo() {
        let mut property = listing();
        property.suites = "1".to_string();
        property.first_photo = "/fotos/1.jpg".to_string();

        let embed = build_embed(&property, "https://www.arantesimoveis.com", Utc::now());

        assert_eq!(embed["fields"].as_array().unwrap().len(), 8);
        assert!(embed.get("image").is_none());
    }

    #[tokio::test]
    async fn posts_embed_with_bot_token() {
        type Seen = Arc<Mutex<Vec<(String, serde_json::Value)>>>;
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/channels/:channel/messages",
                post(
                    |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        seen.lock().unwrap().push((auth, body));
                        StatusCode::OK
                    },
                ),
            )
            .with_state(seen.clone());
        let base = spawn_server(app).await;

        let notifier = DiscordNotifier::new("secret", "99", "https://www.arantesimoveis.com")
            .unwrap()
            .with_api_base(base);
        notifier.notify_new_property(&listing()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "Bot secret");
        assert_eq!(seen[0].1["embeds"][0]["title"], "New Property Listed! 🏠");
    }

    #[tokio::test]
    async fn rejected_post_is_an_error() {
        let app = Router::new().route(
            "/channels/:channel/messages",
            post(|| async { (StatusCode::FORBIDDEN, "Missing Access") }),
        );
        let base = spawn_server(app).await;

        let notifier = DiscordNotifier::new("secret", "99", "https://www.arantesimoveis.com")
            .unwrap()
            .with_api_base(base);
        let err = notifier.notify_new_property(&listing()).await.unwrap_err();

        assert!(matches!(err, NotifyError::Rejected { status: 403, .. }));
    }
}
