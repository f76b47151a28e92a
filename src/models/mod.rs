use serde::{Deserialize, Deserializer, Serialize};

/// Path prefix the source site uses for listing detail pages
pub const DETAIL_PREFIX: &str = "/detalhes/";

/// Core property data model.
///
/// Field names on the wire follow the JSON payload embedded in each listing
/// card. Counts stay as text because the site mixes numbers and words.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "first_foto", default, deserialize_with = "lenient_string")]
    pub first_photo: String,
    #[serde(rename = "preco", default, deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(rename = "condominio", default, deserialize_with = "lenient_string")]
    pub condo_fee: String,
    #[serde(rename = "preco_total", default, deserialize_with = "lenient_string")]
    pub total_price: String,
    #[serde(rename = "logradouro", default, deserialize_with = "lenient_string")]
    pub street: String,
    #[serde(rename = "bairro", default, deserialize_with = "lenient_string")]
    pub neighborhood: String,
    #[serde(rename = "cidade", default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(rename = "metragem", default, deserialize_with = "lenient_string")]
    pub area_sqm: String,
    #[serde(rename = "quartos", default, deserialize_with = "lenient_string")]
    pub bedrooms: String,
    #[serde(rename = "banheiros", default, deserialize_with = "lenient_string")]
    pub bathrooms: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub suites: String,
    #[serde(rename = "garagens", default, deserialize_with = "lenient_string")]
    pub parking_spaces: String,
    #[serde(rename = "tipo_imovel", default, deserialize_with = "lenient_string")]
    pub property_type: String,
    /// Set once on first insert, carried over on every later crawl
    #[serde(default)]
    pub distance_meters: i64,
}

impl Property {
    /// Recompute `total_price` from `price` and `condo_fee`.
    ///
    /// Sums when both parse as amounts, otherwise passes `price` through as-is.
    pub fn derive_total_price(&mut self) {
        self.total_price = match (parse_amount(&self.price), parse_amount(&self.condo_fee)) {
            (Some(price), Some(fee)) => format!("{:.2}", price + fee),
            _ => self.price.clone(),
        };
    }

    /// Address parts used as the origin of a distance lookup
    pub fn origin_parts(&self) -> [&str; 3] {
        [&self.street, &self.neighborhood, &self.city]
    }

    /// Id without the detail path prefix
    pub fn short_id(&self) -> &str {
        self.id.strip_prefix(DETAIL_PREFIX).unwrap_or(&self.id)
    }
}

/// Original card payload stored next to each property for auditing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPayload(pub String);

impl RawPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawPayload {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RawPayload {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Parse a Brazilian-formatted amount like "R$ 1.500,00" or "1500,00".
///
/// With a comma present, dots are thousands separators and the comma is the
/// decimal mark. Without one, the text is parsed as a plain decimal.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    normalized.parse().ok()
}

/// Accept strings, numbers, booleans or null where the site promises a string
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}
