//! HTML extraction for listing cards and detail pages.
//!
//! Each card embeds its listing as JSON in a hidden input. That payload wins;
//! the visible text on the card only fills fields the payload left blank.

use crate::models::{Property, RawPayload, DETAIL_PREFIX};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// One listing card: the normalized record plus the payload it came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub property: Property,
    pub raw: RawPayload,
}

/// Fields read from a listing's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub condo_fee: Option<String>,
    pub suites: Option<String>,
    pub property_type: Option<String>,
    pub parking_spaces: Option<String>,
}

impl DetailFields {
    pub fn is_empty(&self) -> bool {
        self.condo_fee.is_none()
            && self.suites.is_none()
            && self.property_type.is_none()
            && self.parking_spaces.is_none()
    }

    /// Overwrite the matching fields of `property` and refresh its total price
    pub fn merge_into(self, property: &mut Property) {
        if let Some(fee) = self.condo_fee {
            property.condo_fee = fee;
        }
        if let Some(suites) = self.suites {
            property.suites = suites;
        }
        if let Some(kind) = self.property_type {
            property.property_type = kind;
        }
        if let Some(parking) = self.parking_spaces {
            property.parking_spaces = parking;
        }
        property.derive_total_price();
    }
}

/// Detail table labels, matched by case-sensitive substring, first hit wins
const DETAIL_LABELS: &[(&str, DetailField)] = &[
    ("Condomínio", DetailField::CondoFee),
    ("Suíte", DetailField::Suites),
    ("Tipo", DetailField::PropertyType),
    ("Vaga", DetailField::ParkingSpaces),
    ("Garage", DetailField::ParkingSpaces),
];

#[derive(Debug, Clone, Copy)]
enum DetailField {
    CondoFee,
    Suites,
    PropertyType,
    ParkingSpaces,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Visible card text used to fill blanks in the embedded payload
struct CardTextSelectors {
    bedrooms: Selector,
    bathrooms: Selector,
    area: Selector,
    parking: Selector,
    price: Selector,
}

impl CardTextSelectors {
    fn new() -> Self {
        Self {
            bedrooms: selector(".fa-bed + span"),
            bathrooms: selector(".fa-bath + span"),
            area: selector(".area span"),
            parking: selector(".fa-car + span"),
            price: selector(".money"),
        }
    }
}

/// Parse every listing card on a results page.
///
/// A card whose embedded JSON does not decode still yields a `Listing`, with an
/// empty property, so the failure shows up downstream instead of vanishing.
pub fn parse_listing_cards(html: &str, origin: &Url) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let card_selector = selector(".card-imovel");
    let json_selector = selector("input.json_imovel");
    let text_selectors = CardTextSelectors::new();

    let mut listings = Vec::new();

    for card in document.select(&card_selector) {
        let raw = card
            .select(&json_selector)
            .next()
            .and_then(|input| input.value().attr("value"))
            .unwrap_or("")
            .to_string();

        let mut property: Property = match serde_json::from_str(&raw) {
            Ok(property) => property,
            Err(e) => {
                warn!(error = %e, "Error unmarshalling listing card JSON");
                listings.push(Listing {
                    property: Property::default(),
                    raw: raw.into(),
                });
                continue;
            }
        };

        fill_from_card_text(&mut property, &card, &text_selectors);
        property.first_photo = absolutize(&property.first_photo, origin);
        property.id = normalize_id(&property.id);
        property.derive_total_price();

        debug!(id = %property.id, "Extracted listing card");
        listings.push(Listing {
            property,
            raw: raw.into(),
        });
    }

    listings
}

fn fill_from_card_text(property: &mut Property, card: &ElementRef, selectors: &CardTextSelectors) {
    let text_of = |selector: &Selector| -> String {
        card.select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    };

    fill_if_empty(&mut property.bedrooms, text_of(&selectors.bedrooms));
    fill_if_empty(&mut property.bathrooms, text_of(&selectors.bathrooms));
    fill_if_empty(&mut property.area_sqm, text_of(&selectors.area));
    fill_if_empty(&mut property.parking_spaces, text_of(&selectors.parking));
    fill_if_empty(&mut property.price, text_of(&selectors.price));
}

/// Take `scraped` only when `field` is still blank
fn fill_if_empty(field: &mut String, scraped: String) {
    if field.trim().is_empty() && !scraped.is_empty() {
        *field = scraped;
    }
}

/// Resolve a site-relative URL against the site origin
pub fn absolutize(url: &str, origin: &Url) -> String {
    if !url.starts_with('/') {
        return url.to_string();
    }
    origin
        .join(url)
        .map(|joined| joined.to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// Store ids as detail paths so they double as links to the listing
pub fn normalize_id(id: &str) -> String {
    let id = id.trim();
    if id.is_empty() || id.starts_with('/') {
        id.to_string()
    } else {
        format!("{DETAIL_PREFIX}{id}")
    }
}

/// Read condo fee, suites, type and parking from a detail page's label/value table
pub fn parse_detail_fields(html: &str) -> DetailFields {
    let document = Html::parse_document(html);
    let row_selector = selector("tr");
    let cell_selector = selector("th, td");

    let mut fields = DetailFields::default();

    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        let (Some(label), Some(value)) = (cells.first(), cells.get(1)) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let Some((_, field)) = DETAIL_LABELS.iter().find(|(needle, _)| label.contains(needle))
        else {
            continue;
        };

        let slot = match field {
            DetailField::CondoFee => &mut fields.condo_fee,
            DetailField::Suites => &mut fields.suites,
            DetailField::PropertyType => &mut fields.property_type,
            DetailField::ParkingSpaces => &mut fields.parking_spaces,
        };
        if slot.is_none() {
            *slot = Some(value.clone());
        }
    }

    fields
}
