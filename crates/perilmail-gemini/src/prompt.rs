//! Prompt construction for outreach email generation.
//!
//! Both builders end with the same strict-JSON instruction so the reply
//! parser has a stable shape to aim at; [`crate::parse`] absorbs the replies
//! that ignore it.

use chrono::{DateTime, Utc};

/// Recipient facts embedded in every prompt.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub state: String,
    pub house_value: i64,
    pub has_insurance: bool,
}

/// Earthquake facts for [`earthquake_prompt`]. Feed data is sparse, so every
/// field is optional and renders with an explicit fallback.
#[derive(Debug, Clone)]
pub struct EarthquakeFacts {
    pub magnitude: Option<f64>,
    pub place: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Weather facts for [`weather_prompt`].
#[derive(Debug, Clone)]
pub struct WeatherFacts {
    pub event_type: String,
    pub severity: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub rainfall_mm: Option<f64>,
    pub wind_speed_kph: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
}

/// Subject line used when a model reply cannot be parsed as JSON.
#[must_use]
pub fn fallback_subject(peril: &str, city: &str) -> String {
    format!("{peril} Insurance Information for {city} Residents")
}

/// Build the generation prompt for one earthquake outreach email.
#[must_use]
pub fn earthquake_prompt(
    recipient: &Recipient,
    quake: &EarthquakeFacts,
    distance_km: f64,
    risk_level: &str,
    campaign_context: &str,
) -> String {
    let insurance_status = if recipient.has_insurance {
        "Has insurance"
    } else {
        "No earthquake insurance"
    };
    let magnitude = quake
        .magnitude
        .map_or_else(|| "Unknown".to_string(), |m| m.to_string());
    let place = quake.place.as_deref().unwrap_or("Unknown location");
    let date = quake
        .occurred_at
        .map_or_else(|| "Recent".to_string(), |t| t.format("%Y-%m-%d").to_string());

    format!(
        r#"You are an insurance marketing professional writing a personalized email about earthquake insurance. Use the following information to create a compelling, professional, and personalized email:

RECIPIENT INFORMATION:
- Name: {first_name} {last_name}
- Location: {city}, {state}
- Home Value: ${house_value}
- Current Insurance Status: {insurance_status}

EARTHQUAKE INFORMATION:
- Magnitude: {magnitude}
- Location: {place}
- Distance from recipient: {distance_km} km
- Risk Level: {risk_level}
- Date: {date}

CAMPAIGN CONTEXT:
{campaign_context}

REQUIREMENTS:
1. Create a compelling subject line (max 60 characters)
2. Write a personalized email body that:
   - Addresses the recipient by first name
   - References the specific earthquake and its proximity
   - Mentions their home value appropriately
   - Explains earthquake insurance importance
   - Includes a clear call-to-action
   - Is professional but conversational
   - Is 200-400 words long
   - Includes unsubscribe information

FORMAT YOUR RESPONSE AS JSON:
{{
  "subject": "Your subject line here",
  "body": "Your email body here"
}}

Only return the JSON, no other text."#,
        first_name = recipient.first_name,
        last_name = recipient.last_name,
        city = recipient.city,
        state = recipient.state,
        house_value = thousands(recipient.house_value),
    )
}

/// Build the generation prompt for one severe-weather outreach email.
#[must_use]
pub fn weather_prompt(
    recipient: &Recipient,
    event: &WeatherFacts,
    distance_km: f64,
    risk_level: &str,
    campaign_context: &str,
) -> String {
    let insurance_status = if recipient.has_insurance {
        "Has general insurance"
    } else {
        "No weather insurance coverage"
    };
    let event_type = capitalize(&event.event_type);
    let severity = capitalize(&event.severity);
    let starts = event.starts_at.format("%Y-%m-%d").to_string();
    let ends = event
        .ends_at
        .map_or_else(|| "Ongoing".to_string(), |t| t.format("%Y-%m-%d").to_string());
    let description = event
        .description
        .as_deref()
        .unwrap_or("Weather event in progress");

    let mut measurements = String::new();
    if let Some(rainfall) = event.rainfall_mm {
        measurements.push_str(&format!("\n- Expected Rainfall: {rainfall}mm"));
    }
    if let Some(wind) = event.wind_speed_kph {
        measurements.push_str(&format!("\n- Wind Speed: {wind} km/h"));
    }
    if let Some(temperature) = event.temperature_c {
        measurements.push_str(&format!("\n- Temperature: {temperature}°C"));
    }
    if let Some(humidity) = event.humidity_pct {
        measurements.push_str(&format!("\n- Humidity: {humidity}%"));
    }

    format!(
        r#"You are an insurance marketing professional writing a personalized email about weather insurance. Use the following information to create a compelling, professional, and personalized email:

RECIPIENT INFORMATION:
- Name: {first_name} {last_name}
- Location: {city}, {state}
- Home Value: ${house_value}
- Current Insurance Status: {insurance_status}

WEATHER EVENT INFORMATION:
- Event Type: {event_type}
- Severity: {severity}
- Location: {location}
- Distance from recipient: {distance_km} km
- Risk Level: {risk_level}
- Start Time: {starts}
- End Time: {ends}
- Description: {description}{measurements}

CAMPAIGN CONTEXT:
{campaign_context}

REQUIREMENTS:
1. Create a compelling subject line (max 60 characters)
2. Write a personalized email body that:
   - Addresses the recipient by first name
   - References the specific weather event and its proximity
   - Mentions their home value appropriately
   - Explains weather insurance importance for residents of the affected region
   - Highlights specific risks based on weather event type (flooding, storm damage, etc.)
   - Includes a clear call-to-action
   - Is professional but conversational
   - Is 200-400 words long
   - Includes unsubscribe information

WEATHER EVENT SPECIFIC MESSAGING:
- For rain/flood: Focus on water damage, foundation issues, property flooding
- For storms: Emphasize roof damage, window breakage, structural damage
- For cyclones: Highlight comprehensive property protection, evacuation coverage
- For heatwaves: Discuss HVAC damage, cooling system failures

FORMAT YOUR RESPONSE AS JSON:
{{
  "subject": "Your subject line here",
  "body": "Your email body here"
}}

Only return the JSON, no other text."#,
        first_name = recipient.first_name,
        last_name = recipient.last_name,
        city = recipient.city,
        state = recipient.state,
        house_value = thousands(recipient.house_value),
        location = event.location,
    )
}

fn thousands(value: i64) -> String {
    let raw = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{out}")
    } else {
        out
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn recipient() -> Recipient {
        Recipient {
            first_name: "Maria".to_string(),
            last_name: "Gonzalez".to_string(),
            city: "San Jose".to_string(),
            state: "CA".to_string(),
            house_value: 750_000,
            has_insurance: false,
        }
    }

    #[test]
    fn earthquake_prompt_embeds_recipient_and_event() {
        let quake = EarthquakeFacts {
            magnitude: Some(4.5),
            place: Some("10 km NW of Compton, CA".to_string()),
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).single(),
        };
        let prompt = earthquake_prompt(&recipient(), &quake, 12.3, "high", "Spring campaign");

        assert!(prompt.contains("- Name: Maria Gonzalez"));
        assert!(prompt.contains("- Location: San Jose, CA"));
        assert!(prompt.contains("- Home Value: $750,000"));
        assert!(prompt.contains("Current Insurance Status: No earthquake insurance"));
        assert!(prompt.contains("- Magnitude: 4.5"));
        assert!(prompt.contains("- Location: 10 km NW of Compton, CA"));
        assert!(prompt.contains("- Distance from recipient: 12.3 km"));
        assert!(prompt.contains("- Risk Level: high"));
        assert!(prompt.contains("- Date: 2026-03-14"));
        assert!(prompt.contains("Spring campaign"));
        assert!(prompt.ends_with("Only return the JSON, no other text."));
    }

    #[test]
    fn earthquake_prompt_uses_explicit_fallbacks_for_sparse_feeds() {
        let quake = EarthquakeFacts {
            magnitude: None,
            place: None,
            occurred_at: None,
        };
        let prompt = earthquake_prompt(&recipient(), &quake, 3.0, "low", "ctx");

        assert!(prompt.contains("- Magnitude: Unknown"));
        assert!(prompt.contains("- Location: Unknown location"));
        assert!(prompt.contains("- Date: Recent"));
    }

    #[test]
    fn insured_recipient_is_described_as_covered() {
        let mut covered = recipient();
        covered.has_insurance = true;
        let quake = EarthquakeFacts {
            magnitude: Some(3.0),
            place: None,
            occurred_at: None,
        };
        let prompt = earthquake_prompt(&covered, &quake, 5.0, "medium", "ctx");
        assert!(prompt.contains("Current Insurance Status: Has insurance"));
    }

    #[test]
    fn weather_prompt_capitalizes_and_lists_present_measurements() {
        let event = WeatherFacts {
            event_type: "flood".to_string(),
            severity: "severe".to_string(),
            location: "Sacramento Valley".to_string(),
            starts_at: Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 1, 12, 0, 0, 0).single(),
            description: Some("River flooding expected".to_string()),
            rainfall_mm: Some(150.0),
            wind_speed_kph: Some(25.0),
            temperature_c: None,
            humidity_pct: None,
        };
        let prompt = weather_prompt(&recipient(), &event, 5.2, "high", "Monsoon outreach");

        assert!(prompt.contains("- Event Type: Flood"));
        assert!(prompt.contains("- Severity: Severe"));
        assert!(prompt.contains("- Location: Sacramento Valley"));
        assert!(prompt.contains("- Start Time: 2026-01-10"));
        assert!(prompt.contains("- End Time: 2026-01-12"));
        assert!(prompt.contains("- Description: River flooding expected"));
        assert!(prompt.contains("- Expected Rainfall: 150mm"));
        assert!(prompt.contains("- Wind Speed: 25 km/h"));
        assert!(!prompt.contains("- Temperature:"));
        assert!(!prompt.contains("- Humidity:"));
        assert!(prompt.contains("WEATHER EVENT SPECIFIC MESSAGING:"));
    }

    #[test]
    fn open_ended_weather_events_render_as_ongoing() {
        let event = WeatherFacts {
            event_type: "storm".to_string(),
            severity: "heavy".to_string(),
            location: "Gulf Coast".to_string(),
            starts_at: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            ends_at: None,
            description: None,
            rainfall_mm: None,
            wind_speed_kph: None,
            temperature_c: None,
            humidity_pct: None,
        };
        let prompt = weather_prompt(&recipient(), &event, 40.0, "medium", "ctx");

        assert!(prompt.contains("- End Time: Ongoing"));
        assert!(prompt.contains("- Description: Weather event in progress"));
    }

    #[test]
    fn fallback_subject_names_peril_and_city() {
        assert_eq!(
            fallback_subject("Earthquake", "Oakland"),
            "Earthquake Insurance Information for Oakland Residents"
        );
        assert_eq!(
            fallback_subject("Weather", "Portland"),
            "Weather Insurance Information for Portland Residents"
        );
    }

    #[test]
    fn thousands_groups_from_the_right() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(950), "950");
        assert_eq!(thousands(214_900), "214,900");
        assert_eq!(thousands(1_040_000), "1,040,000");
    }
}
