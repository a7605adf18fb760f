use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::entities::sea_orm_active_enums::{Gender, PersonType};

/// A person read off a photographed registration form. Anything the model
/// was unsure about is left empty for the president to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPerson {
    pub full_name: String,
    pub nickname: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub person_type: PersonType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub people: Vec<ExtractedPerson>,
    /// Set when the model could not be used; the form falls back to manual entry.
    pub fallback: bool,
}

impl Extraction {
    fn fallback() -> Self {
        Self {
            people: Vec::new(),
            fallback: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPerson {
    #[serde(alias = "full_name", alias = "name")]
    full_name: Option<String>,
    nickname: Option<String>,
    age: Option<Value>,
    gender: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint with image input.
#[derive(Debug, Clone)]
pub struct VisionClient {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    model: String,
}

impl VisionClient {
    pub fn new(endpoint: Option<String>, api_key: Option<String>, model: String) -> Self {
        if endpoint.is_none() {
            warn!("VISION_API_URL missing, attendee extraction always falls back");
        }
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }

    /// Never fails: any problem is logged and reported as a fallback.
    pub async fn extract(
        &self,
        image_base64: &str,
        mime_type: &str,
        person_type: PersonType,
    ) -> Extraction {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Extraction::fallback();
        };

        match self.request(endpoint, image_base64, mime_type, person_type).await {
            Ok(content) => {
                let people = parse_extraction(&content, person_type);
                debug!(count = people.len(), "people extracted from image");
                Extraction {
                    people,
                    fallback: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "vision extraction failed");
                Extraction::fallback()
            }
        }
    }

    async fn request(
        &self,
        endpoint: &str,
        image_base64: &str,
        mime_type: &str,
        person_type: PersonType,
    ) -> Result<String, reqwest::Error> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": prompt(person_type) },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Extract every person listed in this image." },
                        {
                            "type": "image_url",
                            "image_url": { "url": format!("data:{mime_type};base64,{image_base64}") }
                        }
                    ]
                }
            ]
        });

        let mut request = self.client.post(endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

fn prompt(person_type: PersonType) -> String {
    format!(
        "You read handwritten or printed church registration forms. Every person on the form \
         is a {}. Reply with JSON only: an array of objects with the keys fullName, nickname, \
         age (a number) and gender (MALE or FEMALE). Use null for anything you cannot read.",
        person_type.to_value().to_lowercase()
    )
}

/// Reads the model's reply into people. Accepts a bare array, an object with a
/// `people` array, and either wrapped in a markdown code fence. Rows without
/// a name are dropped; ages outside 1..=120 are cleared.
pub fn parse_extraction(content: &str, person_type: PersonType) -> Vec<ExtractedPerson> {
    let json = strip_fence(content);
    let rows: Vec<RawPerson> = match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        Ok(Value::Object(mut map)) => match map.remove("people") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        },
        _ => {
            debug!("vision reply was not JSON");
            Vec::new()
        }
    };

    rows.into_iter()
        .filter_map(|row| {
            let full_name = row
                .full_name?
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if full_name.is_empty() {
                return None;
            }
            Some(ExtractedPerson {
                full_name,
                nickname: row
                    .nickname
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                age: row.age.and_then(parse_age),
                gender: row.gender.as_deref().and_then(parse_gender),
                person_type,
            })
        })
        .collect()
}

fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_age(value: Value) -> Option<i32> {
    let age = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let age = age.round();
    (1.0..=120.0).contains(&age).then_some(age as i32)
}

fn parse_gender(value: &str) -> Option<Gender> {
    match value.trim().to_ascii_lowercase().as_str() {
        "m" | "male" | "boy" => Some(Gender::Male),
        "f" | "female" | "girl" => Some(Gender::Female),
        _ => None,
    }
}
