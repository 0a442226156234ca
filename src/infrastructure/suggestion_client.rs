use crate::domain::models::{CandidateEvent, EventType};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Natural-language schedule generation. Results are untrusted and must be
/// validated before they reach the event store.
#[async_trait]
pub trait SuggestionClient: Send + Sync {
    async fn suggest(&self, instruction: &str) -> Result<Vec<CandidateEvent>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SuggestionDirective {
    pub school_name: String,
    pub academic_year: i32,
}

impl SuggestionDirective {
    pub fn system_instruction(&self) -> String {
        let categories = EventType::ALL
            .iter()
            .map(|event_type| format!("- '{}' ({})", event_type.label(), event_type.scope_hint()))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You are a helpful school administrator assistant for '{school}'.\n\
             Your goal is to generate a list of school events for the year {year} based on the user's request.\n\
             Always format dates as YYYY-MM-DD.\n\
             The year MUST be {year}.\n\n\
             If an event spans multiple days, provide an 'endDate'. If it is a single day event, 'endDate' can be null or omitted.\n\n\
             Map the event type to one of these exact strings:\n{categories}",
            school = self.school_name,
            year = self.academic_year,
        )
    }

    fn response_schema() -> serde_json::Value {
        let labels: Vec<&str> = EventType::ALL.iter().map(|event_type| event_type.label()).collect();
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "date": { "type": "STRING" },
                    "endDate": { "type": "STRING" },
                    "type": { "type": "STRING", "enum": labels },
                    "description": { "type": "STRING" }
                },
                "required": ["title", "date", "type", "description"]
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestGeminiClient {
    client: Client,
    api_key: String,
    model: String,
    directive: SuggestionDirective,
}

impl ReqwestGeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, directive: SuggestionDirective) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            directive,
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Collaborator(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn generate_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = Url::parse(GEMINI_API_BASE)
            .map_err(|error| InfraError::Collaborator(format!("invalid suggestion api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Collaborator("suggestion api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("models");
            segments.push(&format!("{}:generateContent", self.model.trim()));
        }
        Ok(url)
    }

    fn request_body(&self, instruction: &str) -> serde_json::Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": self.directive.system_instruction() }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": instruction }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": SuggestionDirective::response_schema()
            }
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<ResponseCandidate>>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn response_text(body: &str) -> Result<String, InfraError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|error| {
        InfraError::Collaborator(format!("invalid generateContent payload: {error}; body={body}"))
    })?;
    let text: String = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    Ok(text)
}

/// Reads the JSON array of candidates out of model text, tolerating prose
/// around the array. An empty reply means no suggestions.
pub fn extract_candidates(text: &str) -> Result<Vec<CandidateEvent>, InfraError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if let Ok(candidates) = serde_json::from_str::<Vec<CandidateEvent>>(trimmed) {
        return Ok(candidates);
    }
    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start < end {
            return serde_json::from_str::<Vec<CandidateEvent>>(&trimmed[start..=end]).map_err(|error| {
                InfraError::Collaborator(format!("malformed suggestion array: {error}"))
            });
        }
    }
    Err(InfraError::Collaborator(
        "suggestion response did not contain a JSON array".to_string(),
    ))
}

#[async_trait]
impl SuggestionClient for ReqwestGeminiClient {
    async fn suggest(&self, instruction: &str) -> Result<Vec<CandidateEvent>, InfraError> {
        Self::ensure_non_empty(&self.api_key, "api key")?;
        Self::ensure_non_empty(instruction, "instruction")?;

        let endpoint = self.generate_endpoint()?;
        let response = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(instruction))
            .send()
            .await
            .map_err(|error| InfraError::Collaborator(format!("network error while generating events: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Collaborator(format!("failed reading generateContent response: {error}")))?;

        if !status.is_success() {
            return Err(InfraError::Collaborator(if body.trim().is_empty() {
                format!("suggestion api error: http {}", status.as_u16())
            } else {
                format!("suggestion api error: http {}; body={body}", status.as_u16())
            }));
        }

        let text = response_text(&body)?;
        let candidates = extract_candidates(&text)?;
        tracing::info!(count = candidates.len(), model = %self.model, "received event suggestions");
        Ok(candidates)
    }
}
