use crate::domain::models::CalendarEvent;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};

pub const COLLECTION_SCHEMA: u8 = 1;

#[derive(Debug, Serialize)]
struct StoredCollectionRef<'a> {
    schema: u8,
    events: &'a [CalendarEvent],
}

#[derive(Debug, Deserialize)]
struct StoredCollection {
    schema: u8,
    events: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredPayload {
    Versioned(StoredCollection),
    Legacy(Vec<CalendarEvent>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCollection {
    pub events: Vec<CalendarEvent>,
    /// Payload predates the schema envelope and is rewritten on the next mutation.
    pub legacy: bool,
}

pub fn encode_collection(events: &[CalendarEvent]) -> Result<String, InfraError> {
    let payload = StoredCollectionRef {
        schema: COLLECTION_SCHEMA,
        events,
    };
    Ok(serde_json::to_string(&payload)?)
}

pub fn decode_collection(raw: &str) -> Result<DecodedCollection, InfraError> {
    match serde_json::from_str::<StoredPayload>(raw)? {
        StoredPayload::Versioned(stored) => {
            if stored.schema != COLLECTION_SCHEMA {
                return Err(InfraError::Persistence(format!(
                    "unsupported event collection schema {}",
                    stored.schema
                )));
            }
            Ok(DecodedCollection {
                events: stored.events,
                legacy: false,
            })
        }
        StoredPayload::Legacy(events) => Ok(DecodedCollection {
            events,
            legacy: true,
        }),
    }
}
