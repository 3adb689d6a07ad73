//! Inbound story requests.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Wire form of a request as sent by clients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Voice and synthesis model used when a request names neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDefaults {
    pub voice: String,
    pub tts_model: String,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            voice: "Puck".into(),
            tts_model: "gemini-2.5-flash-tts".into(),
        }
    }
}

/// An accepted request. One request yields one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoryRequest {
    pub topic: String,
    pub voice: String,
    pub tts_model: String,
    /// Summary returned by the previous run on this connection.
    pub context: Option<String>,
}

impl StoryRequest {
    /// Interpret one client message.
    ///
    /// Anything that is not a JSON object with a non-empty `topic` is taken
    /// verbatim as the topic, with the default voice and model.
    pub fn parse(message: &[u8], defaults: &RequestDefaults) -> Self {
        match serde_json::from_slice::<RequestMessage>(message) {
            Ok(req) if !req.topic.is_empty() => Self {
                topic: req.topic,
                voice: non_empty(req.voice).unwrap_or_else(|| defaults.voice.clone()),
                tts_model: non_empty(req.tts_model).unwrap_or_else(|| defaults.tts_model.clone()),
                context: non_empty(req.context),
            },
            parsed => {
                if let Err(e) = parsed {
                    debug!(error = %e, "request is not JSON; using raw text as topic");
                }
                Self {
                    topic: String::from_utf8_lossy(message).into_owned(),
                    voice: defaults.voice.clone(),
                    tts_model: defaults.tts_model.clone(),
                    context: None,
                }
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RequestDefaults {
        RequestDefaults::default()
    }

    #[test]
    fn parses_full_json_request() {
        let msg = br#"{"topic":"a fox","voice":"Kore","tts_model":"m1","context":"Earlier."}"#;
        let req = StoryRequest::parse(msg, &defaults());
        assert_eq!(
            req,
            StoryRequest {
                topic: "a fox".into(),
                voice: "Kore".into(),
                tts_model: "m1".into(),
                context: Some("Earlier.".into()),
            }
        );
    }

    #[test]
    fn missing_or_empty_fields_use_defaults() {
        let req = StoryRequest::parse(br#"{"topic":"a fox","voice":"","context":""}"#, &defaults());
        assert_eq!(req.voice, "Puck");
        assert_eq!(req.tts_model, "gemini-2.5-flash-tts");
        assert_eq!(req.context, None);
    }

    #[test]
    fn raw_text_becomes_topic() {
        let req = StoryRequest::parse(b"a sleepy dragon", &defaults());
        assert_eq!(req.topic, "a sleepy dragon");
        assert_eq!(req.voice, "Puck");
        assert_eq!(req.context, None);
    }

    #[test]
    fn empty_topic_falls_back_to_raw_message() {
        let msg = br#"{"topic":"","voice":"Kore"}"#;
        let req = StoryRequest::parse(msg, &defaults());
        assert_eq!(req.topic, r#"{"topic":"","voice":"Kore"}"#);
        assert_eq!(req.voice, "Puck");
    }

    #[test]
    fn serializes_without_absent_fields() {
        let msg = RequestMessage {
            topic: "a fox".into(),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&msg).unwrap(), r#"{"topic":"a fox"}"#);
    }
}
