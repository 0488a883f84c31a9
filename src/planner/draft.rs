//! The itinerary draft returned by the generation provider, and the
//! defensive extraction that turns free-text replies into it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::JsonExtraction;
use crate::error::GenerationError;

// Deserialization runs on lowercased keys, serialization restores the
// provider's PascalCase names for the audit payload.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "lowercase"))]
pub struct DraftPlan {
    #[serde(rename(serialize = "PlanName", deserialize = "planname"), default)]
    pub plan_name: String,
    #[serde(default)]
    pub days: Vec<DraftDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "lowercase"))]
pub struct DraftDay {
    #[serde(rename(serialize = "DayNumber", deserialize = "daynumber"), default)]
    pub day_number: Option<i32>,
    #[serde(default)]
    pub activities: Vec<DraftActivity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "lowercase"))]
pub struct DraftActivity {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(rename(serialize = "StartTime", deserialize = "starttime"), default)]
    pub start_time: Option<String>,
    #[serde(rename(serialize = "EndTime", deserialize = "endtime"), default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub place: Option<DraftPlace>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "lowercase"))]
pub struct DraftPlace {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl DraftDay {
    /// Draft day number, or the 1-based position when the provider omitted it.
    pub fn number(&self, position: usize) -> i32 {
        self.day_number
            .unwrap_or_else(|| i32::try_from(position + 1).unwrap_or(i32::MAX))
    }
}

impl DraftPlan {
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Rejects drafts that cannot be materialized: no plan name, or two days
    /// claiming the same day number.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.plan_name.trim().is_empty() {
            return Err(GenerationError::Format("plan name is missing".to_string()));
        }

        let mut seen = HashSet::new();
        for (position, day) in self.days.iter().enumerate() {
            let number = day.number(position);
            if !seen.insert(number) {
                return Err(GenerationError::Format(format!(
                    "day number {} appears more than once",
                    number
                )));
            }
        }
        Ok(())
    }
}

/// Cuts the candidate JSON object out of a free-text reply.
pub fn extract_json(reply: &str, mode: JsonExtraction) -> Result<&str, GenerationError> {
    match mode {
        JsonExtraction::FirstLastBrace => first_last_brace(reply),
        JsonExtraction::Balanced => balanced_object(reply),
    }
}

fn first_last_brace(reply: &str) -> Result<&str, GenerationError> {
    match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&reply[start..=end]),
        _ => Err(GenerationError::Format(
            "no JSON object found in reply".to_string(),
        )),
    }
}

fn balanced_object(reply: &str) -> Result<&str, GenerationError> {
    for (start, _) in reply.match_indices('{') {
        if let Some(len) = balanced_len(&reply[start..]) {
            let candidate = &reply[start..start + len];
            if matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_))) {
                return Ok(candidate);
            }
        }
    }
    Err(GenerationError::Format(
        "no balanced JSON object found in reply".to_string(),
    ))
}

/// Byte length of the brace-balanced span starting at `s[0] == '{'`.
fn balanced_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in s.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Extracts, parses and validates the itinerary draft from a reply.
pub fn parse_draft(reply: &str, mode: JsonExtraction) -> Result<DraftPlan, GenerationError> {
    let candidate = extract_json(reply, mode)?;

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| GenerationError::Format(format!("invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(GenerationError::Format(
            "reply JSON is not an object".to_string(),
        ));
    }

    let draft: DraftPlan = serde_json::from_value(lowercase_keys(value))
        .map_err(|e| GenerationError::Format(format!("unexpected itinerary shape: {}", e)))?;
    draft.validate()?;
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FENCED: &str = "Sure! Here is your plan: ```json\n{\"PlanName\":\"X\",\"Days\":[]}\n``` Hope that helps!";

    #[test]
    fn extracts_from_first_to_last_brace() {
        let candidate = extract_json(FENCED, JsonExtraction::FirstLastBrace).unwrap();
        assert_eq!(candidate, "{\"PlanName\":\"X\",\"Days\":[]}");

        let draft = parse_draft(FENCED, JsonExtraction::FirstLastBrace).unwrap();
        assert_eq!(draft.plan_name, "X");
        assert!(draft.days.is_empty());
    }

    #[test]
    fn reply_without_braces_is_format_error() {
        for reply in ["I cannot help with that.", "} backwards {", ""] {
            assert!(matches!(
                parse_draft(reply, JsonExtraction::FirstLastBrace),
                Err(GenerationError::Format(_))
            ));
        }
    }

    #[test]
    fn stray_brace_breaks_first_last_but_not_balanced() {
        let reply = "Note {see below}: {\"PlanName\":\"Ege\",\"Days\":[]}";
        assert!(parse_draft(reply, JsonExtraction::FirstLastBrace).is_err());

        let draft = parse_draft(reply, JsonExtraction::Balanced).unwrap();
        assert_eq!(draft.plan_name, "Ege");
    }

    #[test]
    fn balanced_scan_ignores_braces_in_strings() {
        let reply = r#"{"PlanName":"Curly } trip","Days":[]} trailing }"#;
        let candidate = extract_json(reply, JsonExtraction::Balanced).unwrap();
        assert_eq!(candidate, r#"{"PlanName":"Curly } trip","Days":[]}"#);
    }

    #[test]
    fn property_names_are_case_insensitive() {
        let reply = r#"{
            "planName": "Karadeniz",
            "DAYS": [{
                "dayNumber": 1,
                "activities": [{
                    "TITLE": "Uzungöl",
                    "startTime": "09:00",
                    "EndTime": "11:30",
                    "place": { "NAME": "Uzungöl", "city": "Trabzon" }
                }]
            }]
        }"#;

        let draft = parse_draft(reply, JsonExtraction::FirstLastBrace).unwrap();
        assert_eq!(draft.plan_name, "Karadeniz");
        let activity = &draft.days[0].activities[0];
        assert_eq!(activity.title.as_deref(), Some("Uzungöl"));
        assert_eq!(activity.end_time.as_deref(), Some("11:30"));
        assert_eq!(
            activity.place.as_ref().and_then(|p| p.city.as_deref()),
            Some("Trabzon")
        );
    }

    #[test]
    fn missing_plan_name_is_rejected() {
        let reply = r#"{"Days":[{"DayNumber":1,"Activities":[]}]}"#;
        assert!(matches!(
            parse_draft(reply, JsonExtraction::FirstLastBrace),
            Err(GenerationError::Format(_))
        ));
        assert!(parse_draft("{}", JsonExtraction::FirstLastBrace).is_err());
    }

    #[test]
    fn duplicate_day_numbers_are_rejected() {
        let reply = r#"{"PlanName":"X","Days":[{"DayNumber":1},{"DayNumber":1}]}"#;
        match parse_draft(reply, JsonExtraction::FirstLastBrace) {
            Err(GenerationError::Format(msg)) => assert!(msg.contains("day number 1")),
            other => panic!("unexpected: {:?}", other),
        }

        // Gaps are kept as given
        let gap = r#"{"PlanName":"X","Days":[{"DayNumber":1},{"DayNumber":3}]}"#;
        let draft = parse_draft(gap, JsonExtraction::FirstLastBrace).unwrap();
        assert_eq!(draft.days[1].number(1), 3);
    }

    #[test]
    fn missing_day_number_uses_position() {
        let reply = r#"{"PlanName":"X","Days":[{"Activities":[]},{"Activities":[]}]}"#;
        let draft = parse_draft(reply, JsonExtraction::FirstLastBrace).unwrap();
        assert_eq!(draft.days[0].number(0), 1);
        assert_eq!(draft.days[1].number(1), 2);
    }

    #[test]
    fn payload_restores_provider_names() {
        let draft = DraftPlan {
            plan_name: "X".to_string(),
            days: vec![DraftDay {
                day_number: Some(1),
                activities: vec![DraftActivity {
                    title: Some("Walk".to_string()),
                    start_time: Some("09:00".to_string()),
                    ..Default::default()
                }],
            }],
        };
        let payload = draft.to_payload();
        assert_eq!(payload["PlanName"], json!("X"));
        assert_eq!(payload["Days"][0]["DayNumber"], json!(1));
        assert_eq!(payload["Days"][0]["Activities"][0]["StartTime"], json!("09:00"));
    }
}
