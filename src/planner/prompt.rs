use super::request::{labels, TripSelection};

const DEFAULT_THEMES: &str = "general sightseeing";
const DEFAULT_BUDGET: &str = "medium";
const DEFAULT_INTENSITY: &str = "relaxed";
const DEFAULT_TRANSPORT: &str = "car";

fn joined_or(values: Vec<&str>, default: &str) -> String {
    if values.is_empty() {
        default.to_string()
    } else {
        values.join(", ")
    }
}

/// Renders the itinerary instruction for the generation provider.
///
/// Pure function of its inputs; `country` only fills the example schema.
pub fn build_route_plan_prompt(selection: &TripSelection, country: &str) -> String {
    let region = &selection.region;
    let days = selection.days;
    let themes = joined_or(labels(&selection.themes), DEFAULT_THEMES);
    let budgets = joined_or(labels(&selection.budgets), DEFAULT_BUDGET);
    let intensities = joined_or(labels(&selection.intensities), DEFAULT_INTENSITY);
    let transports = joined_or(labels(&selection.transports), DEFAULT_TRANSPORT);

    format!(
        r#"Generate a detailed travel route plan in JSON format for {region}.

Trip Parameters:
- Region: {region}
- Duration: {days} days
- Themes: {themes} (can mix different themes across activities)
- Budget Level: {budgets}
- Activity Intensity: {intensities} (can vary throughout the trip)
- Transportation Modes: {transports} (can use different modes for different activities)

IMPORTANT: When multiple themes are provided, create a diverse itinerary that includes activities from all specified themes.
For example, if themes are 'nature, beach, history', include some nature activities, some beach time, and some historical sites.

Please respond ONLY with a valid JSON object in this EXACT format:
{{
  "PlanName": "Memorable trip name for {region}",
  "Days": [
    {{
      "DayNumber": 1,
      "Activities": [
        {{
          "Title": "Activity title",
          "Description": "Detailed description of the activity",
          "Reason": "Why this activity is recommended for this trip (mention which theme it addresses)",
          "StartTime": "09:00",
          "EndTime": "11:00",
          "Place": {{
            "Name": "Name of the place/location",
            "Description": "Description of the place",
            "City": "{region}",
            "Country": "{country}"
          }}
        }}
      ]
    }}
  ]
}}

REQUIREMENTS:
- Generate exactly {days} days
- Include 3-4 activities per day based on the specified intensity level(s)
- DIVERSIFY activities across all selected themes: {themes}
- Consider the budget level(s): {budgets}
- Plan transportation using available mode(s): {transports}
- Provide realistic time slots (HH:mm format)
- Include specific place information for each activity
- Make sure ALL JSON is valid and properly formatted
- Do NOT include any markdown formatting or code blocks, ONLY the JSON object
- IMPORTANT: Balance activities across different themes throughout the days"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::{BudgetLevel, ThemeType, TransportMode};

    fn selection() -> TripSelection {
        TripSelection {
            region: "Muğla".to_string(),
            days: 4,
            themes: vec![ThemeType::Nature, ThemeType::Beach, ThemeType::History],
            budgets: vec![BudgetLevel::High],
            intensities: vec![],
            transports: vec![TransportMode::PublicTransport, TransportMode::Walk],
        }
    }

    #[test]
    fn states_parameters_and_requirements() {
        let prompt = build_route_plan_prompt(&selection(), "Turkey");
        assert!(prompt.contains("- Duration: 4 days"));
        assert!(prompt.contains("- Themes: nature, beach, history"));
        assert!(prompt.contains("- Transportation Modes: public_transport, walk"));
        assert!(prompt.contains("- Generate exactly 4 days"));
        assert!(prompt.contains("3-4 activities per day"));
        assert!(prompt.contains("\"Country\": \"Turkey\""));
        assert!(prompt.contains("Do NOT include any markdown formatting"));
    }

    #[test]
    fn empty_dimensions_use_defaults() {
        let empty = TripSelection {
            themes: vec![],
            budgets: vec![],
            transports: vec![],
            ..selection()
        };
        let prompt = build_route_plan_prompt(&empty, "Turkey");
        assert!(prompt.contains("- Themes: general sightseeing"));
        assert!(prompt.contains("- Budget Level: medium"));
        assert!(prompt.contains("- Activity Intensity: relaxed"));
        assert!(prompt.contains("- Transportation Modes: car"));
    }

    #[test]
    fn same_input_same_prompt() {
        assert_eq!(
            build_route_plan_prompt(&selection(), "Turkey"),
            build_route_plan_prompt(&selection(), "Turkey")
        );
    }

    #[test]
    fn example_schema_is_valid_json() {
        let prompt = build_route_plan_prompt(&selection(), "Turkey");
        let start = prompt.find('{').unwrap();
        let end = prompt.rfind('}').unwrap();
        let schema: serde_json::Value = serde_json::from_str(&prompt[start..=end]).unwrap();
        assert_eq!(schema["Days"][0]["Activities"][0]["StartTime"], "09:00");
    }
}
