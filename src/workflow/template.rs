//! `{{placeholder}}` substitution for action parameters.
//!
//! Resolution is fail-open: a token with no known replacement stays in the
//! string verbatim rather than being blanked, so a typo in a workflow config
//! is visible in the output instead of silently corrupting a message.

use crate::types::CallContext;
use serde_json::Value;
use std::collections::HashMap;

/// Wall-clock time formatted for user-facing messages ("2:30 PM").
pub fn clock_time() -> String {
    chrono::Local::now().format("%I:%M %p").to_string()
}

/// Replacement set built once per workflow execution: the fixed context
/// fields plus any literal string parameters from the action config.
pub struct PlaceholderContext {
    replacements: Vec<(String, String)>,
}

impl PlaceholderContext {
    /// `time` is passed in by the engine (one clock read per execution) so
    /// substitution itself stays pure and repeatable.
    pub fn new(ctx: &CallContext, time: &str) -> Self {
        let replacements = vec![
            (
                "caller_name".to_string(),
                ctx.caller_name.clone().unwrap_or_else(|| "Unknown".to_string()),
            ),
            ("caller_number".to_string(), ctx.caller_number.clone()),
            ("intent".to_string(), ctx.intent.to_string()),
            ("transcript".to_string(), ctx.transcript.clone()),
            ("time".to_string(), time.to_string()),
            ("user_id".to_string(), ctx.user_id.clone()),
        ];
        PlaceholderContext { replacements }
    }

    /// Extend with literal string params from the action config. Context
    /// fields keep precedence; a param cannot shadow `caller_name`.
    pub fn with_params(mut self, params: &HashMap<String, Value>) -> Self {
        for (key, value) in params {
            if self.replacements.iter().any(|(k, _)| k == key) {
                continue;
            }
            if let Value::String(s) = value {
                self.replacements.push((key.clone(), s.clone()));
            }
        }
        self
    }

    /// Substitute every known `{{key}}` token. Unknown tokens survive.
    pub fn resolve(&self, template: &str) -> String {
        let mut result = template.to_string();
        for (key, value) in &self.replacements {
            let token = format!("{{{{{key}}}}}");
            if result.contains(&token) {
                result = result.replace(&token, value);
            }
        }
        result
    }

    /// Resolve string values in a JSON parameter tree, recursing through
    /// objects and arrays. Non-string leaves pass through untouched.
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.resolve(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.resolve_value(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Resolve a whole parameter map.
    pub fn resolve_params(&self, params: &HashMap<String, Value>) -> HashMap<String, Value> {
        params
            .iter()
            .map(|(k, v)| (k.clone(), self.resolve_value(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> CallContext {
        CallContext::new("CA123", "user_1", "+15551234567")
            .with_caller_name("John Smith")
            .with_transcript("hey, checking in about saturday")
    }

    #[test]
    fn known_placeholders_resolve() {
        let placeholders = PlaceholderContext::new(&ctx(), "2:30 PM");
        assert_eq!(
            placeholders.resolve("Call from {{caller_name}} at {{time}}"),
            "Call from John Smith at 2:30 PM"
        );
        assert_eq!(
            placeholders.resolve("{{caller_number}} ({{intent}})"),
            "+15551234567 (unknown)"
        );
    }

    #[test]
    fn substitution_is_idempotent() {
        let placeholders = PlaceholderContext::new(&ctx(), "2:30 PM");
        let once = placeholders.resolve("Hello {{caller_name}}, again {{caller_name}}");
        let twice = placeholders.resolve(&once);
        assert_eq!(once, "Hello John Smith, again John Smith");
        assert_eq!(once, twice);
    }

    #[test]
    fn unresolved_placeholders_stay_verbatim() {
        let placeholders = PlaceholderContext::new(&ctx(), "2:30 PM");
        let result = placeholders.resolve("Hi {{caller_name}}, ref {{ticket_id}}");
        assert_eq!(result, "Hi John Smith, ref {{ticket_id}}");
    }

    #[test]
    fn missing_caller_name_reads_unknown() {
        let mut context = ctx();
        context.caller_name = None;
        let placeholders = PlaceholderContext::new(&context, "2:30 PM");
        assert_eq!(
            placeholders.resolve("Call from {{caller_name}}"),
            "Call from Unknown"
        );
    }

    #[test]
    fn literal_params_join_the_replacement_set() {
        let mut params = HashMap::new();
        params.insert("ticket_id".to_string(), json!("T-1042"));
        params.insert("count".to_string(), json!(3));

        let placeholders = PlaceholderContext::new(&ctx(), "2:30 PM").with_params(&params);
        assert_eq!(
            placeholders.resolve("ref {{ticket_id}} / {{count}}"),
            // Non-string params are not substituted.
            "ref T-1042 / {{count}}"
        );
    }

    #[test]
    fn params_resolve_recursively() {
        let mut params = HashMap::new();
        params.insert(
            "payload".to_string(),
            json!({
                "caller": "{{caller_number}}",
                "nested": ["{{intent}}", 7],
            }),
        );
        params.insert("note".to_string(), json!("from {{caller_name}}"));

        let placeholders = PlaceholderContext::new(&ctx(), "2:30 PM");
        let resolved = placeholders.resolve_params(&params);

        assert_eq!(
            resolved["payload"],
            json!({"caller": "+15551234567", "nested": ["unknown", 7]})
        );
        assert_eq!(resolved["note"], json!("from John Smith"));
    }
}
