//! Calendar executors: availability check and event creation.

use super::{int_param, str_param, ActionError, ActionExecutor, ActionOutput, ActionParams};
use crate::gateway::{CalendarEvent, CalendarService};
use crate::types::CallContext;
use crate::workflow::template::{clock_time, PlaceholderContext};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_DURATION_MINUTES: i64 = 30;

/// Parse a start time parameter: RFC3339, `now`, or a relative offset like
/// `+30 minutes` / `+2 hours`.
fn parse_start_time(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ActionError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Some(rest) = trimmed.strip_prefix('+') {
        let mut parts = rest.split_whitespace();
        let amount: i64 = parts
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ActionError::Failed(format!("bad relative time '{raw}'")))?;
        let unit = parts.next().unwrap_or("minutes");
        let offset = match unit {
            "minute" | "minutes" => Duration::minutes(amount),
            "hour" | "hours" => Duration::hours(amount),
            "day" | "days" => Duration::days(amount),
            other => {
                return Err(ActionError::Failed(format!(
                    "unsupported time unit '{other}' in '{raw}'"
                )))
            }
        };
        return Ok(now + offset);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ActionError::Failed(format!("bad start_time '{raw}': {e}")))
}

/// Check whether the user is free around the requested slot.
///
/// Params: `start_time` (default "now"), `duration_minutes` (default 30).
pub struct CheckCalendarExecutor {
    calendar: Arc<dyn CalendarService>,
}

impl CheckCalendarExecutor {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        CheckCalendarExecutor { calendar }
    }
}

#[async_trait]
impl ActionExecutor for CheckCalendarExecutor {
    fn name(&self) -> &'static str {
        "check_calendar"
    }

    async fn execute(
        &self,
        _ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let start = parse_start_time(str_param(params, "start_time").unwrap_or("now"), Utc::now())?;
        let duration = int_param(params, "duration_minutes").unwrap_or(DEFAULT_DURATION_MINUTES);

        let available = self.calendar.is_free(start, duration).await?;
        log::info!("calendar check at {start}: available={available}");

        Ok(ActionOutput::with_data(
            if available {
                "Slot is available"
            } else {
                "Slot is busy"
            },
            json!({ "available": available, "start": start.to_rfc3339(), "duration_minutes": duration }),
        ))
    }
}

/// Create a calendar event for the call.
///
/// Params: `title` (default "Call with {{caller_name}}"), `start_time`,
/// `duration_minutes`, `description`, `attendees` (list of addresses).
pub struct CreateEventExecutor {
    calendar: Arc<dyn CalendarService>,
}

impl CreateEventExecutor {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        CreateEventExecutor { calendar }
    }
}

#[async_trait]
impl ActionExecutor for CreateEventExecutor {
    fn name(&self) -> &'static str {
        "create_calendar_event"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let placeholders = PlaceholderContext::new(ctx, &clock_time());

        let title = match str_param(params, "title") {
            Some(title) => title.to_string(),
            None => placeholders.resolve("Call with {{caller_name}}"),
        };
        let start = parse_start_time(str_param(params, "start_time").unwrap_or("now"), Utc::now())?;
        let duration = int_param(params, "duration_minutes").unwrap_or(DEFAULT_DURATION_MINUTES);
        let description = str_param(params, "description").unwrap_or_default().to_string();
        let attendees = params
            .get("attendees")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let event = CalendarEvent {
            title: title.clone(),
            description,
            start,
            duration_minutes: duration,
            attendees,
        };

        let event_id = self.calendar.create_event(&event).await?;
        log::info!("created calendar event '{title}' ({event_id})");

        Ok(ActionOutput::with_data(
            format!("Event created: {title}"),
            json!({ "event_id": event_id, "title": title, "start": start.to_rfc3339() }),
        ))
    }
}
