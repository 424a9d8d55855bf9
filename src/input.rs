//! Inbound request decoding and domain validation
//!
//! Interactive callers bound their sliders, but batch and embedded callers do
//! not, so every request is checked against the declared domains before it
//! reaches the normalizer.

use serde::Deserialize;
use serde_json::Value;

use crate::error::MalformedInputError;
use crate::types::RawInputs;

/// Upper bound for `time_alone` (hours per day)
pub const MAX_TIME_ALONE: f64 = 11.0;
pub const MAX_SOCIAL_EVENT_ATTENDANCE: u32 = 10;
pub const MAX_GOING_OUTSIDE: u32 = 7;
pub const MAX_FRIENDS_CIRCLE_SIZE: u32 = 15;
pub const MAX_POST_FREQUENCY: u32 = 10;

impl RawInputs {
    /// Check every field against its declared domain
    pub fn validate(&self) -> Result<(), MalformedInputError> {
        if !self.time_alone.is_finite() {
            return Err(MalformedInputError::new(
                "time_alone",
                format!("{} is not a finite number", self.time_alone),
            ));
        }
        if !(0.0..=MAX_TIME_ALONE).contains(&self.time_alone) {
            return Err(MalformedInputError::new(
                "time_alone",
                format!("{} is outside [0, {MAX_TIME_ALONE}]", self.time_alone),
            ));
        }

        check_count(
            "social_event_attendance",
            self.social_event_attendance,
            MAX_SOCIAL_EVENT_ATTENDANCE,
        )?;
        check_count("going_outside", self.going_outside, MAX_GOING_OUTSIDE)?;
        check_count(
            "friends_circle_size",
            self.friends_circle_size,
            MAX_FRIENDS_CIRCLE_SIZE,
        )?;
        check_count("post_frequency", self.post_frequency, MAX_POST_FREQUENCY)?;

        Ok(())
    }

    /// Decode and validate a JSON request object.
    ///
    /// Absent, null or mistyped fields are reported by name. Counts accept
    /// JSON numbers only when they are whole.
    pub fn from_json(json: &str) -> Result<Self, MalformedInputError> {
        let request: InboundRequest = serde_json::from_str(json)
            .map_err(|e| MalformedInputError::new("request", e.to_string()))?;
        request.into_inputs()
    }

    /// Same as [`RawInputs::from_json`] for an already-parsed value
    pub fn from_value(value: Value) -> Result<Self, MalformedInputError> {
        let request: InboundRequest = serde_json::from_value(value)
            .map_err(|e| MalformedInputError::new("request", e.to_string()))?;
        request.into_inputs()
    }
}

fn check_count(field: &'static str, value: u32, max: u32) -> Result<(), MalformedInputError> {
    if value > max {
        return Err(MalformedInputError::new(
            field,
            format!("{value} is outside [0, {max}]"),
        ));
    }
    Ok(())
}

/// Loosely typed request shape; every field is checked by hand so the error
/// can name it.
#[derive(Debug, Deserialize)]
struct InboundRequest {
    time_alone: Option<Value>,
    social_event_attendance: Option<Value>,
    going_outside: Option<Value>,
    friends_circle_size: Option<Value>,
    post_frequency: Option<Value>,
    stage_fear: Option<Value>,
    drained_after_socializing: Option<Value>,
}

impl InboundRequest {
    fn into_inputs(self) -> Result<RawInputs, MalformedInputError> {
        let inputs = RawInputs {
            time_alone: number("time_alone", self.time_alone)?,
            social_event_attendance: count("social_event_attendance", self.social_event_attendance)?,
            going_outside: count("going_outside", self.going_outside)?,
            friends_circle_size: count("friends_circle_size", self.friends_circle_size)?,
            post_frequency: count("post_frequency", self.post_frequency)?,
            stage_fear: boolean("stage_fear", self.stage_fear)?,
            drained_after_socializing: boolean(
                "drained_after_socializing",
                self.drained_after_socializing,
            )?,
        };
        inputs.validate()?;
        Ok(inputs)
    }
}

fn required(field: &'static str, value: Option<Value>) -> Result<Value, MalformedInputError> {
    match value {
        None | Some(Value::Null) => Err(MalformedInputError::new(field, "required field is absent")),
        Some(v) => Ok(v),
    }
}

fn number(field: &'static str, value: Option<Value>) -> Result<f64, MalformedInputError> {
    let value = required(field, value)?;
    value
        .as_f64()
        .ok_or_else(|| MalformedInputError::new(field, format!("expected a number, got {value}")))
}

fn count(field: &'static str, value: Option<Value>) -> Result<u32, MalformedInputError> {
    let n = number(field, value)?;
    if n.fract() != 0.0 {
        return Err(MalformedInputError::new(
            field,
            format!("{n} is not a whole count"),
        ));
    }
    if n < 0.0 || n > f64::from(u32::MAX) {
        return Err(MalformedInputError::new(
            field,
            format!("{n} is outside the count range"),
        ));
    }
    Ok(n as u32)
}

fn boolean(field: &'static str, value: Option<Value>) -> Result<bool, MalformedInputError> {
    let value = required(field, value)?;
    value
        .as_bool()
        .ok_or_else(|| MalformedInputError::new(field, format!("expected a boolean, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_inputs() -> RawInputs {
        RawInputs {
            time_alone: 5.0,
            social_event_attendance: 4,
            going_outside: 4,
            friends_circle_size: 6,
            post_frequency: 3,
            stage_fear: false,
            drained_after_socializing: false,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(valid_inputs().validate().is_ok());
    }

    #[test]
    fn test_domain_upper_bounds_are_inclusive() {
        let inputs = RawInputs {
            time_alone: 11.0,
            social_event_attendance: 10,
            going_outside: 7,
            friends_circle_size: 15,
            post_frequency: 10,
            ..valid_inputs()
        };
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_out_of_domain_fields_are_named() {
        let cases = [
            (RawInputs { time_alone: 11.5, ..valid_inputs() }, "time_alone"),
            (RawInputs { time_alone: -0.5, ..valid_inputs() }, "time_alone"),
            (RawInputs { time_alone: f64::NAN, ..valid_inputs() }, "time_alone"),
            (
                RawInputs { social_event_attendance: 11, ..valid_inputs() },
                "social_event_attendance",
            ),
            (RawInputs { going_outside: 8, ..valid_inputs() }, "going_outside"),
            (
                RawInputs { friends_circle_size: 16, ..valid_inputs() },
                "friends_circle_size",
            ),
            (RawInputs { post_frequency: 11, ..valid_inputs() }, "post_frequency"),
        ];

        for (inputs, field) in cases {
            let err = inputs.validate().unwrap_err();
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "time_alone": 8.5,
            "social_event_attendance": 1,
            "going_outside": 2.0,
            "friends_circle_size": 3,
            "post_frequency": 0,
            "stage_fear": true,
            "drained_after_socializing": true
        }"#;

        let inputs = RawInputs::from_json(json).unwrap();
        assert_eq!(
            inputs,
            RawInputs {
                time_alone: 8.5,
                social_event_attendance: 1,
                going_outside: 2,
                friends_circle_size: 3,
                post_frequency: 0,
                stage_fear: true,
                drained_after_socializing: true,
            }
        );
    }

    #[test]
    fn test_from_json_missing_field() {
        let json = r#"{
            "time_alone": 8.5,
            "social_event_attendance": 1,
            "going_outside": 2,
            "post_frequency": 0,
            "stage_fear": true,
            "drained_after_socializing": null
        }"#;

        let err = RawInputs::from_json(json).unwrap_err();
        assert_eq!(err.field, "friends_circle_size");
    }

    #[test]
    fn test_from_json_rejects_fractional_count() {
        let json = r#"{
            "time_alone": 1,
            "social_event_attendance": 2.5,
            "going_outside": 2,
            "friends_circle_size": 3,
            "post_frequency": 0,
            "stage_fear": false,
            "drained_after_socializing": false
        }"#;

        let err = RawInputs::from_json(json).unwrap_err();
        assert_eq!(err.field, "social_event_attendance");
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        let json = r#"{
            "time_alone": "lots",
            "social_event_attendance": 2,
            "going_outside": 2,
            "friends_circle_size": 3,
            "post_frequency": 0,
            "stage_fear": false,
            "drained_after_socializing": false
        }"#;
        assert_eq!(RawInputs::from_json(json).unwrap_err().field, "time_alone");

        let json = r#"{
            "time_alone": 2,
            "social_event_attendance": 2,
            "going_outside": 2,
            "friends_circle_size": 3,
            "post_frequency": 0,
            "stage_fear": "yes",
            "drained_after_socializing": false
        }"#;
        assert_eq!(RawInputs::from_json(json).unwrap_err().field, "stage_fear");
    }

    #[test]
    fn test_from_json_validates_domain() {
        let json = r#"{
            "time_alone": 2,
            "social_event_attendance": 2,
            "going_outside": 9,
            "friends_circle_size": 3,
            "post_frequency": 0,
            "stage_fear": false,
            "drained_after_socializing": false
        }"#;
        assert_eq!(RawInputs::from_json(json).unwrap_err().field, "going_outside");
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = RawInputs::from_json(r#""not an object""#).unwrap_err();
        assert_eq!(err.field, "request");
    }
}
