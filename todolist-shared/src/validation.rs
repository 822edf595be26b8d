/// Request payload validation
///
/// Turns raw JSON request bodies into typed commands before any store is
/// touched. Fields are checked in a fixed order and the first problem found is
/// reported:
///
/// 1. the body must be a non-empty JSON object
/// 2. each required field must be present (in declaration order)
/// 3. each present field must be a JSON string
/// 4. `login` and `title` must not be empty
/// 5. `login` and `title` hold at most 64 characters, `description` at most
///    256 (the column widths of the schema)
///
/// Presence is a key check only: `"description": ""` is accepted.
///
/// # Example
///
/// ```
/// use todolist_shared::validation::{parse_payload, validate_signup, FieldError};
///
/// let payload = parse_payload(br#"{"login": "alice"}"#).unwrap();
/// assert_eq!(validate_signup(&payload), Err(FieldError::MissingField("password")));
/// ```

use crate::models::task::DEADLINE_FORMAT;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

/// Longest accepted `login`
pub const LOGIN_MAX_LENGTH: u64 = 64;

/// Longest accepted task `title`
pub const TITLE_MAX_LENGTH: u64 = 64;

/// Longest accepted task `description`
pub const DESCRIPTION_MAX_LENGTH: u64 = 256;

/// Decoded JSON object of a request body
pub type Payload = Map<String, Value>;

/// Rejection produced by the validation pipeline
///
/// The `Display` text is the message sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// Body absent, not JSON, not an object, or an empty object
    #[error("missing json request")]
    MissingPayload,

    /// Required key absent
    #[error("the {0} field is missing")]
    MissingField(&'static str),

    /// Key present but its value is not a string
    #[error("the {0} field must be a string")]
    NotAString(&'static str),

    /// Key present but its value is an empty string
    #[error("the {0} field must not be empty")]
    Empty(&'static str),

    /// String longer than its column allows
    #[error("the {0} field must be at most {1} characters")]
    TooLong(&'static str, u64),

    /// Deadline text not in `YYYY-MM-DD HH:MM` form or not a real date/time
    #[error("wrong format deadline (yyyy-mm-dd hh:mm)")]
    DeadlineFormat,
}

/// Validated signup request
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct SignupCommand {
    /// Requested login
    #[validate(length(min = 1, max = 64))]
    pub login: String,

    /// Plaintext password
    pub password: String,
}

/// Validated task creation request
///
/// The deadline is kept as text; the service parses it with
/// [`parse_deadline`].
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct CreateTaskCommand {
    /// Task title
    #[validate(length(min = 1, max = 64))]
    pub title: String,

    /// Task description, may be empty
    #[validate(length(max = 256))]
    pub description: String,

    /// Deadline exactly as supplied
    pub deadline: String,
}

/// Decodes a request body into a non-empty JSON object
pub fn parse_payload(body: &[u8]) -> Result<Payload, FieldError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok(map),
        _ => Err(FieldError::MissingPayload),
    }
}

/// Validates a signup payload: `login`, then `password`
pub fn validate_signup(payload: &Payload) -> Result<SignupCommand, FieldError> {
    let command = SignupCommand {
        login: required_string(payload, "login")?,
        password: required_string(payload, "password")?,
    };

    if let Err(errors) = command.validate() {
        return Err(length_error(&errors, "login", &command.login, LOGIN_MAX_LENGTH)
            .unwrap_or(FieldError::Empty("login")));
    }
    Ok(command)
}

/// Validates a task payload: `title`, then `description`, then `deadline`
///
/// Only presence and type of `deadline` are checked here.
pub fn validate_task_create(payload: &Payload) -> Result<CreateTaskCommand, FieldError> {
    let command = CreateTaskCommand {
        title: required_string(payload, "title")?,
        description: required_string(payload, "description")?,
        deadline: required_string(payload, "deadline")?,
    };

    if let Err(errors) = command.validate() {
        let first = length_error(&errors, "title", &command.title, TITLE_MAX_LENGTH).or_else(|| {
            length_error(
                &errors,
                "description",
                &command.description,
                DESCRIPTION_MAX_LENGTH,
            )
        });
        return Err(first.unwrap_or(FieldError::Empty("title")));
    }
    Ok(command)
}

/// Parses a deadline in the exact form `YYYY-MM-DD HH:MM`
///
/// Shorter fields (`2020-3-13 9:00`), seconds, other separators and
/// impossible dates are all rejected.
pub fn parse_deadline(text: &str) -> Result<NaiveDateTime, FieldError> {
    let bytes = text.as_bytes();
    let well_shaped = bytes.len() == 16
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 => *b == b':',
            _ => b.is_ascii_digit(),
        });

    if !well_shaped {
        return Err(FieldError::DeadlineFormat);
    }

    NaiveDateTime::parse_from_str(text, DEADLINE_FORMAT).map_err(|_| FieldError::DeadlineFormat)
}

/// Names the length rule `field` broke, if any
fn length_error(
    errors: &ValidationErrors,
    field: &'static str,
    value: &str,
    max: u64,
) -> Option<FieldError> {
    if !errors.field_errors().contains_key(field) {
        return None;
    }

    if value.is_empty() {
        Some(FieldError::Empty(field))
    } else {
        Some(FieldError::TooLong(field, max))
    }
}

fn required_string(payload: &Payload, field: &'static str) -> Result<String, FieldError> {
    match payload.get(field) {
        None => Err(FieldError::MissingField(field)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(FieldError::NotAString(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_parse_payload_rejects_empty_input() {
        let bodies: [&[u8]; 6] = [b"", b"{}", b"[]", b"null", b"\"text\"", b"{not json"];
        for body in bodies {
            assert_eq!(parse_payload(body), Err(FieldError::MissingPayload));
        }
        assert!(parse_payload(br#"{"login":"a"}"#).is_ok());
    }

    #[test]
    fn test_signup_reports_first_missing_field() {
        let err = validate_signup(&payload(json!({"password": "pass"}))).unwrap_err();
        assert_eq!(err.to_string(), "the login field is missing");

        let err = validate_signup(&payload(json!({"login": "created_user"}))).unwrap_err();
        assert_eq!(err.to_string(), "the password field is missing");

        let err = validate_signup(&payload(json!({"other": 1}))).unwrap_err();
        assert_eq!(err, FieldError::MissingField("login"));
    }

    #[test]
    fn test_signup_valid() {
        let command =
            validate_signup(&payload(json!({"login": "alice", "password": "pass"}))).unwrap();
        assert_eq!(
            command,
            SignupCommand {
                login: "alice".to_string(),
                password: "pass".to_string(),
            }
        );
    }

    #[test]
    fn test_signup_rejects_non_string_and_empty_login() {
        let err = validate_signup(&payload(json!({"login": 5, "password": "p"}))).unwrap_err();
        assert_eq!(err.to_string(), "the login field must be a string");

        let err = validate_signup(&payload(json!({"login": "", "password": "p"}))).unwrap_err();
        assert_eq!(err.to_string(), "the login field must not be empty");
    }

    #[test]
    fn test_task_create_field_order() {
        let cases = [
            (json!({"description": "d", "deadline": "x"}), "the title field is missing"),
            (json!({"title": "t"}), "the description field is missing"),
            (json!({"title": "t", "description": "d"}), "the deadline field is missing"),
            (json!({"deadline": "x"}), "the title field is missing"),
        ];

        for (body, expected) in cases {
            let err = validate_task_create(&payload(body)).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_task_create_accepts_empty_description() {
        let command = validate_task_create(&payload(json!({
            "title": "t",
            "description": "",
            "deadline": "13.03.2020"
        })))
        .unwrap();

        assert_eq!(command.description, "");
        assert_eq!(command.deadline, "13.03.2020");
    }

    #[test]
    fn test_task_create_rejects_empty_title() {
        let err = validate_task_create(&payload(json!({
            "title": "",
            "description": "d",
            "deadline": "2020-03-13 10:00"
        })))
        .unwrap_err();
        assert_eq!(err, FieldError::Empty("title"));
    }

    #[test]
    fn test_length_limits() {
        let login = "a".repeat(64);
        let command =
            validate_signup(&payload(json!({"login": login, "password": "p"}))).unwrap();
        assert_eq!(command.login.chars().count(), 64);

        let err = validate_signup(&payload(json!({"login": "a".repeat(65), "password": "p"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "the login field must be at most 64 characters");

        // characters, not bytes
        let title = "é".repeat(64);
        let description = "d".repeat(256);
        assert!(validate_task_create(&payload(json!({
            "title": title,
            "description": description,
            "deadline": "2020-03-13 10:00"
        })))
        .is_ok());

        let err = validate_task_create(&payload(json!({
            "title": "t".repeat(65),
            "description": "d".repeat(257),
            "deadline": "2020-03-13 10:00"
        })))
        .unwrap_err();
        assert_eq!(err, FieldError::TooLong("title", 64));

        let err = validate_task_create(&payload(json!({
            "title": "t",
            "description": "d".repeat(257),
            "deadline": "2020-03-13 10:00"
        })))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "the description field must be at most 256 characters"
        );
    }

    #[test]
    fn test_parse_deadline_valid() {
        let deadline = parse_deadline("2020-03-13 10:00").unwrap();
        assert_eq!(deadline.format(DEADLINE_FORMAT).to_string(), "2020-03-13 10:00");
    }

    #[test]
    fn test_parse_deadline_rejects_other_formats() {
        for text in [
            "13.03.2020",
            "2020-3-13 10:00",
            "2020-03-13 9:00",
            "2020-03-13T10:00",
            "2020-03-13 10:00:00",
            "2020-02-30 10:00",
            "2020-03-13 24:00",
            "20200-03-13 10:00",
            "",
        ] {
            let err = parse_deadline(text).unwrap_err();
            assert_eq!(err.to_string(), "wrong format deadline (yyyy-mm-dd hh:mm)", "{}", text);
        }
    }
}
