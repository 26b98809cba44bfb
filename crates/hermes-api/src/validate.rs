use hermes_types::api::{CreateMessageRequest, Credentials, EditMessageRequest, FieldError};

use crate::error::ApiError;

/// Field-level checks on a decoded request body. All failing rules are
/// collected so the caller sees every problem at once.
pub trait Validate {
    fn check(&self, errors: &mut Vec<FieldError>);

    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        self.check(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::BadInput(errors))
        }
    }
}

fn fail(errors: &mut Vec<FieldError>, field: &str, tag: &str, value: &str) {
    errors.push(FieldError {
        field: field.to_string(),
        tag: tag.to_string(),
        value: value.to_string(),
    });
}

fn required(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.is_empty() {
        fail(errors, field, "required", "");
    }
}

impl Validate for Credentials {
    fn check(&self, errors: &mut Vec<FieldError>) {
        required(errors, "username", &self.username);
        required(errors, "password", &self.password);
    }
}

impl Validate for CreateMessageRequest {
    fn check(&self, errors: &mut Vec<FieldError>) {
        required(errors, "text", &self.text);
    }
}

impl Validate for EditMessageRequest {
    fn check(&self, errors: &mut Vec<FieldError>) {
        match (&self.text, &self.recipient_ids) {
            (None, None) => fail(errors, "text", "required_without", "recipient_ids"),
            (Some(text), _) => required(errors, "text", text),
            (None, Some(_)) => {}
        }
    }
}
