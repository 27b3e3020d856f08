use crate::service::{
    PostInput, UserInput,
    error::{ServiceError, ValidationMessage},
};
use bulletin_common::model::{
    auth::PASSWORD_MIN_LEN,
    post::POST_TEXT_MIN_LEN,
    user::Email,
};

pub const INVALID_EMAIL: &str = "E-Mail is invalid.";
pub const PASSWORD_TOO_SHORT: &str = "Password too short!";
pub const INVALID_TITLE: &str = "Title is invalid.";
pub const INVALID_CONTENT: &str = "Content is invalid.";

/// Collects every violation before failing.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
struct Violations(Vec<ValidationMessage>);

impl Violations {
    fn check(&mut self, valid: bool, message: &'static str) {
        if !valid {
            self.0.push(ValidationMessage { message });
        }
    }

    fn finish(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.0))
        }
    }
}

fn is_long_enough(text: &str, min_len: usize) -> bool {
    !text.is_empty() && text.chars().count() >= min_len
}

pub fn validate_user(input: &UserInput) -> Result<Email, ServiceError> {
    let email = Email::new(&input.email);

    let mut violations = Violations::default();
    violations.check(email.is_ok(), INVALID_EMAIL);
    violations.check(
        is_long_enough(&input.password, PASSWORD_MIN_LEN),
        PASSWORD_TOO_SHORT,
    );
    violations.finish()?;

    email.map_err(|_| {
        ServiceError::Validation(vec![ValidationMessage {
            message: INVALID_EMAIL,
        }])
    })
}

pub fn validate_post(input: &PostInput) -> Result<(), ServiceError> {
    let mut violations = Violations::default();
    violations.check(
        is_long_enough(&input.title, POST_TEXT_MIN_LEN),
        INVALID_TITLE,
    );
    violations.check(
        is_long_enough(&input.content, POST_TEXT_MIN_LEN),
        INVALID_CONTENT,
    );
    violations.finish()
}
