pub mod movie;
pub mod reminder;
pub mod user;

use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors};

/// Start from the derived validation result so manual checks can be appended.
pub(crate) fn collect(result: Result<(), ValidationErrors>) -> ValidationErrors {
    result.err().unwrap_or_default()
}

pub(crate) fn add_error(
    errors: &mut ValidationErrors,
    field: &'static str,
    code: &'static str,
    message: &'static str,
) {
    errors.add(
        field,
        ValidationError::new(code).with_message(Cow::Borrowed(message)),
    );
}
