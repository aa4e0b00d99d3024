//! Shared validation helpers.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Like [`validate_range`], but 0 is accepted and means "disabled".
pub(crate) fn validate_optional_range(
    errors: &mut Vec<String>,
    name: &str,
    value: u64,
    min: u64,
    max: u64,
) {
    if value != 0 {
        validate_range(errors, name, value, min, max);
    }
}

/// Push an error unless `value` is an absolute broker destination.
pub(crate) fn validate_destination(errors: &mut Vec<String>, name: &str, value: &str) {
    if !value.starts_with('/') || value.trim().len() < 2 {
        errors.push(format!("{name} = {value:?} must be an absolute destination"));
    } else if value.ends_with('/') {
        errors.push(format!("{name} = {value:?} must not end with '/'"));
    }
}
