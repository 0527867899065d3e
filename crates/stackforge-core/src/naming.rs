//! Resource-name validation.

use regex::Regex;

use crate::error::{SynthError, SynthResult};

pub(crate) fn validate_name(
    kind: &'static str,
    pattern: &Regex,
    rule: &'static str,
    name: &str,
) -> SynthResult<()> {
    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(SynthError::InvalidResourceName {
            kind,
            name: name.to_string(),
            rule,
        })
    }
}
