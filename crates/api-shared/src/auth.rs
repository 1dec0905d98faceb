/// Errors from API key validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing x-api-key header")]
    MissingKey,
    #[error("invalid API key")]
    InvalidKey,
}

/// Validates the provided API key against the key configured at startup.
///
/// When no key is configured the API is open and every request passes.
pub fn validate_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match provided {
        None => Err(AuthError::MissingKey),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::InvalidKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_when_no_key_configured() {
        assert_eq!(validate_api_key(None, None), Ok(()));
        assert_eq!(validate_api_key(None, Some("anything")), Ok(()));
    }

    #[test]
    fn requires_matching_key_when_configured() {
        assert_eq!(validate_api_key(Some("s3cret"), Some("s3cret")), Ok(()));
        assert_eq!(
            validate_api_key(Some("s3cret"), None),
            Err(AuthError::MissingKey)
        );
        assert_eq!(
            validate_api_key(Some("s3cret"), Some("guess")),
            Err(AuthError::InvalidKey)
        );
    }
}
