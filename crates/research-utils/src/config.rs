//! Environment configuration helpers

/// Read an environment variable, falling back to a default
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read an optional environment variable, treating empty values as unset
pub fn optional_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_default() {
        // SAFETY: test-local env mutation, single-threaded test context
        unsafe {
            std::env::remove_var("RESEARCH_TEST_MISSING");
        }
        assert_eq!(env_or("RESEARCH_TEST_MISSING", "fallback"), "fallback");
    }

    #[test]
    fn test_optional_env_empty_is_none() {
        // SAFETY: test-local env mutation, single-threaded test context
        unsafe {
            std::env::set_var("RESEARCH_TEST_EMPTY", "  ");
        }
        assert!(optional_env("RESEARCH_TEST_EMPTY").is_none());
    }
}
