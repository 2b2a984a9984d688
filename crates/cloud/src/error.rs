// Licensed under the Apache License, Version 2.0 (see LICENSE).

use thiserror::Error;

/// Errors a `CloudClient` call can surface, classified at the boundary so
/// that callers match on a variant rather than parsing a message (§7:
/// "classification uses only the provider's code string; messages are
/// never parsed").
#[derive(Debug, Clone, Error)]
pub enum CloudError {
    /// The provider refused because something still references the target.
    #[error("{0}")]
    DependencyViolation(String),
    /// The provider reports the target is already gone.
    #[error("{0}")]
    NotFound(String),
    /// Anything else: surfaced to the caller verbatim.
    #[error("{0}")]
    Other(String),
}

impl CloudError {
    /// Classifies a provider error code the way `IsDependencyViolation` and
    /// the not-found checks in the original tool do: by exact code match,
    /// never by inspecting the message.
    pub fn from_code(code: &str, message: impl Into<String>) -> CloudError {
        let message = message.into();
        match code {
            "DependencyViolation" | "VolumeInUse" | "InvalidIPAddress.InUse" => {
                CloudError::DependencyViolation(message)
            }
            "InvalidVolume.NotFound" | "InvalidInternetGatewayID.NotFound" => {
                CloudError::NotFound(message)
            }
            _ => CloudError::Other(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CloudError;

    #[test]
    fn classifies_known_dependency_violation_codes() {
        for code in ["DependencyViolation", "VolumeInUse", "InvalidIPAddress.InUse"] {
            assert!(matches!(
                CloudError::from_code(code, "x"),
                CloudError::DependencyViolation(_)
            ));
        }
    }

    #[test]
    fn classifies_known_not_found_codes() {
        for code in ["InvalidVolume.NotFound", "InvalidInternetGatewayID.NotFound"] {
            assert!(matches!(CloudError::from_code(code, "x"), CloudError::NotFound(_)));
        }
    }

    #[test]
    fn unrecognized_code_is_other() {
        assert!(matches!(
            CloudError::from_code("Throttling", "x"),
            CloudError::Other(_)
        ));
    }
}
