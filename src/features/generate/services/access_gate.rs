use crate::core::config::AccessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Authorized,
    Rejected,
}

/// Checks the shared access code sent with each generation request
pub struct AccessGate {
    access_code: String,
}

impl AccessGate {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            access_code: config.access_code.clone(),
        }
    }

    /// Exact match against the configured code; a missing code is rejected
    pub fn verify(&self, submitted: Option<&str>) -> AccessDecision {
        match submitted {
            Some(code) if code == self.access_code => AccessDecision::Authorized,
            _ => AccessDecision::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(code: &str) -> AccessGate {
        AccessGate::new(&AccessConfig {
            access_code: code.to_string(),
        })
    }

    #[test]
    fn test_matching_code_is_authorized() {
        assert_eq!(gate("darumaya").verify(Some("darumaya")), AccessDecision::Authorized);
    }

    #[test]
    fn test_mismatches_are_rejected() {
        let gate = gate("darumaya");
        assert_eq!(gate.verify(Some("wrong")), AccessDecision::Rejected);
        assert_eq!(gate.verify(Some("Darumaya")), AccessDecision::Rejected);
        assert_eq!(gate.verify(Some(" darumaya")), AccessDecision::Rejected);
        assert_eq!(gate.verify(Some("")), AccessDecision::Rejected);
        assert_eq!(gate.verify(None), AccessDecision::Rejected);
    }
}
