//! Shared-secret validation for registry mutations.
//!
//! Registration, renewal, and deregistration are gated by a single shared
//! secret supplied at construction. A configured secret shorter than 16
//! bytes disables forwarding entirely rather than running with a weak
//! credential.

/// Minimum configured secret length for the forwarder to be enabled.
pub const MIN_SECRET_LENGTH: usize = 16;

/// Constant-time validator for the configured shared secret.
#[derive(Clone)]
pub struct SecretValidator {
    secret: Vec<u8>,
}

// Manual impl: the secret value must not end up in logs.
impl std::fmt::Debug for SecretValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretValidator").field("enabled", &self.is_enabled()).finish()
    }
}

impl SecretValidator {
    /// Creates a validator for the configured shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into().into_bytes() }
    }

    /// Whether forwarding is enabled at all.
    ///
    /// A secret shorter than [`MIN_SECRET_LENGTH`] is the disablement
    /// signal; there is no separate enable flag.
    pub fn is_enabled(&self) -> bool {
        self.secret.len() >= MIN_SECRET_LENGTH
    }

    /// Checks a caller-supplied credential against the configured secret.
    ///
    /// Returns `false` when forwarding is disabled. The length comparison
    /// may exit early (length is not secret-sensitive), but the byte
    /// comparison XOR-accumulates over the full string and never
    /// short-circuits on the first mismatch, to avoid leaking the secret's
    /// value through timing.
    pub fn validate(&self, candidate: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let candidate = candidate.as_bytes();
        if candidate.len() != self.secret.len() {
            return false;
        }

        let mut diff = 0u8;
        for (a, b) in candidate.iter().zip(self.secret.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}
