//! User-agent heuristics and the internal-service bypass.
//!
//! # Order of evaluation
//! 1. Internal bypass: request arrived on the internal path AND carries the
//!    pre-shared secret. Both must hold.
//! 2. Empty or missing user-agent is always a bot.
//! 3. Configured signatures in order; first match wins and its verdict applies.
//! 4. No match is human.

use regex::{Regex, RegexBuilder};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::config::{BotConfig, SignatureVerdict};
use crate::security::identity::ClientIdentity;

/// Header carrying the internal shared secret.
pub const X_INTERNAL_SECRET: &str = "x-internal-secret";

/// Signature name reported for empty user-agents.
pub const EMPTY_USER_AGENT: &str = "<empty>";

/// Classification of a request's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotClass {
    Human,
    /// Matched the named signature.
    Bot { signature: String },
    /// Authenticated internal caller.
    Internal,
}

/// A compiled user-agent rule.
#[derive(Debug, Clone)]
pub struct BotSignature {
    pattern: Regex,
    verdict: SignatureVerdict,
}

impl BotSignature {
    pub fn new(pattern: &str, verdict: SignatureVerdict) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern, verdict })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Classifies automated traffic.
pub struct BotFilter {
    signatures: Vec<BotSignature>,
    internal_secret: Option<SecretString>,
}

impl BotFilter {
    pub fn new(signatures: Vec<BotSignature>, internal_secret: Option<SecretString>) -> Self {
        Self {
            signatures,
            internal_secret,
        }
    }

    pub fn from_config(config: &BotConfig, internal_secret: Option<&str>) -> Result<Self, regex::Error> {
        let signatures = config
            .signatures
            .iter()
            .map(|s| BotSignature::new(&s.pattern, s.verdict))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            signatures,
            internal_secret.map(|s| SecretString::from(s.to_string())),
        ))
    }

    pub fn bypass_enabled(&self) -> bool {
        self.internal_secret.is_some()
    }

    /// Both conditions must hold: internal path and matching secret.
    pub fn is_internal(&self, bypass_token: Option<&str>, is_internal_path: bool) -> bool {
        if !is_internal_path {
            return false;
        }
        match (&self.internal_secret, bypass_token) {
            (Some(secret), Some(token)) => {
                bool::from(secret.expose_secret().as_bytes().ct_eq(token.as_bytes()))
            }
            _ => false,
        }
    }

    pub fn classify(
        &self,
        user_agent: Option<&str>,
        identity: &ClientIdentity,
        bypass_token: Option<&str>,
        is_internal_path: bool,
    ) -> BotClass {
        if self.is_internal(bypass_token, is_internal_path) {
            tracing::trace!(identity = %identity, "Internal caller bypassed bot filter");
            return BotClass::Internal;
        }
        self.match_user_agent(user_agent.unwrap_or_default())
    }

    /// Signature matching alone, without the bypass.
    pub fn match_user_agent(&self, user_agent: &str) -> BotClass {
        if user_agent.trim().is_empty() {
            return BotClass::Bot {
                signature: EMPTY_USER_AGENT.to_string(),
            };
        }

        for signature in &self.signatures {
            if signature.pattern.is_match(user_agent) {
                return match signature.verdict {
                    SignatureVerdict::Bot => BotClass::Bot {
                        signature: signature.pattern().to_string(),
                    },
                    SignatureVerdict::Human => BotClass::Human,
                };
            }
        }

        BotClass::Human
    }
}

impl std::fmt::Debug for BotFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotFilter")
            .field("signatures", &self.signatures.len())
            .field("bypass_enabled", &self.bypass_enabled())
            .finish()
    }
}
