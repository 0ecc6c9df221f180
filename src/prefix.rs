// 🔤 Family Prefixes - Text in front of a family's numeric suffix
// Legacy prefixes are reused verbatim; anything else is synthesized and reported.
// Two families may never share a prefix in one run.

use crate::config::NamingConfig;
use crate::error::{NamingError, NamingResult};
use crate::legacy::LegacyRegistry;
use crate::report::{NewPrefix, PrefixSource, ReportSink};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// How a family name turns into a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
enum PrefixPattern<'a> {
    /// Family already has legacy names
    Legacy(&'a str),

    /// Hand-coded entry from the config
    Abbreviation(&'a str),

    /// "AP2/ERF-RAV": the last subfamily token
    Slashed(&'a str),

    /// Any other single-word family name
    Truncated(&'a str),

    /// Unknown multi-word name, nothing sensible to build
    Unrecognized,
}

fn pattern_for<'a>(family: &'a str, legacy: &'a LegacyRegistry, config: &'a NamingConfig) -> PrefixPattern<'a> {
    if let Some(prefix) = legacy.dominant_prefix(family) {
        return PrefixPattern::Legacy(prefix);
    }
    if let Some(prefix) = config.abbreviations.get(family) {
        return PrefixPattern::Abbreviation(prefix.as_str());
    }
    if family.chars().any(char::is_whitespace) {
        return PrefixPattern::Unrecognized;
    }
    if family.contains('/') {
        let last = family
            .rsplit(|c: char| c == '/' || c == '-')
            .find(|part| !part.is_empty())
            .unwrap_or("");
        return PrefixPattern::Slashed(last);
    }
    PrefixPattern::Truncated(family)
}

// ============================================================================
// PREFIX RESOLVER
// ============================================================================

pub struct FamilyPrefixResolver<'a> {
    legacy: &'a LegacyRegistry,
    config: &'a NamingConfig,

    /// family -> prefix, in resolution order
    resolved: IndexMap<String, String>,

    /// prefix -> family that owns it
    owners: HashMap<String, String>,
}

impl<'a> FamilyPrefixResolver<'a> {
    pub fn new(legacy: &'a LegacyRegistry, config: &'a NamingConfig) -> Self {
        FamilyPrefixResolver {
            legacy,
            config,
            resolved: IndexMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Prefix for `family`, resolving and caching it on first use.
    /// Synthesized prefixes are logged to `report` once.
    pub fn prefix_for(&mut self, family: &str, report: &mut ReportSink) -> NamingResult<String> {
        if let Some(prefix) = self.resolved.get(family) {
            return Ok(prefix.clone());
        }

        let (prefix, source) = match pattern_for(family, self.legacy, self.config) {
            PrefixPattern::Legacy(prefix) => (prefix.to_string(), None),
            PrefixPattern::Abbreviation(prefix) => (prefix.to_string(), Some(PrefixSource::Abbreviation)),
            PrefixPattern::Slashed(token) => (self.synthesize(family, token)?, Some(PrefixSource::Slashed)),
            PrefixPattern::Truncated(token) => (self.synthesize(family, token)?, Some(PrefixSource::Truncated)),
            PrefixPattern::Unrecognized => {
                return Err(NamingError::UnresolvablePrefix {
                    family: family.to_string(),
                })
            }
        };

        // "ZmSWI3" + 1 would read back as suffix 31
        let prefix = match source {
            Some(_) if prefix.ends_with(|c: char| c.is_ascii_digit()) => format!("{}_", prefix),
            _ => prefix,
        };

        self.check_collision(family, &prefix, source.is_some())?;

        if let Some(source) = source {
            debug!("New prefix {} for family {} ({})", prefix, family, source.as_str());
            report.new_prefix(NewPrefix {
                family: family.to_string(),
                prefix: prefix.clone(),
                source,
            });
        }

        self.owners.insert(prefix.clone(), family.to_string());
        self.resolved.insert(family.to_string(), prefix.clone());
        Ok(prefix)
    }

    /// Families resolved so far, with their prefixes
    pub fn resolved(&self) -> &IndexMap<String, String> {
        &self.resolved
    }

    /// Species marker + uppercase alphanumerics of `token`, cut to the configured length
    fn synthesize(&self, family: &str, token: &str) -> NamingResult<String> {
        let body: String = token
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .take(self.config.prefix_length)
            .collect();

        if body.is_empty() {
            return Err(NamingError::UnresolvablePrefix {
                family: family.to_string(),
            });
        }

        Ok(format!("{}{}", self.config.species_prefix, body))
    }

    fn check_collision(&self, family: &str, prefix: &str, synthesized: bool) -> NamingResult<()> {
        let collision = |first: &str| NamingError::PrefixCollision {
            prefix: prefix.to_string(),
            first: first.to_string(),
            second: family.to_string(),
        };

        if let Some(owner) = self.owners.get(prefix) {
            if owner != family {
                return Err(collision(owner));
            }
        }

        // A new prefix must not shadow another family's legacy names
        if synthesized {
            if let Some(other) = self
                .legacy
                .names()
                .iter()
                .find(|n| n.prefix == prefix && n.family != family)
            {
                return Err(collision(&other.family));
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
