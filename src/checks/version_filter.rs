use semver::Version;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Ignore rule '{rule}' does not name a valid semantic version: {source}")]
pub struct IgnoreRuleError {
    pub rule: String,
    #[source]
    pub source: semver::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IgnoreRule {
    /// `<X`: everything with lower precedence than `X`.
    Below(Version),
    /// Anything else: the normalized tag must match the rule text exactly.
    Exact(String),
}

/// Decides which release tags of a single catalog entry make it into the index.
#[derive(Debug, Clone, Default)]
pub struct VersionFilter {
    rules: Vec<(String, IgnoreRule)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(String),
    /// The tag, minus any leading `v`, is not a semantic version.
    InvalidVersion(String),
    Ignored { version: String, rule: String },
}

impl VersionFilter {
    pub fn new(rules: &[String]) -> Result<Self, IgnoreRuleError> {
        let rules = rules
            .iter()
            .map(|raw| {
                let rule = match raw.strip_prefix('<') {
                    Some(bound) => IgnoreRule::Below(Version::parse(bound.trim()).map_err(
                        |source| IgnoreRuleError {
                            rule: raw.clone(),
                            source,
                        },
                    )?),
                    None => IgnoreRule::Exact(raw.clone()),
                };
                Ok((raw.clone(), rule))
            })
            .collect::<Result<_, _>>()?;
        Ok(VersionFilter { rules })
    }

    pub fn accept(&self, tag: &str) -> Verdict {
        let version = normalize_tag(tag);
        let parsed = match Version::parse(version) {
            Ok(v) => v,
            Err(_) => return Verdict::InvalidVersion(version.to_string()),
        };
        let matched = self.rules.iter().find(|(_, rule)| match rule {
            IgnoreRule::Below(bound) => parsed.cmp_precedence(bound).is_lt(),
            IgnoreRule::Exact(exact) => exact == version,
        });
        match matched {
            Some((raw, _)) => Verdict::Ignored {
                version: version.to_string(),
                rule: raw.clone(),
            },
            None => Verdict::Accepted(version.to_string()),
        }
    }
}

/// Strip a single leading `v` from a release tag.
pub fn normalize_tag(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}
