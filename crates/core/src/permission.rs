//! Permission templates and granted permission sets.
//!
//! A permission is a dot-separated capability name such as
//! `ui.projects.0190c2.view`. Routes declare a *template* which may embed
//! request parameters (`ui.projects.{project_id}.view`) and may list several
//! alternatives separated by `|`. At request time the template is filled and
//! expanded into the set of concrete names that would satisfy it; a principal
//! passes if it holds at least one of them.
//!
//! Expansion adds every wildcard ancestor of each concrete name, so a grant
//! of `ui.projects.*` or `*` satisfies `ui.projects.{project_id}.view`:
//!
//! ```text
//! ui.projects.42.view -> ui.projects.42.view
//!                        ui.projects.42.*
//!                        ui.projects.*
//!                        ui.*
//!                        *
//! ```

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::CoreError;

/// Separator between alternatives in a template.
const ALTERNATIVE_SEPARATOR: char = '|';

/// Separator between segments of a permission name.
const SEGMENT_SEPARATOR: char = '.';

/// Wildcard segment.
pub const WILDCARD: &str = "*";

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed permission template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTemplate {
    source: String,
    alternatives: Vec<Vec<Segment>>,
}

impl PermissionTemplate {
    /// Parse a template string.
    ///
    /// Rules:
    /// - at least one alternative, alternatives separated by `|`
    /// - segments separated by `.`, none empty
    /// - a literal segment is `*` or `[A-Za-z0-9_-]+`
    /// - a placeholder segment is `{name}` with `name` matching `[A-Za-z0-9_]+`
    pub fn parse(template: &str) -> Result<Self, CoreError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(CoreError::Validation(
                "Permission template must not be empty".to_string(),
            ));
        }

        let mut alternatives = Vec::new();
        for alternative in template.split(ALTERNATIVE_SEPARATOR) {
            let alternative = alternative.trim();
            let mut segments = Vec::new();
            for raw in alternative.split(SEGMENT_SEPARATOR) {
                segments.push(parse_segment(raw, template)?);
            }
            alternatives.push(segments);
        }

        Ok(Self {
            source: template.to_string(),
            alternatives,
        })
    }

    /// Parse a template known at compile time.
    ///
    /// # Panics
    ///
    /// Panics if the template is malformed. Route tables call this while the
    /// router is being built so a typo stops the server from starting.
    pub fn from_static(template: &'static str) -> Self {
        match Self::parse(template) {
            Ok(parsed) => parsed,
            Err(e) => panic!("Invalid permission template '{template}': {e}"),
        }
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of all placeholders, in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for segment in self.alternatives.iter().flatten() {
            if let Segment::Placeholder(name) = segment {
                if !seen.contains(&name.as_str()) {
                    seen.push(name.as_str());
                }
            }
        }
        seen
    }

    /// Fill placeholders using `lookup` and expand into every permission name
    /// that satisfies this template.
    ///
    /// Fails if a placeholder has no value or its value is not a safe single
    /// segment (see [`is_safe_value`]).
    pub fn expand<'a, F>(&self, lookup: F) -> Result<BTreeSet<String>, CoreError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut expanded = BTreeSet::new();

        for alternative in &self.alternatives {
            let mut filled = Vec::with_capacity(alternative.len());
            for segment in alternative {
                match segment {
                    Segment::Literal(lit) => filled.push(lit.clone()),
                    Segment::Placeholder(name) => {
                        let value = lookup(name.as_str()).ok_or_else(|| {
                            CoreError::Validation(format!(
                                "No value for placeholder '{{{name}}}' in permission '{}'",
                                self.source
                            ))
                        })?;
                        if !is_safe_value(value) {
                            return Err(CoreError::Validation(format!(
                                "Value for placeholder '{{{name}}}' is not a valid permission segment"
                            )));
                        }
                        filled.push(value.to_string());
                    }
                }
            }
            expanded.extend(with_wildcard_ancestors(&filled));
        }

        Ok(expanded)
    }
}

impl fmt::Display for PermissionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_segment(raw: &str, template: &str) -> Result<Segment, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::Validation(format!(
            "Permission template '{template}' contains an empty segment"
        )));
    }

    if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CoreError::Validation(format!(
                "Permission template '{template}' has an invalid placeholder '{raw}'"
            )));
        }
        return Ok(Segment::Placeholder(inner.to_string()));
    }

    if raw == WILDCARD || raw.chars().all(is_literal_char) {
        Ok(Segment::Literal(raw.to_string()))
    } else {
        Err(CoreError::Validation(format!(
            "Permission template '{template}' has an invalid segment '{raw}'"
        )))
    }
}

fn is_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Returns `true` if a request-supplied value may be spliced into a
/// permission name as exactly one segment.
///
/// Separators and wildcards are refused so a crafted route parameter can
/// never widen the permission being checked.
pub fn is_safe_value(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_literal_char)
}

/// `a.b.c` -> `a.b.c`, `a.b.*`, `a.*`, `*`.
fn with_wildcard_ancestors(segments: &[String]) -> Vec<String> {
    let mut names = Vec::with_capacity(segments.len() + 1);
    names.push(segments.join("."));
    for prefix_len in (0..segments.len()).rev() {
        let mut name = segments[..prefix_len].join(".");
        if !name.is_empty() {
            name.push(SEGMENT_SEPARATOR);
        }
        name.push_str(WILDCARD);
        names.push(name);
    }
    names.dedup();
    names
}

// ---------------------------------------------------------------------------
// Granted set
// ---------------------------------------------------------------------------

/// The capabilities granted to a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: HashSet<String>,
}

impl PermissionSet {
    pub fn new<I, S>(granted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: granted
                .into_iter()
                .map(Into::into)
                .map(|p: String| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns `true` if at least one of `required` has been granted.
    pub fn allows_any<'a, I>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        required.into_iter().any(|p| self.granted.contains(p))
    }

    /// Fill and expand `template`, then check it against this set.
    ///
    /// An unfillable template authorises nothing.
    pub fn allows<'a, F>(&self, template: &PermissionTemplate, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        match template.expand(lookup) {
            Ok(required) => self.allows_any(&required),
            Err(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    /// Granted names in sorted order.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut out: Vec<String> = self.granted.iter().cloned().collect();
        out.sort();
        out
    }
}

/// Union of a role's permissions and a user's direct grants, sorted and
/// de-duplicated.
pub fn effective_permissions(role: &[String], direct: &[String]) -> Vec<String> {
    PermissionSet::new(role.iter().chain(direct.iter()).cloned()).to_sorted_vec()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn params<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<&'a str> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |k: &str| map.get(k).copied()
    }

    #[test]
    fn parses_literal_template() {
        let t = PermissionTemplate::parse("ui.projects.view").unwrap();
        assert_eq!(t.as_str(), "ui.projects.view");
        assert!(t.placeholders().is_empty());
    }

    #[test]
    fn rejects_malformed_templates() {
        for bad in ["", "ui..view", "ui.{}.view", "ui.{a-b}.view", "ui.pro jects", "a|"] {
            assert!(PermissionTemplate::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn expansion_includes_wildcard_ancestors() {
        let t = PermissionTemplate::parse("ui.projects.{project_id}.view").unwrap();
        let expanded = t.expand(params(&[("project_id", "p1")])).unwrap();
        let expected: BTreeSet<String> = [
            "ui.projects.p1.view",
            "ui.projects.p1.*",
            "ui.projects.*",
            "ui.*",
            "*",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(expanded, expected);
    }

    #[test]
    fn alternatives_are_unioned() {
        let t = PermissionTemplate::parse("ui.templates.view|ui.admin.view").unwrap();
        let expanded = t.expand(|_| None).unwrap();
        assert!(expanded.contains("ui.templates.view"));
        assert!(expanded.contains("ui.admin.view"));
        assert!(expanded.contains("ui.*"));
    }

    #[test]
    fn missing_placeholder_fails_expansion() {
        let t = PermissionTemplate::parse("ui.projects.{project_id}.view").unwrap();
        assert!(t.expand(|_| None).is_err());
    }

    #[test]
    fn unsafe_values_never_authorise() {
        let t = PermissionTemplate::parse("ui.projects.{project_id}.view").unwrap();
        let set = PermissionSet::new(["ui.projects.*.view", "ui.projects.a.b.view"]);
        assert!(!set.allows(&t, params(&[("project_id", "*")])));
        assert!(!set.allows(&t, params(&[("project_id", "a.b")])));
        assert!(!set.allows(&t, params(&[("project_id", "")])));
    }

    #[test]
    fn at_least_one_match_is_enough() {
        let t = PermissionTemplate::parse("ui.projects.{project_id}.update").unwrap();
        let lookup = params(&[("project_id", "p1")]);

        assert!(PermissionSet::new(["ui.projects.p1.update"]).allows(&t, &lookup));
        assert!(PermissionSet::new(["ui.projects.*"]).allows(&t, &lookup));
        assert!(PermissionSet::new(["*"]).allows(&t, &lookup));
        assert!(!PermissionSet::new(["ui.projects.p2.update"]).allows(&t, &lookup));
        assert!(!PermissionSet::new(["ui.projects.p1.view"]).allows(&t, &lookup));
        assert!(!PermissionSet::default().allows(&t, &lookup));
    }

    #[test]
    fn effective_permissions_are_sorted_and_unique() {
        let role = vec!["ui.projects.view".to_string(), "ui.templates.view".to_string()];
        let direct = vec!["ui.projects.view".to_string(), " ".to_string()];
        assert_eq!(
            effective_permissions(&role, &direct),
            vec!["ui.projects.view".to_string(), "ui.templates.view".to_string()]
        );
    }

    #[test]
    #[should_panic(expected = "Invalid permission template")]
    fn from_static_panics_on_typo() {
        let _ = PermissionTemplate::from_static("ui..view");
    }
}
