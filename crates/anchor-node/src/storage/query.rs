//! Tag query expressions
//!
//! An expression is one or more terms joined by `&&`, all of which must hold:
//!
//! | Term | Holds when |
//! |---|---|
//! | `name` | the tag is present |
//! | `!name` | the tag is absent |
//! | `name:value` | the tag is present with exactly this value |
//! | `name<=n`, `name<n`, `name>=n`, `name>n` | the tag's value is an integer comparing as given |

use std::fmt;
use std::str::FromStr;

use super::{StorageError, Tag};

/// Integer comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    fn holds(self, left: i64, right: i64) -> bool {
        match self {
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
        }
    }
}

/// A single term of an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTerm {
    Present(String),
    Absent(String),
    Equals(String, String),
    Compare {
        name: String,
        op: Comparison,
        value: i64,
    },
}

impl TagTerm {
    fn parse(term: &str) -> Result<Self, StorageError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(StorageError::InvalidQuery("empty term".into()));
        }

        if let Some(name) = term.strip_prefix('!') {
            return Ok(TagTerm::Absent(validate_name(name)?));
        }

        let Some(pos) = term.find([':', '<', '>']) else {
            return Ok(TagTerm::Present(validate_name(term)?));
        };

        let name = validate_name(&term[..pos])?;
        let rest = &term[pos..];

        if let Some(value) = rest.strip_prefix(':') {
            return Ok(TagTerm::Equals(name, value.to_string()));
        }

        let (op, operand) = if let Some(v) = rest.strip_prefix("<=") {
            (Comparison::Le, v)
        } else if let Some(v) = rest.strip_prefix(">=") {
            (Comparison::Ge, v)
        } else if let Some(v) = rest.strip_prefix('<') {
            (Comparison::Lt, v)
        } else if let Some(v) = rest.strip_prefix('>') {
            (Comparison::Gt, v)
        } else {
            return Err(StorageError::InvalidQuery(format!("unrecognized term '{}'", term)));
        };

        let value = operand.trim().parse::<i64>().map_err(|_| {
            StorageError::InvalidQuery(format!("'{}' is not an integer in term '{}'", operand, term))
        })?;

        Ok(TagTerm::Compare { name, op, value })
    }

    fn matches(&self, tags: &[Tag]) -> bool {
        let find = |name: &str| tags.iter().find(|t| t.name == name);
        match self {
            TagTerm::Present(name) => find(name).is_some(),
            TagTerm::Absent(name) => find(name).is_none(),
            TagTerm::Equals(name, value) => tags.iter().any(|t| t.name == *name && t.value == *value),
            TagTerm::Compare { name, op, value } => tags
                .iter()
                .filter(|t| t.name == *name)
                .filter_map(|t| t.value.parse::<i64>().ok())
                .any(|tag_value| op.holds(tag_value, *value)),
        }
    }
}

impl fmt::Display for TagTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagTerm::Present(name) => write!(f, "{}", name),
            TagTerm::Absent(name) => write!(f, "!{}", name),
            TagTerm::Equals(name, value) => write!(f, "{}:{}", name, value),
            TagTerm::Compare { name, op, value } => write!(f, "{}{}{}", name, op.as_str(), value),
        }
    }
}

fn validate_name(name: &str) -> Result<String, StorageError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::InvalidQuery("empty tag name".into()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(StorageError::InvalidQuery(format!("invalid tag name '{}'", name)));
    }
    Ok(name.to_string())
}

/// A parsed conjunction of tag terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpression {
    terms: Vec<TagTerm>,
}

impl TagExpression {
    pub fn parse(expression: &str) -> Result<Self, StorageError> {
        let terms = expression
            .split("&&")
            .map(TagTerm::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[TagTerm] {
        &self.terms
    }

    /// Whether a record with these tags satisfies every term
    pub fn matches(&self, tags: &[Tag]) -> bool {
        self.terms.iter().all(|term| term.matches(tags))
    }
}

impl FromStr for TagExpression {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.terms.iter().map(ToString::to_string).collect();
        f.write_str(&terms.join("&&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<Tag> {
        pairs.iter().map(|(n, v)| Tag::new(*n, *v)).collect()
    }

    #[test]
    fn test_parse_terms() {
        let expr = TagExpression::parse("anchorHash:uEiABC&&!status&&expiryTime<=1700000000&&seen").unwrap();
        assert_eq!(
            expr.terms(),
            &[
                TagTerm::Equals("anchorHash".into(), "uEiABC".into()),
                TagTerm::Absent("status".into()),
                TagTerm::Compare {
                    name: "expiryTime".into(),
                    op: Comparison::Le,
                    value: 1_700_000_000
                },
                TagTerm::Present("seen".into()),
            ]
        );
        assert_eq!(expr.to_string(), "anchorHash:uEiABC&&!status&&expiryTime<=1700000000&&seen");
    }

    #[test]
    fn test_equality_value_may_contain_colons() {
        let expr = TagExpression::parse("link:hl:uEiABC:meta").unwrap();
        assert_eq!(expr.terms(), &[TagTerm::Equals("link".into(), "hl:uEiABC:meta".into())]);
    }

    #[test]
    fn test_matching() {
        let pending = tags(&[("anchorHash", "H"), ("status", "pending"), ("expiryTime", "100")]);
        let processed = tags(&[("anchorHash", "H")]);

        let only_processed = TagExpression::parse("anchorHash:H&&!status").unwrap();
        assert!(only_processed.matches(&processed));
        assert!(!only_processed.matches(&pending));

        let expired = TagExpression::parse("expiryTime<=100").unwrap();
        assert!(expired.matches(&pending));
        assert!(!expired.matches(&processed));
        assert!(!TagExpression::parse("expiryTime<100").unwrap().matches(&pending));
        assert!(TagExpression::parse("expiryTime>=100").unwrap().matches(&pending));
        assert!(!TagExpression::parse("expiryTime>100").unwrap().matches(&pending));
    }

    #[test]
    fn test_non_numeric_tag_never_compares() {
        let record = tags(&[("expiryTime", "soon")]);
        assert!(!TagExpression::parse("expiryTime<=100").unwrap().matches(&record));
        assert!(!TagExpression::parse("expiryTime>100").unwrap().matches(&record));
    }

    #[test]
    fn test_malformed_expressions() {
        for bad in ["", "&&", "a&&", "!", ":v", "a<=x", "a b", "a<>1"] {
            assert!(
                matches!(TagExpression::parse(bad), Err(StorageError::InvalidQuery(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }
}
