//! Message templates with `{field}` placeholders.
//!
//! Placeholders name columns of the `ShowPlayers` table (`name`, `steamid`,
//! `playeruid`, ...). `{{` and `}}` produce literal braces.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::snapshot::PlayerRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),

    #[error("single '}}' at byte {0}, use '}}}}' for a literal brace")]
    UnmatchedClose(usize),

    #[error("empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),

    #[error("placeholder '{0}' is not a field of the player record")]
    MissingField(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A compiled message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.next_if(|&(_, n)| n == '{').is_some() => literal.push('{'),
                '}' if chars.next_if(|&(_, n)| n == '}').is_some() => literal.push('}'),
                '}' => return Err(TemplateError::UnmatchedClose(pos)),
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, '{')) | None => return Err(TemplateError::Unclosed(pos)),
                            Some((_, ch)) => field.push(ch),
                        }
                    }
                    if field.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder(pos));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Substitute every placeholder with the record's raw value.
    pub fn render(&self, record: &PlayerRecord) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = record
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingField(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// The `Broadcast` command splits its argument on spaces, so every ASCII space
/// becomes an underscore.
pub fn to_broadcast(text: &str) -> String {
    text.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> PlayerRecord {
        PlayerRecord::from_fields([
            ("name", "Alice Smith"),
            ("playeruid", "1234567890"),
            ("steamid", "76561199000000001"),
        ])
        .unwrap()
    }

    #[test]
    fn test_render_default_join_message() {
        let template = Template::parse("{name} ({steamid}) has joined the server.").unwrap();

        assert_eq!(
            template.render(&alice()).unwrap(),
            "Alice Smith (76561199000000001) has joined the server."
        );
    }

    #[test]
    fn test_broadcast_replaces_spaces() {
        assert_eq!(
            to_broadcast("Alice Smith (76561199000000001) has joined the server."),
            "Alice_Smith_(76561199000000001)_has_joined_the_server."
        );
        // Only the ASCII space is touched.
        assert_eq!(to_broadcast("a\tb\u{3000}c  d"), "a\tb\u{3000}c__d");
    }

    #[test]
    fn test_missing_field() {
        let template = Template::parse("{name} reached level {level}").unwrap();

        assert_eq!(
            template.render(&alice()),
            Err(TemplateError::MissingField("level".to_string()))
        );
    }

    #[test]
    fn test_any_column_is_a_placeholder() {
        let template = Template::parse("#{playeruid}: {name}").unwrap();
        assert_eq!(template.render(&alice()).unwrap(), "#1234567890: Alice Smith");
        assert_eq!(
            template.segments,
            vec![
                Segment::Literal("#".to_string()),
                Segment::Field("playeruid".to_string()),
                Segment::Literal(": ".to_string()),
                Segment::Field("name".to_string()),
            ]
        );
    }

    #[test]
    fn test_escaped_braces() {
        let template = Template::parse("{{{name}}} }}{{").unwrap();
        assert_eq!(template.render(&alice()).unwrap(), "{Alice Smith} }{");
    }

    #[test]
    fn test_malformed_templates() {
        assert_eq!(Template::parse("{name"), Err(TemplateError::Unclosed(0)));
        assert_eq!(Template::parse("hi {na{me}"), Err(TemplateError::Unclosed(3)));
        assert_eq!(Template::parse("name}"), Err(TemplateError::UnmatchedClose(4)));
        assert_eq!(Template::parse("x {}"), Err(TemplateError::EmptyPlaceholder(2)));
    }

    #[test]
    fn test_display_round_trips_source() {
        let source = "{name} left";
        let template: Template = source.parse().unwrap();
        assert_eq!(template.to_string(), source);
        assert_eq!(template.as_str(), source);
    }
}
