use std::fmt;

use super::{ConfigError, session::{Entity, Session}};


/// A request path that may contain `{event_id}`-style placeholders, which are
/// filled from the [`Session`] on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Id(Entity),
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidPath { template: raw.into(), reason };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if raw.contains(['?', '#']) {
            return Err(invalid("must not contain a query or fragment"));
        }

        let mut segments = Vec::new();
        let mut rest = raw;
        while let Some(start) = rest.find(['{', '}']) {
            if rest[start..].starts_with('}') {
                return Err(invalid("unmatched '}'"));
            }
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].into()));
            }

            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
            let name = &after[..end];
            if name.contains('{') {
                return Err(invalid("nested '{'"));
            }
            let entity = Entity::from_placeholder(name)
                .ok_or_else(|| invalid("unknown placeholder"))?;
            segments.push(Segment::Id(entity));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.into()));
        }

        Ok(Self { raw: raw.into(), segments })
    }

    /// Whether the template contains at least one placeholder.
    pub fn is_templated(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Id(_)))
    }

    pub fn render(&self, session: &Session) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Id(entity) => out.push_str(&session.id(*entity).to_string()),
            }
        }
        out
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
