//! Path templates with `:name` placeholders.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Path template must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    #[error("Entry has no usable value for ':{field}' in {template:?}")]
    MissingField { template: String, field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A configured path such as `/articles/:slug`.
///
/// A placeholder is `:` followed by ASCII letters, digits or `_`. It is
/// replaced by the entry field of that name; a `:` not followed by a name
/// character is kept as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if !source.starts_with('/') {
            return Err(TemplateError::MissingLeadingSlash(source.to_string()));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c == ':' && chars.peek().is_some_and(|&next| is_name_char(next)) {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_name_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            } else {
                literal.push(c);
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

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder with the matching field of `entry`.
    ///
    /// Strings, numbers and booleans are accepted; a missing, null or
    /// structured field is an error.
    pub fn render(&self, entry: &Value) -> Result<String, TemplateError> {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder(name) => {
                    let value = entry.get(name).and_then(field_to_string).ok_or_else(|| {
                        TemplateError::MissingField {
                            template: self.source.clone(),
                            field: name.clone(),
                        }
                    })?;
                    rendered.push_str(&value);
                }
            }
        }
        Ok(rendered)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn field_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_requires_leading_slash() {
        assert_eq!(
            PathTemplate::parse("articles/:slug"),
            Err(TemplateError::MissingLeadingSlash("articles/:slug".to_string()))
        );
        assert!(PathTemplate::parse("").is_err());
    }

    #[test]
    fn test_placeholder_names_stop_at_non_name_chars() {
        let template = PathTemplate::parse("/:category/:slug.html?v=:version*").unwrap();
        assert_eq!(
            template.placeholders().collect::<Vec<_>>(),
            vec!["category", "slug", "version"]
        );
    }

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let template = PathTemplate::parse("/:category/:slug/:category").unwrap();
        let entry = json!({ "category": "news", "slug": "launch" });
        assert_eq!(template.render(&entry).unwrap(), "/news/launch/news");
    }

    #[test]
    fn test_render_scalar_fields() {
        let template = PathTemplate::parse("/items/:id/:published").unwrap();
        let entry = json!({ "id": 42, "published": true });
        assert_eq!(template.render(&entry).unwrap(), "/items/42/true");
    }

    #[test]
    fn test_bare_colon_is_literal() {
        let template = PathTemplate::parse("/a:/b:").unwrap();
        assert_eq!(template.placeholders().count(), 0);
        assert_eq!(template.render(&json!({})).unwrap(), "/a:/b:");
    }

    #[test]
    fn test_render_missing_or_unusable_field() {
        let template = PathTemplate::parse("/articles/:slug").unwrap();

        for entry in [json!({}), json!({ "slug": null }), json!({ "slug": ["a"] })] {
            assert_eq!(
                template.render(&entry),
                Err(TemplateError::MissingField {
                    template: "/articles/:slug".to_string(),
                    field: "slug".to_string(),
                })
            );
        }
    }
}
