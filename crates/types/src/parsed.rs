//! Conversion from the loosely typed tree emitted by the story parser.
//!
//! The parser produces JSON where a node is either a bare string or an object
//! of the form `{tag, attributes, children, data}`. Stories are objects with a
//! `Format` field; `NONE` marks unformatted text whose `Content` is a list of
//! lines, anything else carries `Title`, `Author` and a list of chapters.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::node::{ChapterNode, ElementNode, ImageNode};
use crate::story::{Chapter, Story};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsedTreeError {
    #[error("Expected {expected} at {path}")]
    UnexpectedShape { expected: &'static str, path: String },

    #[error("Missing field '{field}' at {path}")]
    MissingField { field: &'static str, path: String },
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ParsedTreeError> {
    value.as_object().ok_or_else(|| ParsedTreeError::UnexpectedShape {
        expected: "an object",
        path: path.to_string(),
    })
}

fn as_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ParsedTreeError> {
    value.as_array().ok_or_else(|| ParsedTreeError::UnexpectedShape {
        expected: "an array",
        path: path.to_string(),
    })
}

fn as_string(value: &Value, path: &str) -> Result<String, ParsedTreeError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ParsedTreeError::UnexpectedShape {
            expected: "a string",
            path: path.to_string(),
        })
}

/// Attribute values may be strings, numbers, or lists of class names.
fn attribute_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn node_from_parsed(value: &Value) -> Result<ChapterNode, ParsedTreeError> {
    node_at(value, "$")
}

fn node_at(value: &Value, path: &str) -> Result<ChapterNode, ParsedTreeError> {
    if let Value::String(text) = value {
        return Ok(ChapterNode::Text(text.clone()));
    }

    let object = as_object(value, path)?;
    let tag = field(object, &["tag"])
        .ok_or_else(|| ParsedTreeError::MissingField {
            field: "tag",
            path: path.to_string(),
        })
        .and_then(|tag| as_string(tag, &format!("{path}.tag")))?;

    let mut attributes = BTreeMap::new();
    if let Some(attrs) = field(object, &["attributes", "attr"]).filter(|v| !v.is_null()) {
        for (name, value) in as_object(attrs, &format!("{path}.attributes"))? {
            attributes.insert(name.clone(), attribute_value(value));
        }
    }

    if tag.eq_ignore_ascii_case("img") {
        if let Some(src) = attributes.remove("src") {
            return Ok(ChapterNode::Image(ImageNode { src, attributes }));
        }
    }

    let mut children = Vec::new();
    if let Some(list) = field(object, &["children"]).filter(|v| !v.is_null()) {
        for (i, child) in as_array(list, &format!("{path}.children"))?.iter().enumerate() {
            children.push(node_at(child, &format!("{path}.children[{i}]"))?);
        }
    }

    let data = match field(object, &["data"]) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    Ok(ChapterNode::Element(ElementNode {
        tag,
        attributes,
        children,
        data,
    }))
}

pub fn chapter_from_parsed(value: &Value) -> Result<Chapter, ParsedTreeError> {
    chapter_at(value, "$")
}

fn chapter_at(value: &Value, path: &str) -> Result<Chapter, ParsedTreeError> {
    let object = as_object(value, path)?;

    let title = match field(object, &["Title", "Name", "title", "name"]) {
        None | Some(Value::Null) => None,
        Some(title) => Some(as_string(title, &format!("{path}.Title"))?),
    };

    let contents = field(object, &["Contents", "Text", "contents"]).ok_or_else(|| {
        ParsedTreeError::MissingField {
            field: "Contents",
            path: path.to_string(),
        }
    })?;

    let contents = as_array(contents, &format!("{path}.Contents"))?
        .iter()
        .enumerate()
        .map(|(i, node)| node_at(node, &format!("{path}.Contents[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Chapter { title, contents })
}

pub fn story_from_parsed(value: &Value) -> Result<Story, ParsedTreeError> {
    let object = as_object(value, "$")?;

    let format = field(object, &["Format", "format"])
        .map(|f| as_string(f, "$.Format"))
        .transpose()?
        .unwrap_or_else(|| "NONE".to_string());

    let content = field(object, &["Content", "content"]).ok_or(ParsedTreeError::MissingField {
        field: "Content",
        path: "$".to_string(),
    })?;
    let content = as_array(content, "$.Content")?;

    if format.eq_ignore_ascii_case("none") {
        let lines = content
            .iter()
            .enumerate()
            .map(|(i, line)| as_string(line, &format!("$.Content[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Story::RawText { lines });
    }

    let text_field = |names: &[&str], name: &'static str| -> Result<String, ParsedTreeError> {
        let value = field(object, names).ok_or(ParsedTreeError::MissingField {
            field: name,
            path: "$".to_string(),
        })?;
        as_string(value, &format!("$.{name}"))
    };

    let title = text_field(&["Title", "title"], "Title")?;
    let author = text_field(&["Author", "author"], "Author")?;
    let chapters = content
        .iter()
        .enumerate()
        .map(|(i, chapter)| chapter_at(chapter, &format!("$.Content[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Story::Structured {
        title,
        author,
        chapters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_become_text_nodes() {
        assert_eq!(
            node_from_parsed(&json!("hello")).unwrap(),
            ChapterNode::text("hello")
        );
    }

    #[test]
    fn img_tags_become_image_nodes() {
        let node = node_from_parsed(&json!({
            "tag": "img",
            "attributes": { "src": "https://example.com/a.png", "alt": "A" }
        }))
        .unwrap();

        match node {
            ChapterNode::Image(image) => {
                assert_eq!(image.src, "https://example.com/a.png");
                assert_eq!(image.attributes.get("alt").map(String::as_str), Some("A"));
                assert!(!image.attributes.contains_key("src"));
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn class_lists_are_joined() {
        let node = node_from_parsed(&json!({
            "tag": "span",
            "attr": { "class": ["bold", "red"] },
            "children": ["x"]
        }))
        .unwrap();

        let ChapterNode::Element(element) = node else {
            panic!("expected element");
        };
        assert_eq!(element.attributes["class"], "bold red");
        assert_eq!(element.children, vec![ChapterNode::text("x")]);
    }

    #[test]
    fn missing_tag_reports_path() {
        let err = node_from_parsed(&json!({ "tag": "p", "children": [{ "data": "x" }] })).unwrap_err();
        assert_eq!(
            err,
            ParsedTreeError::MissingField {
                field: "tag",
                path: "$.children[0]".to_string()
            }
        );
    }

    #[test]
    fn unformatted_story_is_raw_text() {
        let story = story_from_parsed(&json!({
            "Format": "NONE",
            "Content": ["first", "second"]
        }))
        .unwrap();
        assert_eq!(
            story,
            Story::RawText {
                lines: vec!["first".into(), "second".into()]
            }
        );
    }

    #[test]
    fn structured_story_keeps_chapters() {
        let story = story_from_parsed(&json!({
            "Format": "HTML",
            "Title": "A Story",
            "Author": "Someone",
            "Content": [
                { "Title": "Chapter 1", "Contents": ["Once...", { "tag": "p", "data": "end" }] }
            ]
        }))
        .unwrap();

        let Story::Structured {
            title,
            author,
            chapters,
        } = story
        else {
            panic!("expected structured story");
        };
        assert_eq!(title, "A Story");
        assert_eq!(author, "Someone");
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title.as_deref(), Some("Chapter 1"));
        assert_eq!(chapters[0].contents.len(), 2);
    }
}
