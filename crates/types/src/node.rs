use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single node of a chapter's content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterNode {
    Text(String),
    Element(ElementNode),
    Image(ImageNode),
}

/// A generic markup element such as `p`, `em` or `blockquote`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChapterNode>,
    /// Raw text payload for leaf elements that carry no children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// An `img` element. `src` is kept out of `attributes`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageNode {
    pub src: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ChapterNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn element(tag: impl Into<String>, children: Vec<ChapterNode>) -> Self {
        Self::Element(ElementNode {
            tag: tag.into(),
            children,
            ..Default::default()
        })
    }

    pub fn image(src: impl Into<String>) -> Self {
        Self::Image(ImageNode {
            src: src.into(),
            attributes: BTreeMap::new(),
        })
    }

    /// Child nodes, empty for leaves.
    pub fn children(&self) -> &[ChapterNode] {
        match self {
            ChapterNode::Element(element) => &element.children,
            ChapterNode::Text(_) | ChapterNode::Image(_) => &[],
        }
    }
}

impl ElementNode {
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}
