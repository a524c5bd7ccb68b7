//! Recursive mapping from chapter trees to display primitives.

use async_trait::async_trait;
use bookshelf_storage::{ImageCache, Result, resolve_proxy_url};
use bookshelf_types::{Chapter, ChapterNode, ElementNode, ImageNode, Story};

use crate::display::Display;
use crate::sanitize::{LINE_CLASS, sanitize_attributes, sanitize_text};

/// Turns an image URL into something displayable.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl ImageResolver for ImageCache {
    async fn resolve(&self, url: &str) -> Result<String> {
        self.fetch_or_get(url).await
    }
}

/// Outcome of resolving one image during rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSignal {
    pub url: String,
    pub loaded: bool,
}

/// A rendered chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChapter {
    pub title: Option<String>,
    pub body: Vec<Display>,
}

type SignalHandler<'a> = &'a (dyn Fn(ImageSignal) + Send + Sync);

pub struct Renderer<'a> {
    images: &'a dyn ImageResolver,
    on_image: Option<SignalHandler<'a>>,
}

impl<'a> Renderer<'a> {
    pub fn new(images: &'a dyn ImageResolver) -> Self {
        Self {
            images,
            on_image: None,
        }
    }

    /// Call `handler` once per image with whether it resolved.
    pub fn on_image(mut self, handler: SignalHandler<'a>) -> Self {
        self.on_image = Some(handler);
        self
    }

    /// Render a node that sits directly in a chapter body.
    pub async fn render_node(&self, node: &ChapterNode) -> Display {
        self.render(node, true).await
    }

    async fn render(&self, node: &ChapterNode, top_level: bool) -> Display {
        match node {
            ChapterNode::Text(text) if top_level => Display::Paragraph {
                class: LINE_CLASS.to_string(),
                text: sanitize_text(text),
            },
            ChapterNode::Text(text) => Display::Text(sanitize_text(text)),
            ChapterNode::Element(element) => self.render_element(element).await,
            ChapterNode::Image(image) => self.render_image(image).await,
        }
    }

    async fn render_element(&self, element: &ElementNode) -> Display {
        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            children.push(Box::pin(self.render(child, false)).await);
        }
        if children.is_empty() {
            if let Some(data) = &element.data {
                children.push(Display::Text(sanitize_text(data)));
            }
        }

        Display::Element {
            tag: element.tag.clone(),
            attributes: sanitize_attributes(&element.attributes),
            children,
        }
    }

    async fn render_image(&self, image: &ImageNode) -> Display {
        let url = resolve_proxy_url(&image.src);
        let (src, loaded) = match self.images.resolve(&url).await {
            Ok(src) => (src, true),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Falling back to remote image");
                (url.clone(), false)
            }
        };

        if let Some(handler) = self.on_image {
            handler(ImageSignal { url, loaded });
        }

        Display::Image {
            src,
            attributes: sanitize_attributes(&image.attributes),
            loaded,
        }
    }

    pub async fn render_chapter(&self, chapter: &Chapter) -> RenderedChapter {
        let mut body = Vec::with_capacity(chapter.contents.len());
        for node in &chapter.contents {
            body.push(self.render_node(node).await);
        }
        RenderedChapter {
            title: chapter.title.clone(),
            body,
        }
    }

    /// Raw text renders as a single untitled chapter of paragraphs.
    pub async fn render_story(&self, story: &Story) -> Vec<RenderedChapter> {
        match story {
            Story::RawText { lines } => vec![RenderedChapter {
                title: None,
                body: lines
                    .iter()
                    .map(|line| Display::Paragraph {
                        class: LINE_CLASS.to_string(),
                        text: sanitize_text(line),
                    })
                    .collect(),
            }],
            Story::Structured { chapters, .. } => {
                let mut rendered = Vec::with_capacity(chapters.len());
                for chapter in chapters {
                    rendered.push(self.render_chapter(chapter).await);
                }
                rendered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_storage::BookshelfError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct MapResolver;

    #[async_trait]
    impl ImageResolver for MapResolver {
        async fn resolve(&self, url: &str) -> Result<String> {
            if url.contains("missing") {
                return Err(BookshelfError::FetchFailed {
                    url: url.to_string(),
                    source: Some(eyre::eyre!("404")),
                });
            }
            Ok(format!("data:cached;{}", url))
        }
    }

    #[tokio::test]
    async fn top_level_text_becomes_paragraph() {
        let renderer = Renderer::new(&MapResolver);
        let display = renderer.render_node(&ChapterNode::text("wait...what")).await;
        assert_eq!(
            display,
            Display::Paragraph {
                class: "cow-line".into(),
                text: "wait...\u{200B}what".into()
            }
        );

        let display = renderer.render_node(&ChapterNode::text("wait... ")).await;
        assert_eq!(
            display,
            Display::Paragraph {
                class: "cow-line".into(),
                text: "wait... ".into()
            }
        );
    }

    #[tokio::test]
    async fn elements_render_children_recursively() {
        let node = ChapterNode::Element(
            ElementNode {
                tag: "blockquote".into(),
                children: vec![
                    ChapterNode::text("so..."),
                    ChapterNode::element("em", vec![ChapterNode::text("yes...no")]),
                ],
                ..Default::default()
            }
            .with_attribute("class", "quote"),
        );

        let display = Renderer::new(&MapResolver).render_node(&node).await;
        let Display::Element {
            tag,
            attributes,
            children,
        } = display
        else {
            panic!("expected element");
        };
        assert_eq!(tag, "blockquote");
        assert_eq!(attributes["class"], "quote cow-line");
        assert_eq!(children[0], Display::Text("so...".into()));
        assert_eq!(
            children[1],
            Display::Element {
                tag: "em".into(),
                attributes: BTreeMap::from([("class".to_string(), "cow-line".to_string())]),
                children: vec![Display::Text("yes...\u{200B}no".into())],
            }
        );
    }

    #[tokio::test]
    async fn leaf_elements_show_their_data() {
        let node = ChapterNode::Element(ElementNode {
            tag: "h1".into(),
            data: Some("Title".into()),
            ..Default::default()
        });
        let display = Renderer::new(&MapResolver).render_node(&node).await;
        assert_eq!(display.to_html(), "<h1 class=\"cow-line\">Title</h1>");
    }

    #[tokio::test]
    async fn images_resolve_through_cache_and_signal() {
        let signals = Mutex::new(Vec::new());
        let handler = |signal: ImageSignal| signals.lock().unwrap().push(signal);
        let renderer = Renderer::new(&MapResolver).on_image(&handler);

        let ok = renderer
            .render_node(&ChapterNode::image(
                "https://camo.fimfiction.net/x?url=https%3A%2F%2Fexample.com%2Fa.png",
            ))
            .await;
        let failed = renderer
            .render_node(&ChapterNode::image("https://example.com/missing.png"))
            .await;

        assert_eq!(
            ok,
            Display::Image {
                src: "data:cached;https://example.com/a.png".into(),
                attributes: BTreeMap::from([("class".to_string(), "cow-line".to_string())]),
                loaded: true,
            }
        );
        let Display::Image { src, loaded, .. } = failed else {
            panic!("expected image");
        };
        assert_eq!(src, "https://example.com/missing.png");
        assert!(!loaded);

        let signals = signals.into_inner().unwrap();
        assert_eq!(
            signals,
            vec![
                ImageSignal {
                    url: "https://example.com/a.png".into(),
                    loaded: true
                },
                ImageSignal {
                    url: "https://example.com/missing.png".into(),
                    loaded: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn raw_text_story_is_one_chapter_of_paragraphs() {
        let story = Story::from_text("one\ntwo...three");
        let chapters = Renderer::new(&MapResolver).render_story(&story).await;
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].body.len(), 2);
        assert_eq!(
            chapters[0].body[1],
            Display::Paragraph {
                class: "cow-line".into(),
                text: "two...\u{200B}three".into()
            }
        );
    }
}
