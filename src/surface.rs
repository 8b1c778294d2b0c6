//! Host surface.
//!
//! The widget never touches a document directly. It drives a [`Surface`], which
//! a host implements on top of whatever it renders into: a browser DOM, a
//! terminal, or the in-memory document used by tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::conversation::NodeId;
use crate::markdown::{escape_html, plain_text};
use crate::view::{BADGE_ELEMENT, BUBBLE_TEXT_OPEN, LOG_ELEMENT, WidgetMarkup};

/// Distance from the bottom, in pixels, under which the log counts as scrolled
/// to the bottom.
pub const AT_BOTTOM_THRESHOLD: u32 = 16;

/// Scroll geometry of the message log, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_top: u32,
    pub scroll_height: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    /// True when the viewport is within [`AT_BOTTOM_THRESHOLD`] of the end.
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_height
            .saturating_sub(self.scroll_top)
            .saturating_sub(self.client_height)
            < AT_BOTTOM_THRESHOLD
    }
}

///////////////////////////////////////////// Surface ////////////////////////////////////////////

/// Rendering target driven by the widget.
///
/// Node operations address message rows by id. A row appended with
/// [`Surface::append_node`] carries its full markup; the `set_node_*` methods
/// replace only the bubble content of a row. Operations on ids the surface
/// no longer holds must be no-ops.
pub trait Surface: Send {
    /// True if an element with `id` already exists in the document.
    fn has_element(&self, id: &str) -> bool;

    /// Installs the widget stylesheet under element `id`.
    fn install_stylesheet(&mut self, id: &str, css: &str);

    /// Attaches the bubble and the panel.
    fn mount(&mut self, markup: &WidgetMarkup);

    /// Shows or hides the panel.
    fn set_open(&mut self, open: bool);

    /// Shows the unread badge with `text`, or hides it.
    fn set_unread_badge(&mut self, text: Option<&str>);

    /// Appends a row to the message log.
    fn append_node(&mut self, id: NodeId, markup: &str);

    fn remove_node(&mut self, id: NodeId);

    /// Empties the message log.
    fn clear_log(&mut self);

    /// Sets the bubble content of a row to literal text.
    fn set_node_text(&mut self, id: NodeId, text: &str);

    /// Sets the bubble content of a row to markup.
    fn set_node_markup(&mut self, id: NodeId, markup: &str);

    fn scroll_to_bottom(&mut self);

    fn clear_input(&mut self);

    fn focus_input(&mut self);

    /// Resizes the input to fit `draft`.
    fn autosize_input(&mut self, draft: &str) {
        let _ = draft;
    }

    fn show_welcome_popup(&mut self, markup: &str);

    fn hide_welcome_popup(&mut self);
}

////////////////////////////////////////// MemorySurface /////////////////////////////////////////

const LINE_HEIGHT: u32 = 24;
const ROW_PADDING: u32 = 20;
const DEFAULT_CLIENT_HEIGHT: u32 = 400;
const MAX_INPUT_ROWS: usize = 5;

#[derive(Debug, Clone)]
struct Node {
    id: NodeId,
    /// Markup before the bubble content; empty for rows without a bubble.
    prefix: String,
    content: String,
    suffix: String,
}

impl Node {
    fn parse(id: NodeId, markup: &str) -> Self {
        match markup.find(BUBBLE_TEXT_OPEN) {
            Some(start) if markup.ends_with("</div></div>") => {
                let open_end = start + BUBBLE_TEXT_OPEN.len();
                let close_start = markup.len() - "</div></div>".len();
                Node {
                    id,
                    prefix: markup[..open_end].to_string(),
                    content: markup[open_end..close_start].to_string(),
                    suffix: "</div></div>".to_string(),
                }
            }
            _ => Node {
                id,
                prefix: String::new(),
                content: markup.to_string(),
                suffix: String::new(),
            },
        }
    }

    fn markup(&self) -> String {
        format!("{}{}{}", self.prefix, self.content, self.suffix)
    }

    fn height(&self) -> u32 {
        let lines = plain_text(&self.content).lines().count().max(1) as u32;
        lines * LINE_HEIGHT + ROW_PADDING
    }
}

#[derive(Debug)]
struct Document {
    stylesheets: Vec<(String, String)>,
    mounted: Option<WidgetMarkup>,
    open: bool,
    badge: Option<String>,
    nodes: Vec<Node>,
    popup: Option<String>,
    scroll_top: u32,
    client_height: u32,
    input_clears: usize,
    input_focuses: usize,
    input_rows: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            stylesheets: Vec::new(),
            mounted: None,
            open: false,
            badge: None,
            nodes: Vec::new(),
            popup: None,
            scroll_top: 0,
            client_height: DEFAULT_CLIENT_HEIGHT,
            input_clears: 0,
            input_focuses: 0,
            input_rows: 1,
        }
    }
}

impl Document {
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    fn scroll_height(&self) -> u32 {
        self.nodes.iter().map(Node::height).sum()
    }

    fn max_scroll_top(&self) -> u32 {
        self.scroll_height().saturating_sub(self.client_height)
    }
}

/// In-memory document with a simulated scroll viewport.
///
/// Clones share the same document, so a test can hand one clone to the widget
/// and inspect the page through another.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    doc: Arc<Mutex<Document>>,
}

impl MemorySurface {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document that already contains an element with `id`.
    pub fn with_existing_element(id: impl Into<String>) -> Self {
        let surface = Self::new();
        surface
            .lock()
            .stylesheets
            .push((id.into(), String::new()));
        surface
    }

    /// Sets the height of the log viewport.
    pub fn with_client_height(self, client_height: u32) -> Self {
        self.lock().client_height = client_height;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stylesheets installed.
    pub fn stylesheet_count(&self) -> usize {
        self.lock().stylesheets.len()
    }

    /// True once the bubble and panel are attached.
    pub fn is_mounted(&self) -> bool {
        self.lock().mounted.is_some()
    }

    /// True while the panel is shown.
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Text of the unread badge, `None` while hidden.
    pub fn badge(&self) -> Option<String> {
        self.lock().badge.clone()
    }

    /// Ids of the rows in the log, in order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.lock().nodes.iter().map(|node| node.id).collect()
    }

    /// Full markup of each row, in order.
    pub fn rows(&self) -> Vec<String> {
        self.lock().nodes.iter().map(Node::markup).collect()
    }

    /// Bubble content of a row.
    pub fn node_content(&self, id: NodeId) -> Option<String> {
        self.lock()
            .nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.content.clone())
    }

    /// Visible text of a row.
    pub fn node_text(&self, id: NodeId) -> Option<String> {
        self.node_content(id).map(|content| plain_text(&content))
    }

    /// Markup of the welcome popup while shown.
    pub fn popup(&self) -> Option<String> {
        self.lock().popup.clone()
    }

    /// Current scroll geometry of the log.
    pub fn metrics(&self) -> ScrollMetrics {
        let doc = self.lock();
        ScrollMetrics {
            scroll_top: doc.scroll_top,
            scroll_height: doc.scroll_height(),
            client_height: doc.client_height,
        }
    }

    /// Moves the viewport as a user scroll would, clamped to the content.
    pub fn scroll_to(&self, scroll_top: u32) -> ScrollMetrics {
        {
            let mut doc = self.lock();
            doc.scroll_top = scroll_top.min(doc.max_scroll_top());
        }
        self.metrics()
    }

    /// Number of times the input was cleared.
    pub fn input_clears(&self) -> usize {
        self.lock().input_clears
    }

    /// Number of times the input was focused.
    pub fn input_focuses(&self) -> usize {
        self.lock().input_focuses
    }

    /// Rows the input currently spans.
    pub fn input_rows(&self) -> usize {
        self.lock().input_rows
    }

    /// Serializes the document as a standalone HTML page.
    pub fn render_document(&self) -> String {
        let doc = self.lock();
        let styles: String = doc
            .stylesheets
            .iter()
            .filter(|(_, css)| !css.is_empty())
            .map(|(id, css)| format!("<style id=\"{}\">{css}</style>\n", escape_html(id)))
            .collect();
        let mut body = String::new();
        if let Some(markup) = &doc.mounted {
            let badge = match &doc.badge {
                Some(text) => format!(r#"<div class="fcw-unread">{}</div>"#, escape_html(text)),
                None => BADGE_ELEMENT.to_string(),
            };
            body.push_str(&markup.bubble.replace(BADGE_ELEMENT, &badge));
            body.push('\n');
            let rows: String = doc.nodes.iter().map(Node::markup).collect();
            let log = LOG_ELEMENT.replace("></div>", &format!(">{rows}</div>"));
            let mut panel = markup.panel.replace(LOG_ELEMENT, &log);
            if doc.open {
                panel = panel.replacen(r#"class="fcw-widget""#, r#"class="fcw-widget open""#, 1);
            }
            body.push_str(&panel);
            body.push('\n');
        }
        if let Some(popup) = &doc.popup {
            body.push_str(&popup.replacen(
                r#"class="fcw-welcome-popup""#,
                r#"class="fcw-welcome-popup show""#,
                1,
            ));
            body.push('\n');
        }
        format!(
            "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n{styles}</head>\n<body>\n{body}</body>\n</html>\n"
        )
    }
}

impl Surface for MemorySurface {
    fn has_element(&self, id: &str) -> bool {
        self.lock().stylesheets.iter().any(|(existing, _)| existing == id)
    }

    fn install_stylesheet(&mut self, id: &str, css: &str) {
        self.lock().stylesheets.push((id.to_string(), css.to_string()));
    }

    fn mount(&mut self, markup: &WidgetMarkup) {
        self.lock().mounted = Some(markup.clone());
    }

    fn set_open(&mut self, open: bool) {
        self.lock().open = open;
    }

    fn set_unread_badge(&mut self, text: Option<&str>) {
        self.lock().badge = text.map(str::to_string);
    }

    fn append_node(&mut self, id: NodeId, markup: &str) {
        self.lock().nodes.push(Node::parse(id, markup));
    }

    fn remove_node(&mut self, id: NodeId) {
        let mut doc = self.lock();
        doc.nodes.retain(|node| node.id != id);
        doc.scroll_top = doc.scroll_top.min(doc.max_scroll_top());
    }

    fn clear_log(&mut self) {
        let mut doc = self.lock();
        doc.nodes.clear();
        doc.scroll_top = 0;
    }

    fn set_node_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.lock().node_mut(id) {
            node.content = escape_html(text).replace('\n', "<br>");
        }
    }

    fn set_node_markup(&mut self, id: NodeId, markup: &str) {
        if let Some(node) = self.lock().node_mut(id) {
            node.content = markup.to_string();
        }
    }

    fn scroll_to_bottom(&mut self) {
        let mut doc = self.lock();
        doc.scroll_top = doc.max_scroll_top();
    }

    fn clear_input(&mut self) {
        let mut doc = self.lock();
        doc.input_clears += 1;
        doc.input_rows = 1;
    }

    fn focus_input(&mut self) {
        self.lock().input_focuses += 1;
    }

    fn autosize_input(&mut self, draft: &str) {
        self.lock().input_rows = draft.lines().count().clamp(1, MAX_INPUT_ROWS);
    }

    fn show_welcome_popup(&mut self, markup: &str) {
        self.lock().popup = Some(markup.to_string());
    }

    fn hide_welcome_popup(&mut self) {
        self.lock().popup = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Sender;
    use crate::view::message_markup;

    #[test]
    fn at_bottom_threshold() {
        let metrics = |scroll_top| ScrollMetrics {
            scroll_top,
            scroll_height: 1000,
            client_height: 400,
        };
        assert!(metrics(600).is_at_bottom());
        assert!(metrics(585).is_at_bottom());
        assert!(!metrics(584).is_at_bottom());
        assert!(!metrics(0).is_at_bottom());
        assert!(ScrollMetrics::default().is_at_bottom());
    }

    #[test]
    fn node_content_is_addressable() {
        let mut surface = MemorySurface::new();
        surface.append_node(1, &message_markup(Sender::Bot, ""));
        surface.set_node_text(1, "a <b>\nc");
        assert_eq!(surface.node_content(1).as_deref(), Some("a &lt;b&gt;<br>c"));
        assert_eq!(surface.node_text(1).as_deref(), Some("a <b>\nc"));
        surface.set_node_markup(1, "<b>done</b>");
        assert_eq!(
            surface.rows(),
            vec![message_markup(Sender::Bot, "<b>done</b>")]
        );
        surface.remove_node(1);
        surface.set_node_text(1, "late");
        assert!(surface.node_ids().is_empty());
    }

    #[test]
    fn scrolling_is_clamped() {
        let mut surface = MemorySurface::new().with_client_height(100);
        for id in 0..10 {
            surface.append_node(id, &message_markup(Sender::User, "x"));
        }
        assert_eq!(surface.metrics().scroll_height, 440);
        assert!(!surface.metrics().is_at_bottom());
        surface.scroll_to_bottom();
        assert!(surface.metrics().is_at_bottom());
        assert_eq!(surface.scroll_to(10_000).scroll_top, 340);
        assert_eq!(surface.scroll_to(0).scroll_top, 0);
    }

    #[test]
    fn existing_element_is_reported() {
        let surface = MemorySurface::with_existing_element("fcw-style");
        assert!(surface.has_element("fcw-style"));
        assert!(!surface.has_element("other"));
    }

    #[test]
    fn document_snapshot() {
        let mut surface = MemorySurface::new();
        surface.install_stylesheet("fcw-style", ".x{}");
        surface.mount(&WidgetMarkup {
            bubble: format!("<div>{BADGE_ELEMENT}</div>"),
            panel: format!(r#"<div class="fcw-widget">{LOG_ELEMENT}</div>"#),
        });
        surface.append_node(0, &message_markup(Sender::Bot, "hello"));
        surface.set_unread_badge(Some("3"));
        surface.set_open(true);
        let page = surface.render_document();
        assert!(page.contains(r#"<style id="fcw-style">.x{}</style>"#));
        assert!(page.contains(r#"<div class="fcw-unread">3</div>"#));
        assert!(page.contains(r#"class="fcw-widget open""#));
        assert!(page.contains("hello</div></div></div>"));
    }
}
