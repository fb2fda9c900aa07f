use crate::dom::{Document, Element};

pub const CONTAINER_ID: &str = "password-table-container";
pub const TRIGGER_ID: &str = "load-passwords-button";
pub const DEFAULT_TITLE: &str = "Password Vault";

/// Element ids the controller looks up once the page has loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageBindings {
    pub container_id: String,
    pub trigger_id: String,
}

impl Default for PageBindings {
    fn default() -> Self {
        Self {
            container_id: CONTAINER_ID.to_string(),
            trigger_id: TRIGGER_ID.to_string(),
        }
    }
}

/// The page shell: a heading, the load button and the empty table container.
pub fn build_password_page(title: &str, bindings: &PageBindings) -> Document {
    let head = Element::new("head")
        .with_child(Element::new("meta").with_attribute("charset", "utf-8"))
        .with_child(Element::new("title").with_text(title));

    let body = Element::new("body")
        .with_child(Element::new("h1").with_text(title))
        .with_child(
            Element::new("button")
                .with_id(&bindings.trigger_id)
                .with_attribute("type", "button")
                .with_text("Load passwords"),
        )
        .with_child(Element::new("div").with_id(&bindings.container_id));

    Document::new(
        Element::new("html")
            .with_attribute("lang", "en")
            .with_child(head)
            .with_child(body),
    )
}
