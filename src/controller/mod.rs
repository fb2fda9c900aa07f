use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::dom::SharedDocument;
use crate::fetch::{FetchError, Fetcher, ResponseBody};
use crate::model::{parse_body, records_from_value, DecodeError};
use crate::page::PageBindings;
use crate::render::populate_password_table;

/// Endpoint requested on every click, relative to the page URL.
pub const PASSWORD_ENDPOINT: &str = "api/password";

#[derive(Debug, Error)]
pub enum BindError {
    #[error("no element with id '{id}' to use as the table container")]
    MissingContainer { id: String },

    #[error("no element with id '{id}' to use as the load trigger")]
    MissingTrigger { id: String },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("table container '{id}' is no longer in the document")]
    MissingContainer { id: String },
}

#[derive(Clone, Debug)]
pub struct ClickEvent {
    target_id: String,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
            default_prevented: false,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Click handler bound to the page's load trigger.
///
/// Each click fetches the password list and replaces the container's content
/// with a freshly rendered table. Concurrent clicks are not coordinated: every
/// load that succeeds renders, so the one that resolves last wins.
pub struct Controller<F> {
    document: SharedDocument,
    fetcher: Arc<F>,
    bindings: PageBindings,
}

impl<F> Clone for Controller<F> {
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
            fetcher: Arc::clone(&self.fetcher),
            bindings: self.bindings.clone(),
        }
    }
}

impl<F: Fetcher> Controller<F> {
    /// Binds to a loaded page. Both the trigger and the container must exist.
    pub async fn bind(
        document: SharedDocument,
        fetcher: F,
        bindings: PageBindings,
    ) -> Result<Self, BindError> {
        {
            let doc = document.lock().await;
            if doc.get_element_by_id(&bindings.container_id).is_none() {
                return Err(BindError::MissingContainer {
                    id: bindings.container_id.clone(),
                });
            }
            if doc.get_element_by_id(&bindings.trigger_id).is_none() {
                return Err(BindError::MissingTrigger {
                    id: bindings.trigger_id.clone(),
                });
            }
        }
        Ok(Self {
            document,
            fetcher: Arc::new(fetcher),
            bindings,
        })
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn bindings(&self) -> &PageBindings {
        &self.bindings
    }

    /// Delivers a click to `target_id`. Clicks on anything other than the
    /// bound trigger are ignored.
    pub async fn dispatch_click(&self, target_id: &str) -> ClickEvent {
        let mut event = ClickEvent::new(target_id);
        if target_id == self.bindings.trigger_id {
            self.on_click(&mut event).await;
        }
        event
    }

    /// The click handler. Failures are swallowed and never reach the caller.
    pub async fn on_click(&self, event: &mut ClickEvent) {
        event.prevent_default();
        if let Err(error) = self.load().await {
            debug!(%error, "password load failed");
        }
    }

    /// Fetches, decodes and renders. Returns the number of data rows.
    ///
    /// A failed request or a body that is not JSON leaves the document
    /// untouched. The container is cleared before the parsed body is turned
    /// into rows, so a JSON body of the wrong shape (not an array, or an
    /// array holding `null`) leaves it empty.
    pub async fn load(&self) -> Result<usize, LoadError> {
        let response = self.fetcher.fetch(PASSWORD_ENDPOINT).await?;
        let status = response.status();
        if !(200..300).contains(&status) {
            debug!(status, "non-success status, decoding body anyway");
        }
        let body = response.bytes().await?;
        let parsed = parse_body(&body)?;

        let mut document = self.document.lock().await;
        let container = document
            .get_element_by_id_mut(&self.bindings.container_id)
            .ok_or_else(|| LoadError::MissingContainer {
                id: self.bindings.container_id.clone(),
            })?;
        container.set_text_content("");
        let records = records_from_value(parsed)?;
        populate_password_table(container, &records);
        debug!(rows = records.len(), "rendered password table");
        Ok(records.len())
    }
}
