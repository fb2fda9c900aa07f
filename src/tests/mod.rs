use std::collections::VecDeque;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

use crate::controller::{Controller, LoadError};
use crate::dom::{Element, SharedDocument};
use crate::fetch::{ClientOptions, FetchError, Fetcher, HttpFetcher, ResponseBody};
use crate::model::DecodeError;
use crate::page::{build_password_page, PageBindings, CONTAINER_ID, DEFAULT_TITLE, TRIGGER_ID};
use crate::render::{table_rows, HEADER_LABELS};
use crate::storage::VaultStore;

pub(crate) enum Scripted {
    Respond { status: u16, body: Vec<u8> },
    Gated {
        status: u16,
        body: Vec<u8>,
        gate: oneshot::Receiver<()>,
    },
    Fail,
}

impl Scripted {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Scripted::Respond {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    pub(crate) fn gated(body: &str) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Scripted::Gated {
                status: 200,
                body: body.as_bytes().to_vec(),
                gate: rx,
            },
            tx,
        )
    }
}

pub(crate) struct ScriptedResponse {
    status: u16,
    body: Vec<u8>,
}

#[async_trait]
impl ResponseBody for ScriptedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    async fn bytes(self) -> Result<Vec<u8>, FetchError> {
        Ok(self.body)
    }
}

/// Answers fetches from a script, in order. `Fail` and an exhausted script
/// fail with a refused connection.
pub(crate) struct ScriptedFetcher {
    script: Mutex<VecDeque<Scripted>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub(crate) fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requests)
    }
}

/// A loopback port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

async fn refused_request(path: &str) -> FetchError {
    let url = format!("http://127.0.0.1:{}/{path}", closed_port());
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client");
    let source = client
        .get(&url)
        .send()
        .await
        .expect_err("nothing listens on a closed port");
    FetchError::Request { url, source }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    type Response = ScriptedResponse;

    async fn fetch(&self, path: &str) -> Result<Self::Response, FetchError> {
        self.requests.lock().await.push(path.to_string());
        let next = self.script.lock().await.pop_front();
        match next {
            Some(Scripted::Respond { status, body }) => Ok(ScriptedResponse { status, body }),
            Some(Scripted::Gated { status, body, gate }) => {
                let _ = gate.await;
                Ok(ScriptedResponse { status, body })
            }
            Some(Scripted::Fail) | None => Err(refused_request(path).await),
        }
    }
}

fn temp_root(name: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = env::temp_dir().join(format!("vaultview_it_{name}_{suffix}"));
    std::fs::create_dir_all(&root).expect("temp root");
    root
}

async fn bound_page<F: Fetcher>(fetcher: F) -> Controller<F> {
    let page = build_password_page(DEFAULT_TITLE, &PageBindings::default()).into_shared();
    Controller::bind(page, fetcher, PageBindings::default())
        .await
        .expect("bind")
}

/// Rows of every table in the container, in child order.
async fn rendered_tables(document: &SharedDocument) -> Vec<Vec<Vec<String>>> {
    let doc = document.lock().await;
    let container = doc.get_element_by_id(CONTAINER_ID).expect("container");
    container
        .child_elements()
        .filter(|e| e.tag() == "table")
        .map(table_rows)
        .collect()
}

fn header() -> Vec<String> {
    HEADER_LABELS.iter().map(|s| s.to_string()).collect()
}

fn row(cells: [&str; 3]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn click_renders_fetched_records() {
    let body = r#"[
        {"id": 1, "service_name": "mail", "password_text": "hunter2"},
        {"id": 2, "service_name": "<b>bank</b>", "password_text": "a&b"}
    ]"#;
    let controller = bound_page(ScriptedFetcher::new(vec![Scripted::json(200, body)])).await;

    controller.dispatch_click(TRIGGER_ID).await;

    let tables = rendered_tables(controller.document()).await;
    assert_eq!(
        tables,
        vec![vec![
            header(),
            row(["1", "mail", "hunter2"]),
            row(["2", "<b>bank</b>", "a&b"]),
        ]]
    );
}

#[tokio::test]
async fn second_click_replaces_first_table() {
    let controller = bound_page(ScriptedFetcher::new(vec![
        Scripted::json(200, r#"[{"id": 1, "service_name": "old", "password_text": "x"}]"#),
        Scripted::json(
            200,
            r#"[{"id": 2, "service_name": "new", "password_text": "y"},
                {"id": 3, "service_name": "newer", "password_text": "z"}]"#,
        ),
    ]))
    .await;

    controller.dispatch_click(TRIGGER_ID).await;
    controller.dispatch_click(TRIGGER_ID).await;

    let tables = rendered_tables(controller.document()).await;
    assert_eq!(
        tables,
        vec![vec![
            header(),
            row(["2", "new", "y"]),
            row(["3", "newer", "z"]),
        ]]
    );
}

#[tokio::test]
async fn click_clears_unrelated_container_content() {
    let controller = bound_page(ScriptedFetcher::new(vec![Scripted::json(200, "[]")])).await;
    {
        let mut doc = controller.document().lock().await;
        let container = doc.get_element_by_id_mut(CONTAINER_ID).expect("container");
        container.append_child(Element::new("p").with_text("Click to load"));
    }

    controller.dispatch_click(TRIGGER_ID).await;

    let doc = controller.document().lock().await;
    let container = doc.get_element_by_id(CONTAINER_ID).expect("container");
    assert_eq!(container.children().len(), 1);
    assert_eq!(container.child_elements().next().map(|e| e.tag()), Some("table"));
}

#[tokio::test]
async fn empty_array_renders_header_only() {
    let controller = bound_page(ScriptedFetcher::new(vec![Scripted::json(200, "[]")])).await;
    controller.dispatch_click(TRIGGER_ID).await;
    assert_eq!(rendered_tables(controller.document()).await, vec![vec![header()]]);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_table() {
    let controller = bound_page(ScriptedFetcher::new(vec![
        Scripted::json(200, r#"[{"id": 1, "service_name": "keep", "password_text": "me"}]"#),
        Scripted::Fail,
    ]))
    .await;

    controller.dispatch_click(TRIGGER_ID).await;
    let before = controller.document().lock().await.clone();

    let event = controller.dispatch_click(TRIGGER_ID).await;
    assert!(event.default_prevented());
    assert_eq!(*controller.document().lock().await, before);
}

#[tokio::test]
async fn unparsable_body_keeps_previous_table() {
    let controller = bound_page(ScriptedFetcher::new(vec![
        Scripted::json(200, r#"[{"id": 1, "service_name": "keep", "password_text": "me"}]"#),
        Scripted::json(200, "<html>502 Bad Gateway</html>"),
    ]))
    .await;

    controller.dispatch_click(TRIGGER_ID).await;
    let before = controller.document().lock().await.clone();

    controller.dispatch_click(TRIGGER_ID).await;
    assert_eq!(*controller.document().lock().await, before);
}

async fn container_is_empty(document: &SharedDocument) -> bool {
    let doc = document.lock().await;
    doc.get_element_by_id(CONTAINER_ID)
        .expect("container")
        .children()
        .is_empty()
}

#[tokio::test]
async fn json_object_body_clears_previous_table() {
    let controller = bound_page(ScriptedFetcher::new(vec![
        Scripted::json(200, r#"[{"id": 1, "service_name": "keep", "password_text": "me"}]"#),
        Scripted::json(401, r#"{"error": "unauthorized"}"#),
    ]))
    .await;

    controller.dispatch_click(TRIGGER_ID).await;
    assert_eq!(rendered_tables(controller.document()).await.len(), 1);

    let event = controller.dispatch_click(TRIGGER_ID).await;
    assert!(event.default_prevented());
    assert!(container_is_empty(controller.document()).await);
}

#[tokio::test]
async fn json_scalar_bodies_clear_container() {
    for body in ["null", r#""str""#, "42"] {
        let controller = bound_page(ScriptedFetcher::new(vec![
            Scripted::json(200, r#"[{"id": 1, "service_name": "a", "password_text": "b"}]"#),
            Scripted::json(200, body),
        ]))
        .await;
        controller.dispatch_click(TRIGGER_ID).await;
        controller.dispatch_click(TRIGGER_ID).await;
        assert!(container_is_empty(controller.document()).await, "body {body}");
    }
}

#[tokio::test]
async fn null_record_clears_container_without_partial_table() {
    let controller = bound_page(ScriptedFetcher::new(vec![
        Scripted::json(200, r#"[{"id": 1, "service_name": "keep", "password_text": "me"}]"#),
        Scripted::json(200, r#"[{"id": 2, "service_name": "a", "password_text": "b"}, null]"#),
        Scripted::json(200, "[null]"),
    ]))
    .await;

    controller.dispatch_click(TRIGGER_ID).await;
    controller.dispatch_click(TRIGGER_ID).await;
    assert!(container_is_empty(controller.document()).await);

    let err = controller.load().await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::Decode(DecodeError::NullRecord { index: 0 })
    ));
}

#[tokio::test]
async fn cells_show_values_as_script_text() {
    let body = r#"[{"id": 1.0, "service_name": [1, 2], "password_text": {"a": 1}},
                   {"id": 1e3, "service_name": null, "password_text": false}]"#;
    let controller = bound_page(ScriptedFetcher::new(vec![Scripted::json(200, body)])).await;

    controller.dispatch_click(TRIGGER_ID).await;

    assert_eq!(
        rendered_tables(controller.document()).await,
        vec![vec![
            header(),
            row(["1", "1,2", "[object Object]"]),
            row(["1000", "", "false"]),
        ]]
    );
}

#[tokio::test]
async fn failure_on_fresh_page_leaves_container_empty() {
    let controller = bound_page(ScriptedFetcher::new(vec![Scripted::Fail])).await;
    controller.dispatch_click(TRIGGER_ID).await;
    assert!(container_is_empty(controller.document()).await);
}

async fn wait_for_first_cell(document: &SharedDocument, expected: &str) {
    loop {
        let tables = rendered_tables(document).await;
        if tables
            .first()
            .and_then(|rows| rows.get(1))
            .map(|r| r[0] == expected)
            .unwrap_or(false)
        {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn overlapping_clicks_last_response_wins() {
    let (first, release_first) =
        Scripted::gated(r#"[{"id": "first", "service_name": "a", "password_text": "1"}]"#);
    let (second, release_second) =
        Scripted::gated(r#"[{"id": "second", "service_name": "b", "password_text": "2"}]"#);
    let controller = bound_page(ScriptedFetcher::new(vec![first, second])).await;
    let document = Arc::clone(controller.document());

    // The second request resolves before the first one.
    let releaser = async {
        release_second.send(()).expect("second still waiting");
        wait_for_first_cell(&document, "second").await;
        release_first.send(()).expect("first still waiting");
    };
    futures::join!(
        controller.dispatch_click(TRIGGER_ID),
        controller.dispatch_click(TRIGGER_ID),
        releaser
    );

    let tables = rendered_tables(&document).await;
    assert_eq!(tables, vec![vec![header(), row(["first", "a", "1"])]]);
}

#[tokio::test]
async fn unreachable_backend_is_swallowed_by_click() {
    let fetcher = HttpFetcher::new(
        &format!("http://127.0.0.1:{}/", closed_port()),
        &ClientOptions::default(),
    )
    .expect("fetcher");
    let controller = bound_page(fetcher).await;

    controller.dispatch_click(TRIGGER_ID).await;
    assert!(rendered_tables(controller.document()).await.is_empty());

    let err = controller.load().await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::Fetch(FetchError::Request { .. })
    ));
}

async fn spawn_backend(root: &std::path::Path, vault_contents: &str) -> std::net::SocketAddr {
    let vault_path = root.join("data").join("vault");
    let vault = VaultStore::open(&vault_path).await.expect("vault");
    std::fs::write(&vault_path, vault_contents).expect("seed vault");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let content_root = root.join("www");
    tokio::spawn(async move {
        let _ = crate::server::serve_on(listener, vault, content_root).await;
    });
    addr
}

#[tokio::test]
async fn loads_table_from_running_backend() {
    let root = temp_root("e2e");
    let addr = spawn_backend(&root, "1,mail,hunter2\n2,wifi,a,b,c\n").await;

    let fetcher = HttpFetcher::new(&format!("http://{addr}/index.html"), &ClientOptions::default())
        .expect("fetcher");
    let controller = bound_page(fetcher).await;
    assert_eq!(controller.load().await.expect("load"), 2);

    let tables = rendered_tables(controller.document()).await;
    assert_eq!(
        tables,
        vec![vec![
            header(),
            row(["1", "mail", "hunter2"]),
            row(["2", "wifi", "a,b,c"]),
        ]]
    );

    std::fs::write(root.join("data").join("vault"), "3,git,token\n").expect("rewrite vault");
    controller.dispatch_click(TRIGGER_ID).await;
    let tables = rendered_tables(controller.document()).await;
    assert_eq!(tables, vec![vec![header(), row(["3", "git", "token"])]]);

    std::fs::remove_dir_all(root).expect("cleanup");
}

#[tokio::test]
async fn non_json_endpoint_leaves_page_unchanged() {
    let root = temp_root("nonjson");
    // A page under /static/ resolves api/password to /static/api/password,
    // which here is a plain static file.
    std::fs::create_dir_all(root.join("www").join("static").join("api")).expect("dirs");
    std::fs::write(
        root.join("www").join("static").join("api").join("password"),
        "not json at all",
    )
    .expect("static file");
    let addr = spawn_backend(&root, "").await;

    let fetcher = HttpFetcher::new(&format!("http://{addr}/static/"), &ClientOptions::default())
        .expect("fetcher");
    let controller = bound_page(fetcher).await;
    let before = controller.document().lock().await.clone();

    controller.dispatch_click(TRIGGER_ID).await;
    assert_eq!(*controller.document().lock().await, before);

    std::fs::remove_dir_all(root).expect("cleanup");
}
