use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{CliArgs, Command, LoadArgs, ServeArgs};
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::controller::Controller;
use crate::dom::Document;
use crate::fetch::{ClientOptions, HttpFetcher};
use crate::output::{self, OutputFormat};
use crate::page::{build_password_page, PageBindings, DEFAULT_TITLE};
use crate::render::table_rows;
use crate::server::{self, ServerSettings};
use crate::storage::DEFAULT_VAULT_PATH;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7878;
const DEFAULT_CONTENT_ROOT: &str = "./www";

fn print_banner() {
    eprintln!(
        "{} {}",
        "vaultview".bold().white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bold().blue()
    );
    eprintln!();
}

fn status_line(label: &str, message: &str) {
    let tag = match label {
        "WRN" => label.bold().yellow(),
        _ => label.bold().green(),
    };
    eprintln!("{}{}{} {}", "[".bold().white(), tag, "]".bold().white(), message);
}

fn format_kv_line(label: &str, value: &str) {
    eprintln!(":: {:<12}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn init_tracing(verbose: u8, no_color: bool) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Clone, Debug)]
struct LoadConfig {
    page_url: String,
    title: String,
    bindings: PageBindings,
    output: Option<String>,
    output_format: OutputFormat,
    client: ClientOptions,
    fail_on_error: bool,
}

#[derive(Clone, Debug)]
enum Action {
    Load(LoadConfig),
    Serve(ServerSettings),
    InitConfig(PathBuf),
}

#[derive(Clone, Debug)]
struct RunConfig {
    verbose: u8,
    no_color: bool,
    action: Action,
}

fn build_load_config(args: LoadArgs, cfg: &ConfigFile) -> Result<LoadConfig, String> {
    let page_url = args
        .url
        .or_else(|| cfg.page_url.clone())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            "no page URL provided (use --url or page_url in the config file)".to_string()
        })?;

    let defaults = PageBindings::default();
    let bindings = PageBindings {
        container_id: args
            .container_id
            .or_else(|| cfg.container_id.clone())
            .unwrap_or(defaults.container_id),
        trigger_id: args
            .trigger_id
            .or_else(|| cfg.trigger_id.clone())
            .unwrap_or(defaults.trigger_id),
    };

    let output = args.output.or_else(|| cfg.output.clone());
    let output_format = match args.output_format.or_else(|| cfg.output_format.clone()) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected html or text"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Html),
    };

    let timeout = args.timeout.or(cfg.timeout);
    if timeout == Some(0) {
        return Err("invalid timeout, expected positive integer".to_string());
    }

    Ok(LoadConfig {
        page_url: page_url.trim().to_string(),
        title: args
            .title
            .or_else(|| cfg.title.clone())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        bindings,
        output,
        output_format,
        client: ClientOptions {
            timeout: timeout.map(Duration::from_secs),
            proxy: args.proxy.or_else(|| cfg.proxy.clone()),
            header: args.header.or_else(|| cfg.header.clone()),
        },
        fail_on_error: args.fail_on_error || cfg.fail_on_error.unwrap_or(false),
    })
}

fn build_server_settings(args: ServeArgs, cfg: &ConfigFile) -> Result<ServerSettings, String> {
    let port = args.port.or(cfg.port).unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err("invalid port, expected 1-65535".to_string());
    }
    let content_root = args
        .content_root
        .or_else(|| cfg.content_root.clone())
        .unwrap_or_else(|| DEFAULT_CONTENT_ROOT.to_string());
    let vault_path = args
        .vault
        .or_else(|| cfg.vault_path.clone())
        .unwrap_or_else(|| DEFAULT_VAULT_PATH.to_string());
    Ok(ServerSettings {
        host: args
            .host
            .or_else(|| cfg.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
        content_root: config::expand_tilde(&content_root),
        vault_path: config::expand_tilde(&vault_path),
    })
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let action = match args.command {
        Command::Load(load) => Action::Load(build_load_config(load, &cfg)?),
        Command::Serve(serve) => Action::Serve(build_server_settings(serve, &cfg)?),
        Command::InitConfig => {
            let path = match args.config.as_deref() {
                Some(p) => config::expand_tilde(p),
                None => config::default_config_path()
                    .ok_or_else(|| "cannot locate home directory, pass --config".to_string())?,
            };
            Action::InitConfig(path)
        }
    };

    Ok(RunConfig {
        verbose: args.verbose,
        no_color,
        action,
    })
}

fn loading_spinner(url: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("loading passwords from {url}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn rendered_row_count(document: &Document, container_id: &str) -> Option<usize> {
    let container = document.get_element_by_id(container_id)?;
    let table = container.child_elements().find(|e| e.tag() == "table")?;
    Some(table_rows(table).len().saturating_sub(1))
}

async fn run_load(load: LoadConfig) -> Result<(), String> {
    let now = Instant::now();

    format_kv_line("Page", &load.page_url);
    format_kv_line("Container", &load.bindings.container_id);
    format_kv_line("Trigger", &load.bindings.trigger_id);
    format_kv_line("Output", load.output.as_deref().unwrap_or("stdout"));
    format_kv_line("Fail on error", format_bool(load.fail_on_error));
    eprintln!();

    let fetcher = HttpFetcher::new(&load.page_url, &load.client).map_err(|e| e.to_string())?;
    let document = build_password_page(&load.title, &load.bindings).into_shared();
    let controller = Controller::bind(document, fetcher, load.bindings.clone())
        .await
        .map_err(|e| e.to_string())?;

    let pb = loading_spinner(&load.page_url);
    let outcome = if load.fail_on_error {
        controller.load().await.map(|_| ())
    } else {
        controller.dispatch_click(&load.bindings.trigger_id).await;
        Ok(())
    };
    pb.finish_and_clear();
    outcome.map_err(|e| format!("failed to load passwords: {e}"))?;

    let document = controller.document().lock().await;
    match rendered_row_count(&document, &load.bindings.container_id) {
        Some(rows) => status_line("INF", &format!("rendered {rows} password rows")),
        None => status_line("WRN", "no table rendered, the page is unchanged"),
    }
    let rendered = output::render(&document, &load.bindings.container_id, load.output_format);
    drop(document);

    match load.output.as_deref() {
        Some(path) => {
            let mut outfile = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(config::expand_tilde(path))
                .await
                .map_err(|e| format!("failed to open output file: {e}"))?;
            outfile
                .write_all(&rendered)
                .await
                .map_err(|_| "failed to write output file".to_string())?;
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&rendered)
                .await
                .map_err(|e| format!("failed to write to stdout: {e}"))?;
            stdout
                .flush()
                .await
                .map_err(|e| format!("failed to write to stdout: {e}"))?;
        }
    }

    eprintln!();
    eprintln!(":: Completed :: load took {}ms ::", now.elapsed().as_millis());
    Ok(())
}

async fn run_serve(settings: ServerSettings) -> Result<(), String> {
    format_kv_line("Address", &format!("{}:{}", settings.host, settings.port));
    format_kv_line("Content root", &settings.content_root.display().to_string());
    format_kv_line("Vault", &settings.vault_path.display().to_string());
    eprintln!();

    server::start(settings).await.map_err(|e| e.to_string())
}

fn run_init_config(path: PathBuf) -> Result<(), String> {
    if config::ensure_default_config_file(&path)? {
        status_line("INF", &format!("wrote default config to {}", path.display()));
    } else {
        status_line("WRN", &format!("config already exists at {}", path.display()));
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    match run.action {
        Action::Load(load) => run_load(load).await,
        Action::Serve(settings) => run_serve(settings).await,
        Action::InitConfig(path) => run_init_config(path),
    }
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_ref() {
        Some(path) if !matches!(args.command, Command::InitConfig) => {
            config::load_config(&config::expand_tilde(path), false)?
        }
        Some(_) => ConfigFile::default(),
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    if run.no_color {
        colored::control::set_override(false);
    }
    init_tracing(run.verbose, run.no_color);
    print_banner();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
