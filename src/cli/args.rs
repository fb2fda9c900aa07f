use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vaultview",
    version,
    about = "load and render password records from a vault backend",
    long_about = "vaultview renders the password list served at api/password as a table, and can run the backend that serves it.\n\nExamples:\n  vaultview serve --port 7878 --content-root ./www --vault ./data/vault\n  vaultview load -u http://127.0.0.1:7878/ -o passwords.html\n  vaultview load -u http://127.0.0.1:7878/ --format text\n\nTip: Use --config to persist settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.vaultview/config.yml when present)."
    )]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the page, click the load button once and write the result.
    Load(LoadArgs),
    /// Serve api/password from the vault file plus static content.
    Serve(ServeArgs),
    /// Write a commented default config file.
    InitConfig,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "Input",
        help = "URL the page is loaded from; api/password is resolved against it."
    )]
    pub url: Option<String>,

    #[arg(
        long = "ttl",
        visible_alias = "title",
        value_name = "TEXT",
        help_heading = "Page",
        help = "Page title and heading."
    )]
    pub title: Option<String>,

    #[arg(
        long = "cid",
        visible_alias = "container-id",
        value_name = "ID",
        help_heading = "Page",
        help = "Id of the element the table is rendered into."
    )]
    pub container_id: Option<String>,

    #[arg(
        long = "tid",
        visible_alias = "trigger-id",
        value_name = "ID",
        help_heading = "Page",
        help = "Id of the button that starts the load."
    )]
    pub trigger_id: Option<String>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the page to a file instead of stdout."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_aliases = ["output-format", "format"],
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (html or text)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds (no timeout when unset)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'H',
        long = "hdr",
        visible_alias = "header",
        value_name = "HEADER",
        help_heading = "HTTP",
        help = "Add a header to the request (format: 'Key: Value')."
    )]
    pub header: Option<String>,

    #[arg(
        short = 'e',
        long = "foe",
        visible_alias = "fail-on-error",
        help_heading = "Output",
        help = "Exit with an error when the load fails instead of writing the unchanged page."
    )]
    pub fail_on_error: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    #[arg(
        long = "hst",
        visible_alias = "host",
        value_name = "HOST",
        help_heading = "Server",
        help = "Address to bind (default 127.0.0.1)."
    )]
    pub host: Option<String>,

    #[arg(
        short = 'P',
        long = "prt",
        visible_alias = "port",
        value_name = "PORT",
        help_heading = "Server",
        help = "Port to bind (default 7878)."
    )]
    pub port: Option<u16>,

    #[arg(
        short = 'r',
        long = "cr",
        visible_alias = "content-root",
        value_name = "DIR",
        help_heading = "Server",
        help = "Directory static files are served from (default ./www)."
    )]
    pub content_root: Option<String>,

    #[arg(
        long = "vlt",
        visible_alias = "vault",
        value_name = "FILE",
        help_heading = "Server",
        help = "Vault file of id,service_name,password_text lines (default ./data/vault)."
    )]
    pub vault: Option<String>,
}
