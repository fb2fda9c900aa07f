use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub page_url: Option<String>,
    pub title: Option<String>,
    pub container_id: Option<String>,
    pub trigger_id: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub header: Option<String>,
    pub fail_on_error: Option<bool>,
    pub no_color: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(alias = "static_content_path")]
    pub content_root: Option<String>,
    #[serde(alias = "vault")]
    pub vault_path: Option<String>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".vaultview").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(ConfigFile::default()),
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# vaultview config
#
# Location (default):
#   ~/.vaultview/config.yml

# Client (vaultview load)
# URL the page is loaded from; api/password is resolved against it.
# page_url: http://127.0.0.1:7878/
# title: Password Vault
# container_id: password-table-container
# trigger_id: load-passwords-button

# Output (optional, stdout when unset)
# output: ./passwords.html
# output_format: html

# HTTP (optional)
# timeout: 10
# proxy: http://127.0.0.1:8080
# header: "Key: Value"

# Report load failures instead of leaving the page unchanged.
fail_on_error: false

# Server (vaultview serve)
host: 127.0.0.1
port: 7878
content_root: ./www
vault_path: ./data/vault

# Output styling
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
