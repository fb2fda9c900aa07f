use crate::cli::args::{CliArgs, Command};
use crate::output::OutputFormat;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    match &args.command {
        Command::Load(load) => {
            if let Some(raw) = load.output_format.as_deref() {
                OutputFormat::parse(raw).ok_or_else(|| {
                    format!("invalid --output-format '{raw}', expected html or text")
                })?;
            }
            if let Some(timeout) = load.timeout {
                if timeout == 0 {
                    return Err("invalid timeout, expected positive integer".to_string());
                }
            }
            if let Some(raw) = load.header.as_deref() {
                if !raw.contains(':') {
                    return Err(format!("invalid --header '{raw}', expected 'Key: Value'"));
                }
            }
            for (flag, value) in [
                ("--container-id", load.container_id.as_deref()),
                ("--trigger-id", load.trigger_id.as_deref()),
            ] {
                if let Some(id) = value {
                    if id.trim().is_empty() || id.chars().any(char::is_whitespace) {
                        return Err(format!(
                            "invalid {flag} '{id}', expected a non-empty id without spaces"
                        ));
                    }
                }
            }
        }
        Command::Serve(serve) => {
            if serve.port == Some(0) {
                return Err("invalid port, expected 1-65535".to_string());
            }
        }
        Command::InitConfig => {}
    }
    Ok(())
}
