use confstack_core::{Error, KeyProvenance, LogicalKey, ResolvedConfig, Result};
use serde::Serialize;

use crate::cli::OutputFormat;

pub const OUTPUT_SCHEMA: &str = "confstack-cli/output/v1";

pub struct Renderer {
    output_format: OutputFormat,
}

impl Renderer {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }

    pub fn render_config(&self, config: &ResolvedConfig) -> Result<()> {
        match self.output_format {
            OutputFormat::Text => println!("{}", serde_json::to_string_pretty(config.data())?),
            OutputFormat::Json => print_json_envelope(
                "resolve",
                &ResolveData {
                    provider: config.provider(),
                    config: config.data(),
                },
            )?,
        }
        Ok(())
    }

    pub fn render_provenance(&self, report: &[KeyProvenance]) -> Result<()> {
        match self.output_format {
            OutputFormat::Text => {
                for line in provenance_lines(report) {
                    println!("{line}");
                }
            }
            OutputFormat::Json => print_json_envelope("explain", &report)?,
        }
        Ok(())
    }

    pub fn render_keys(&self, keys: &[LogicalKey]) -> Result<()> {
        match self.output_format {
            OutputFormat::Text => {
                for line in key_lines(keys) {
                    println!("{line}");
                }
            }
            OutputFormat::Json => print_json_envelope("keys", &keys)?,
        }
        Ok(())
    }

    pub fn render_providers(&self, providers: &[String]) -> Result<()> {
        match self.output_format {
            OutputFormat::Text => {
                for provider in providers {
                    println!("{provider}");
                }
            }
            OutputFormat::Json => print_json_envelope("providers", &providers)?,
        }
        Ok(())
    }

    pub fn render_error(&self, command: &str, error: &Error) -> Result<()> {
        let envelope = error_envelope(command, error);
        println!("{}", serde_json::to_string(&envelope)?);
        Ok(())
    }
}

fn provenance_lines(report: &[KeyProvenance]) -> Vec<String> {
    report
        .iter()
        .map(|entry| {
            format!(
                "{} <- {}",
                entry.key.key,
                entry.supplied_by.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

fn key_lines(keys: &[LogicalKey]) -> Vec<String> {
    let width = keys.iter().map(|key| key.key.len()).max().unwrap_or(0);
    keys.iter()
        .map(|key| {
            let kind = if key.is_container { "container" } else { "leaf" };
            format!("{:<width$}  {}  {kind}", key.key, key.dotted_path())
        })
        .collect()
}

fn print_json_envelope<T: Serialize>(command: &str, data: &T) -> Result<()> {
    let envelope = CliJsonEnvelope {
        schema: OUTPUT_SCHEMA,
        status: "ok",
        command,
        data,
    };
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

fn error_envelope<'a>(command: &'a str, error: &Error) -> CliJsonErrorEnvelope<'a> {
    CliJsonErrorEnvelope {
        schema: OUTPUT_SCHEMA,
        status: "error",
        command,
        error: CliJsonErrorPayload {
            code: error_code(error),
            message: error.to_string(),
            details: error_details(error),
        },
    }
}

pub fn error_code(error: &Error) -> &'static str {
    match error {
        Error::Config(_) => "config_error",
        Error::Schema(_) => "schema_error",
        Error::AdapterNotRegistered(_) => "adapter_not_registered",
        Error::Loader { .. } => "loader_error",
        Error::Source(_) => "source_error",
        Error::Validation(_) => "validation_error",
        Error::Io(_) => "io_error",
        Error::Json(_) => "json_error",
        Error::TomlParse(_) => "toml_parse_error",
    }
}

fn error_details(error: &Error) -> Option<serde_json::Value> {
    match error {
        Error::Validation(validation) => serde_json::to_value(&validation.issues).ok(),
        Error::Loader { loader, .. } => Some(serde_json::json!({ "loader": loader })),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct ResolveData<'a> {
    provider: &'a str,
    config: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
struct CliJsonEnvelope<'a, T: Serialize> {
    schema: &'a str,
    status: &'a str,
    command: &'a str,
    data: &'a T,
}

#[derive(Debug, Serialize)]
struct CliJsonErrorEnvelope<'a> {
    schema: &'a str,
    status: &'a str,
    command: &'a str,
    error: CliJsonErrorPayload,
}

#[derive(Debug, Serialize)]
struct CliJsonErrorPayload {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use confstack_core::schema::ValidationIssue;
    use confstack_core::{Error, KeyProvenance, LogicalKey, ValidationError};
    use serde_json::json;

    use super::{error_code, error_envelope, key_lines, provenance_lines};

    #[test]
    fn provenance_lines_mark_unsupplied_keys() {
        let report = vec![
            KeyProvenance {
                key: LogicalKey::leaf("DB_URL", &["db", "url"]),
                supplied_by: Some("env".to_owned()),
            },
            KeyProvenance {
                key: LogicalKey::leaf("PORT", &["port"]),
                supplied_by: None,
            },
        ];

        assert_eq!(provenance_lines(&report), vec!["DB_URL <- env", "PORT <- -"]);
    }

    #[test]
    fn key_lines_align_names() {
        let keys = vec![
            LogicalKey::container("DB", &["db"]),
            LogicalKey::leaf("DB_URL", &["db", "url"]),
        ];

        assert_eq!(
            key_lines(&keys),
            vec!["DB      db  container", "DB_URL  db.url  leaf"]
        );
    }

    #[test]
    fn validation_error_envelope_carries_issues() {
        let error = Error::Validation(ValidationError {
            provider: "shorthand".to_owned(),
            issues: vec![ValidationIssue {
                path: "/port".to_owned(),
                message: "required field is missing".to_owned(),
            }],
        });

        let envelope = serde_json::to_value(error_envelope("resolve", &error)).expect("serializes");
        assert_eq!(
            envelope,
            json!({
                "schema": "confstack-cli/output/v1",
                "status": "error",
                "command": "resolve",
                "error": {
                    "code": "validation_error",
                    "message": "shorthand validation failed: /port: required field is missing",
                    "details": [{"path": "/port", "message": "required field is missing"}]
                }
            })
        );
    }

    #[test]
    fn loader_errors_have_stable_codes() {
        let error = Error::Loader {
            loader: "env".to_owned(),
            source: Box::new(Error::Source("boom".to_owned())),
        };
        assert_eq!(error_code(&error), "loader_error");
        assert_eq!(error_code(&Error::AdapterNotRegistered("zod".to_owned())), "adapter_not_registered");
    }
}
