//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, CREDENTIALS_ENV};
use crate::client::Client;
use crate::config::ClientConfig;
use crate::engine::PushOptions;
use crate::error::{Error, Result, ResultExt};
use crate::types::{JsonValue, Record, Value};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let client = self.build_client()?;

        match &self.cli.command {
            Commands::Login => self.login(&client).await,
            Commands::Query { sql, params } => self.query(&client, sql, params).await,
            Commands::Push {
                table,
                file,
                replace,
                no_create,
                dedupe_keys,
            } => {
                let mut options = PushOptions::new();
                if *replace {
                    options = options.replace();
                }
                if *no_create {
                    options = options.no_create();
                }
                if !dedupe_keys.is_empty() {
                    options = options.dedupe_on(dedupe_keys.iter().cloned());
                }
                self.push(&client, table, file, &options).await
            }
        }
    }

    /// Load configuration from file and environment
    fn load_config(&self) -> Result<ClientConfig> {
        let config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };
        let mut config = config.with_env_overrides();
        if self.cli.quiet {
            config.quiet = true;
        }
        Ok(config)
    }

    /// Credentials from the flag, falling back to the environment
    fn credentials(&self) -> Result<String> {
        if let Some(token) = &self.cli.token {
            return Ok(token.clone());
        }
        std::env::var(CREDENTIALS_ENV).map_err(|_| {
            Error::config(format!(
                "Credentials not specified (use --token or set {CREDENTIALS_ENV})"
            ))
        })
    }

    fn build_client(&self) -> Result<Client> {
        Client::with_config(&self.credentials()?, self.load_config()?)
    }

    /// Verify credentials
    async fn login(&self, client: &Client) -> Result<()> {
        client.login().await?;
        self.output_message(&json!({
            "type": "LOGIN",
            "status": "SUCCEEDED"
        }));
        Ok(())
    }

    /// Run SQL and print each row
    async fn query(&self, client: &Client, sql: &str, raw_params: &[String]) -> Result<()> {
        let params: Vec<Value> = raw_params.iter().map(|p| parse_param(p)).collect();
        let records = client.execute(sql, &params).await?;
        for record in &records {
            self.output_message(&record.to_json());
        }
        Ok(())
    }

    /// Push a file into a table
    async fn push(
        &self,
        client: &Client,
        table: &str,
        file: &Path,
        options: &PushOptions,
    ) -> Result<()> {
        let content = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let records = parse_records(&content)?;

        let start = Instant::now();
        let summary = client.push_with_summary(table, &records, options).await?;

        self.output_message(&json!({
            "type": "PUSH",
            "table": summary.table.to_string(),
            "rows": summary.rows,
            "bytes": summary.bytes,
            "mode": summary.mode.to_string(),
            "duration_ms": start.elapsed().as_millis() as u64,
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Parse a `--param` argument
///
/// Valid JSON is taken as JSON; anything else is passed as text.
pub fn parse_param(raw: &str) -> Value {
    serde_json::from_str::<JsonValue>(raw)
        .map_or_else(|_| Value::Text(raw.to_string()), |v| Value::from_json(&v))
}

/// Parse a JSON array of objects or JSON lines into records
pub fn parse_records(content: &str) -> Result<Vec<Record>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<JsonValue> = serde_json::from_str(trimmed)?;
        return values.iter().map(Record::from_json).collect();
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let value: JsonValue = serde_json::from_str(line)
                .map_err(|e| Error::validation(format!("line {}: {e}", i + 1)))?;
            Record::from_json(&value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_records_array() {
        let records = parse_records(r#"[{"id": 1, "name": "Alice"}, {"id": 2, "name": null}]"#)
            .unwrap();
        assert_eq!(
            records,
            vec![
                Record::new().with("id", 1).with("name", "Alice"),
                Record::new().with("id", 2).with("name", Value::Null),
            ]
        );
    }

    #[test]
    fn test_parse_records_lines() {
        let content = "{\"id\": 1}\n\n{\"id\": 2}\n";
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_parse_records_reports_line() {
        let err = parse_records("{\"id\": 1}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_parse_records_rejects_scalars() {
        assert!(parse_records("[1, 2]").unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("42"), Value::Int(42));
        assert_eq!(parse_param("1.5"), Value::Float(1.5));
        assert_eq!(parse_param("true"), Value::Bool(true));
        assert_eq!(parse_param("\"x\""), Value::from("x"));
        assert_eq!(parse_param("Alice"), Value::from("Alice"));
    }

    #[test]
    fn test_cli_push_arguments() {
        let cli = Cli::try_parse_from([
            "duckpush",
            "--token",
            "a:b:c",
            "push",
            "db.s.t",
            "rows.json",
            "--replace",
            "--dedupe-key",
            "id",
            "--dedupe-key",
            "tenant",
        ])
        .unwrap();

        assert_eq!(cli.token.as_deref(), Some("a:b:c"));
        match cli.command {
            Commands::Push {
                table,
                replace,
                no_create,
                dedupe_keys,
                ..
            } => {
                assert_eq!(table, "db.s.t");
                assert!(replace);
                assert!(!no_create);
                assert_eq!(dedupe_keys, vec!["id", "tenant"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_query_params() {
        let cli =
            Cli::try_parse_from(["duckpush", "query", "SELECT $1", "-p", "1", "--param", "x"])
                .unwrap();
        match cli.command {
            Commands::Query { sql, params } => {
                assert_eq!(sql, "SELECT $1");
                assert_eq!(params, vec!["1", "x"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
