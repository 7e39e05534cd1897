#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use time::Date;
use time::macros::format_description;

use crate::context::CliError;

pub fn read_value(val: Option<String>, file: Option<PathBuf>) -> Result<String, CliError> {
    if let Some(path) = file {
        fs::read_to_string(&path).map_err(|source| input_error(&path, source))
    } else if let Some(v) = val {
        Ok(v)
    } else {
        Err(CliError::InvalidInput("value required".into()))
    }
}

pub fn read_bytes(path: &Path) -> Result<Bytes, CliError> {
    fs::read(path)
        .map(Bytes::from)
        .map_err(|source| input_error(path, source))
}

/// Secrets come from a file or the environment, never from a flag.
pub fn read_secret(file: Option<PathBuf>, env: Option<String>) -> Result<String, CliError> {
    if let Some(path) = file {
        let data = fs::read_to_string(&path).map_err(|source| input_error(&path, source))?;
        return Ok(data.trim_end_matches(['\r', '\n']).to_string());
    }
    env.ok_or_else(|| {
        CliError::InvalidInput(
            "password is required (use --password-file or FEELSLAP_PASSWORD)".into(),
        )
    })
}

pub fn parse_date(value: &str) -> Result<Date, CliError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| CliError::InvalidInput(format!("expected YYYY-MM-DD: {e}")))
}

fn input_error(path: &Path, source: std::io::Error) -> CliError {
    CliError::InputFile {
        path: path.display().to_string(),
        source,
    }
}
