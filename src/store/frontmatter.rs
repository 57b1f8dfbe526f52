/// YAML front matter in Markdown documents.
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{ContextEngineError, Result};

const DELIMITER: &str = "---";

/// Splits a `---` delimited YAML header from the Markdown body and
/// deserializes the header.
///
/// `path` is only used in error messages.
pub fn parse_front_matter<T: DeserializeOwned>(content: &str, path: &str) -> Result<(T, String)> {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = content.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => {}
        _ => {
            return Err(ContextEngineError::Parse {
                message: "document does not start with front matter".to_string(),
                path: path.to_string(),
            })
        }
    }

    let header_start = content.find('\n').map(|i| i + 1).unwrap_or(content.len());
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &content[header_start..offset];
            let body = &content[offset + line.len()..];
            let data = serde_yaml::from_str(yaml).map_err(|e| ContextEngineError::Parse {
                message: format!("invalid front matter: {e}"),
                path: path.to_string(),
            })?;
            return Ok((data, body.trim_start_matches(['\r', '\n']).to_string()));
        }
        offset += line.len();
    }

    Err(ContextEngineError::Parse {
        message: "unterminated front matter".to_string(),
        path: path.to_string(),
    })
}

/// Renders `data` as a YAML header followed by `body`.
pub fn render_front_matter<T: Serialize>(data: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(data)?;
    let mut out = format!("{DELIMITER}\n{yaml}");
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}
