use log::debug;

use crate::pipeline::*;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JSValue;
use std::fs;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// The HTTP client shared by every request of the process.
pub fn http_client() -> PipelineResult<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context(HttpClientSnafu {})
    })
}

/// Reads the JSON body of a response, failing on HTTP error statuses.
pub fn response_json(resp: reqwest::blocking::Response, url: &str) -> PipelineResult<JSValue> {
    let resp = resp
        .error_for_status()
        .context(HttpSnafu { url: url.to_string() })?;
    resp.json::<JSValue>()
        .context(HttpSnafu { url: url.to_string() })
}

pub fn read_text(path: &Path) -> PipelineResult<String> {
    fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.display().to_string(),
    })
}

/// Writes the file, creating the parent directories.
pub fn write_text(path: &Path, contents: &str) -> PipelineResult<()> {
    let p = path.display().to_string();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(WritingFileSnafu { path: p.clone() })?;
    }
    fs::write(path, contents).context(WritingFileSnafu { path: p })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> PipelineResult<T> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu {
        path: path.display().to_string(),
    })
}

/// Writes pretty-printed UTF-8 JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    let contents = serde_json::to_string_pretty(value).context(ParsingJsonSnafu {
        path: path.display().to_string(),
    })?;
    debug!("write_json: {:?} ({} bytes)", path, contents.len());
    write_text(path, &contents)
}

/// Fails with a pointer to the command producing the file when it is absent.
pub fn require_file(path: &Path, what: &str, command: &str) -> PipelineResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        MissingArtifactSnafu {
            what,
            path: path.display().to_string(),
            command,
        }
        .fail()
    }
}

/// A string field that may be encoded as a JSON string or number.
pub fn js_str(x: &JSValue) -> Option<String> {
    match x {
        JSValue::String(s) => Some(s.clone()),
        JSValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An unsigned integer encoded as a JSON number or as a string.
pub fn read_js_u32(x: &JSValue) -> Option<u32> {
    match x {
        JSValue::Number(n) => n.as_u64().and_then(|x| u32::try_from(x).ok()),
        JSValue::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn js_numbers_and_strings() {
        assert_eq!(read_js_u32(&json!(3)), Some(3));
        assert_eq!(read_js_u32(&json!("2")), Some(2));
        assert_eq!(read_js_u32(&json!(" 10 ")), Some(10));
        assert_eq!(read_js_u32(&json!("x")), None);
        assert_eq!(read_js_u32(&json!(null)), None);
        assert_eq!(read_js_u32(&json!(4294967295u64)), Some(u32::MAX));
        assert_eq!(read_js_u32(&json!(4294967296u64)), None);
        assert_eq!(read_js_u32(&json!(-1)), None);
        assert_eq!(js_str(&json!(367)), Some("367".to_string()));
        assert_eq!(js_str(&json!("367")), Some("367".to_string()));
        assert_eq!(js_str(&json!({})), None);
    }

    #[test]
    fn json_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/value.json");
        write_json(&path, &json!({"name": "Pedro Porro", "rating": 7})).unwrap();
        let back: JSValue = read_json(&path).unwrap();
        assert_eq!(back["name"], json!("Pedro Porro"));
        // Pretty printed.
        assert!(read_text(&path).unwrap().contains('\n'));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        match require_file(&path, "Results", "compile") {
            Err(e @ PipelineError::MissingArtifact { .. }) => {
                assert!(e.to_string().contains("Run 'compile' first"));
            }
            x => panic!("unexpected {:?}", x),
        }
        fs::write(&path, "{}").unwrap();
        assert!(require_file(&path, "Results", "compile").is_ok());
    }
}
