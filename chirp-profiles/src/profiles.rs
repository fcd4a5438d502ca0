use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

use chirp_types::CreateUserRequest;

/// One profile in an import file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Published right after the account is created
    #[serde(default)]
    pub first_post: Option<String>,
}

impl ProfileEntry {
    /// Signup body for this entry; a missing username becomes a random UUID
    pub fn to_request(&self) -> CreateUserRequest {
        CreateUserRequest {
            name: self.name.clone(),
            username: self
                .username
                .clone()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            bio: self.bio.clone(),
            ..Default::default()
        }
    }
}

pub fn parse_entries(json: &str) -> Result<Vec<ProfileEntry>> {
    serde_json::from_str(json).context("Import file must be a JSON array of profiles")
}

pub fn load_entries(path: &Path) -> Result<Vec<ProfileEntry>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_entries(&json)
}

/// Mime type inferred from a picture's file extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Read a picture from disk as `(base64, mime type)`
pub fn encode_picture(path: &Path) -> Result<(String, String)> {
    let mime_type = mime_for_path(path)
        .with_context(|| format!("Unsupported picture type: {}", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok((
        general_purpose::STANDARD.encode(bytes),
        mime_type.to_string(),
    ))
}
