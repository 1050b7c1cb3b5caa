//! Input validation rules for names, projects, templates and chat messages.

use crate::error::CoreError;

/// Maximum length of names and emails.
pub const MAX_NAME_LEN: usize = 255;

/// Kubernetes namespaces are DNS-1123 labels.
pub const MAX_NAMESPACE_LEN: usize = 63;

/// Branch used when a template does not name one.
pub const DEFAULT_GIT_BRANCH: &str = "main";

/// Roles a chat message may carry.
pub const VALID_CHAT_ROLES: &[&str] = &["user", "assistant", "system"];

/// Maximum chat message length in bytes.
pub const MAX_CHAT_CONTENT_BYTES: usize = 65_536;

pub fn validate_name(field: &str, value: &str) -> Result<(), CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "{field} must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a DNS-1123 label: lowercase alphanumerics and `-`, starting and
/// ending with an alphanumeric, at most 63 characters.
pub fn validate_namespace(namespace: &str) -> Result<(), CoreError> {
    if namespace.is_empty() || namespace.len() > MAX_NAMESPACE_LEN {
        return Err(CoreError::Validation(format!(
            "Namespace must be between 1 and {MAX_NAMESPACE_LEN} characters"
        )));
    }
    let valid_chars = namespace
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let starts_ok = namespace.starts_with(|c: char| c.is_ascii_alphanumeric());
    let ends_ok = namespace.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !(valid_chars && starts_ok && ends_ok) {
        return Err(CoreError::Validation(
            "Namespace must be a lowercase DNS label (a-z, 0-9, '-')".to_string(),
        ));
    }
    Ok(())
}

/// Accept `https://`, `ssh://`, `file://` and scp-style `git@host:path` URLs.
pub fn validate_git_url(url: &str) -> Result<(), CoreError> {
    let url = url.trim();
    let accepted = ["https://", "ssh://", "file://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
        || (url.starts_with("git@") && url.contains(':'));

    if !accepted || url.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(
            "Git URL must use https://, ssh://, file:// or git@host:path".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_git_branch(branch: &str) -> Result<(), CoreError> {
    let invalid = branch.is_empty()
        || branch.starts_with('-')
        || branch.contains("..")
        || branch
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\'));
    if invalid {
        return Err(CoreError::Validation(format!(
            "'{branch}' is not a valid git branch name"
        )));
    }
    Ok(())
}

/// Normalise a repository sub-path: strip surrounding slashes, refuse
/// absolute paths and parent components. An empty result means the root.
pub fn normalize_git_path(path: &str) -> Result<String, CoreError> {
    let trimmed = path.trim();
    if trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(CoreError::Validation(
            "Git path must be relative to the repository root".to_string(),
        ));
    }

    let mut parts = Vec::new();
    for part in trimmed.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                return Err(CoreError::Validation(
                    "Git path must not contain '..'".to_string(),
                ))
            }
            p => parts.push(p),
        }
    }
    Ok(parts.join("/"))
}

pub fn validate_chat_role(role: &str) -> Result<(), CoreError> {
    if VALID_CHAT_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Chat role must be one of: {}",
            VALID_CHAT_ROLES.join(", ")
        )))
    }
}

pub fn validate_chat_content(content: &str) -> Result<(), CoreError> {
    if content.trim().is_empty() {
        return Err(CoreError::Validation(
            "Message content must not be empty".to_string(),
        ));
    }
    if content.len() > MAX_CHAT_CONTENT_BYTES {
        return Err(CoreError::Validation(format!(
            "Message content must not exceed {MAX_CHAT_CONTENT_BYTES} bytes"
        )));
    }
    Ok(())
}
