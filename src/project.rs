use serde::{Deserialize, Serialize};

/// One generated project file. The model returns the complete file set on
/// every turn, so a `Vec<FileNode>` is always replaced wholesale, never
/// patched in place.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileNode {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Code,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsiveMode {
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
    /// Rendered in the transcript but never serialized into requests.
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    /// Attached image as a base64 data-URI. The service client strips the
    /// prefix before sending.
    pub image: Option<String>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image: None,
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
            image: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Error,
            content: content.into(),
            image: None,
        }
    }
}
