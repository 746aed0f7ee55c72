use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("No such node: {0}")]
    NotFound(NodeId),
    #[error("Cannot delete root.")]
    RootDeletion,
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("Not a folder: {0}")]
    NotAFolder(String),
    #[error("Folder download is not supported.")]
    FolderDownloadUnsupported,
    #[error("No file selected for run.")]
    NoFileSelected,
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VfsError {
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound(_) => "VFS_NOT_FOUND",
            Self::RootDeletion => "VFS_ROOT_DELETION",
            Self::InvalidMove(_) => "VFS_INVALID_MOVE",
            Self::NotAFile(_) => "VFS_NOT_FILE",
            Self::NotAFolder(_) => "VFS_NOT_FOLDER",
            Self::FolderDownloadUnsupported => "VFS_FOLDER_DOWNLOAD",
            Self::NoFileSelected => "VFS_NO_FILE_SELECTED",
            Self::Persistence(_) => "VFS_PERSISTENCE_ERROR",
            Self::Io(_) => "VFS_IO_ERROR",
            Self::Json(_) => "VFS_JSON_ERROR",
        }
    }

    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        serde_json::json!({
            "vfsCode": self.code(),
            "message": self.to_string(),
        })
    }
}

/// Failures of the durable key-value slot holding the serialized tree.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corruption: {0}")]
    Corruption(String),
}
