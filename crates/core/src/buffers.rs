use serde::{Deserialize, Serialize};
use thiserror::Error;

use annopad_project::tree::{NodeKind, NodeSource, TreeNode};

/// 實體化緩衝區時可能發生的錯誤。 / Errors raised while materializing a buffer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("cannot open {0}: no readable source")]
    NoSource(String),
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },
}

/// 已開啟供編輯的檔案。 / A file materialized for editing.
///
/// `source` is a non-owning clone of the tree node's source; a buffer
/// restored from persisted state carries `NodeSource::None`.
#[derive(Debug, Clone)]
pub struct OpenBuffer {
    pub path: String,
    pub name: String,
    pub content: String,
    pub source: NodeSource,
}

/// Serializable slice of a buffer persisted across sessions. Source handles
/// are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub path: String,
    pub name: String,
    pub content: String,
}

/// Result of an `open` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    /// A new buffer was materialized from its source.
    Created,
    /// The path was already open; it was only activated, with no re-read.
    Activated,
}

/// Outcome of a `close` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
    pub removed: bool,
    pub was_active: bool,
    pub next_active: Option<String>,
}

/// 依開啟順序排列的緩衝區集合，每個路徑至多一個。 / Append-ordered buffer set, at most one per path.
#[derive(Debug, Default)]
pub struct OpenBuffers {
    buffers: Vec<OpenBuffer>,
    active: Option<String>,
}

impl OpenBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the set from persisted snapshots. Restored buffers have no
    /// live source; an active path naming no buffer is dropped.
    pub fn restore(snapshots: Vec<BufferSnapshot>, active: Option<String>) -> Self {
        let buffers: Vec<OpenBuffer> = snapshots
            .into_iter()
            .map(|snapshot| OpenBuffer {
                path: snapshot.path,
                name: snapshot.name,
                content: snapshot.content,
                source: NodeSource::None,
            })
            .collect();
        let active = active.filter(|path| buffers.iter().any(|buffer| &buffer.path == path));
        Self { buffers, active }
    }

    /// Materializes a buffer for the node, or just activates the existing
    /// one. In-memory edits win over the backing source, so an already open
    /// path is never re-read.  
    /// 為節點實體化緩衝區，或僅啟用既有緩衝區；記憶體中的編輯優先於後端來源，已開啟的路徑不會重新讀取。
    pub async fn open(&mut self, node: &TreeNode) -> Result<Opened, BufferError> {
        if self.buffers.iter().any(|buffer| buffer.path == node.path) {
            self.active = Some(node.path.clone());
            return Ok(Opened::Activated);
        }
        if node.kind == NodeKind::Folder || node.source.is_none() {
            return Err(BufferError::NoSource(node.path.clone()));
        }
        let content = node
            .source
            .read_text()
            .await
            .map_err(|err| BufferError::Read {
                path: node.path.clone(),
                reason: err.to_string(),
            })?;
        self.buffers.push(OpenBuffer {
            path: node.path.clone(),
            name: node.name.clone(),
            content,
            source: node.source.clone(),
        });
        self.active = Some(node.path.clone());
        Ok(Opened::Created)
    }

    /// Removes a buffer. When the active one goes, activation falls to the
    /// highest-index survivor in open order, not the display neighbour.  
    /// 移除緩衝區；若移除的是使用中者，改由開啟順序中索引最高的倖存者接任。
    pub fn close(&mut self, path: &str) -> CloseOutcome {
        let Some(index) = self.buffers.iter().position(|buffer| buffer.path == path) else {
            return CloseOutcome {
                removed: false,
                was_active: false,
                next_active: self.active.clone(),
            };
        };
        self.buffers.remove(index);
        let was_active = self.active.as_deref() == Some(path);
        if was_active {
            self.active = self.buffers.last().map(|buffer| buffer.path.clone());
        }
        CloseOutcome {
            removed: true,
            was_active,
            next_active: self.active.clone(),
        }
    }

    /// Replaces a buffer's content verbatim. The only mutation path, used
    /// both by direct edits and by annotation acceptance.
    pub fn set_content(&mut self, path: &str, text: impl Into<String>) -> bool {
        match self.buffers.iter_mut().find(|buffer| buffer.path == path) {
            Some(buffer) => {
                buffer.content = text.into();
                true
            }
            None => false,
        }
    }

    pub fn activate(&mut self, path: &str) -> bool {
        if self.buffers.iter().any(|buffer| buffer.path == path) {
            self.active = Some(path.to_string());
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<&OpenBuffer> {
        let path = self.active.as_deref()?;
        self.get(path)
    }

    pub fn active_path(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, path: &str) -> Option<&OpenBuffer> {
        self.buffers.iter().find(|buffer| buffer.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenBuffer> {
        self.buffers.iter()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn snapshot(&self) -> Vec<BufferSnapshot> {
        self.buffers
            .iter()
            .map(|buffer| BufferSnapshot {
                path: buffer.path.clone(),
                name: buffer.name.clone(),
                content: buffer.content.clone(),
            })
            .collect()
    }
}
