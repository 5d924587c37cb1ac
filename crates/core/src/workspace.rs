//! Workspace facade driven by the presentation layer. Owns the virtual file
//! tree, the open-buffer set, and the annotation board; collaborators are
//! injected rather than reached through ambient state.
//! 由呈現層驅動的工作區門面；持有虛擬檔案樹、開啟中緩衝區與註解面板，外部協作者一律以注入方式提供。

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use annopad_project::ingest::{self, IngestError};
use annopad_project::path;
use annopad_project::source::{DropEntry, FallbackInput, FileFilter, FlatFile, Picker, PickerError};
use annopad_project::tree::{merge_loose_file, NodeSource, TreeNode, SOURCE_FILE_EXTENSIONS};

use crate::annotations::{
    splice_suggestion, AnnotationBoard, AnnotationError, ProviderError, SuggestionProvider,
};
use crate::buffers::{BufferError, BufferSnapshot, CloseOutcome, OpenBuffer, OpenBuffers, Opened};
use crate::store::{KeyValueStore, ACTIVE_BUFFER_KEY, OPEN_BUFFERS_KEY};

/// User-visible outcome of an import intent. A dismissed picker is a silent
/// no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported,
    Cancelled,
}

/// 工作區操作的錯誤彙整。 / Aggregated workspace operation errors.
///
/// None of these are fatal; the tree and buffers retain their prior state
/// whenever an operation fails.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("no buffer is active")]
    NoActiveBuffer,
    #[error("no tree node at {0}")]
    UnknownPath(String),
    #[error(transparent)]
    Generation(#[from] ProviderError),
    #[error(transparent)]
    GenerationBusy(#[from] AnnotationError),
    #[error("cannot save {path}: {reason}")]
    Save { path: String, reason: String },
}

fn source_filter() -> FileFilter {
    FileFilter::new("C / C++ source files", SOURCE_FILE_EXTENSIONS)
}

fn flat_file_node(flat: FlatFile) -> TreeNode {
    let name = path::leaf_name(&flat.relative_path).to_string();
    TreeNode::file(name.clone(), name, NodeSource::Transient(flat.blob))
}

/// Central state machine behind the editor shell.  
/// 編輯器外殼背後的核心狀態機。
pub struct Workspace {
    tree: Option<TreeNode>,
    buffers: OpenBuffers,
    annotations: AnnotationBoard,
    picker: Arc<dyn Picker>,
    fallback: Arc<dyn FallbackInput>,
    provider: Arc<dyn SuggestionProvider>,
    store: Arc<dyn KeyValueStore>,
}

impl Workspace {
    pub fn new(
        picker: Arc<dyn Picker>,
        fallback: Arc<dyn FallbackInput>,
        provider: Arc<dyn SuggestionProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            tree: None,
            buffers: OpenBuffers::new(),
            annotations: AnnotationBoard::new(),
            picker,
            fallback,
            provider,
            store,
        }
    }

    /// Restores the open-buffer snapshot and active path persisted by a
    /// previous session. Restored buffers carry no live source, so edits
    /// survive but re-reading requires a fresh import.  
    /// 還原前次工作階段保存的緩衝區快照與使用中路徑；還原的緩衝區沒有即時來源，須重新匯入才能再讀取。
    pub fn restore(&mut self) {
        let raw = match self.store.get(OPEN_BUFFERS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "failed to load persisted buffers");
                return;
            }
        };
        match serde_json::from_str::<Vec<BufferSnapshot>>(&raw) {
            Ok(snapshots) => {
                let active = match self.store.get(ACTIVE_BUFFER_KEY) {
                    Ok(active) => active,
                    Err(err) => {
                        warn!(error = %err, "failed to load persisted active path");
                        None
                    }
                };
                self.buffers = OpenBuffers::restore(snapshots, active);
            }
            Err(err) => warn!(error = %err, "discarding unreadable buffer snapshot"),
        }
    }

    pub fn tree(&self) -> Option<&TreeNode> {
        self.tree.as_ref()
    }

    pub fn buffers(&self) -> &OpenBuffers {
        &self.buffers
    }

    pub fn active_buffer(&self) -> Option<&OpenBuffer> {
        self.buffers.active()
    }

    pub fn annotations(&self) -> &AnnotationBoard {
        &self.annotations
    }

    /// Imports a whole folder, replacing the current tree. The capability
    /// picker runs first; when the capability is missing the legacy
    /// multi-file input takes over. A dismissal anywhere stops the whole
    /// flow silently.  
    /// 匯入整個資料夾並取代現有樹；優先使用能力選擇器，能力缺失時改用傳統多檔輸入，使用者取消則整體靜默結束。
    pub async fn import_folder(&mut self) -> Result<ImportOutcome, WorkspaceError> {
        match ingest::ingest_picked_directory(self.picker.as_ref()).await {
            Ok(root) => {
                self.tree = Some(root);
                Ok(ImportOutcome::Imported)
            }
            Err(IngestError::Aborted) => Ok(ImportOutcome::Cancelled),
            Err(IngestError::SourceUnavailable) => {
                debug!("falling back to legacy multi-file import");
                let files = match self.fallback.choose_directory_files().await {
                    Ok(files) => files,
                    Err(PickerError::Aborted) => return Ok(ImportOutcome::Cancelled),
                    Err(err) => return Err(WorkspaceError::Ingest(err.into())),
                };
                match ingest::tree_from_flat_files(files) {
                    Some(root) => {
                        self.tree = Some(root);
                        Ok(ImportOutcome::Imported)
                    }
                    None => Ok(ImportOutcome::Cancelled),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Imports a single loose file, merges it into the tree (synthesizing a
    /// root when none exists) and opens it immediately.  
    /// 匯入單一檔案並併入樹中（必要時合成根節點），隨即開啟該檔案。
    pub async fn import_file(&mut self) -> Result<ImportOutcome, WorkspaceError> {
        let filter = source_filter();
        let node = match ingest::ingest_picked_file(self.picker.as_ref(), &filter).await {
            Ok(node) => node,
            Err(IngestError::Aborted) => return Ok(ImportOutcome::Cancelled),
            Err(IngestError::SourceUnavailable) => {
                debug!("falling back to legacy single-file import");
                match self.fallback.choose_file(&filter).await {
                    Ok(Some(flat)) => flat_file_node(flat),
                    Ok(None) => return Ok(ImportOutcome::Cancelled),
                    Err(PickerError::Aborted) => return Ok(ImportOutcome::Cancelled),
                    Err(err) => return Err(WorkspaceError::Ingest(err.into())),
                }
            }
            Err(err) => return Err(err.into()),
        };

        let name = node.name.clone();
        let root = merge_loose_file(self.tree.take(), node);
        let merged_path = path::join(&root.path, &name);
        self.tree = Some(root);
        self.open_path(&merged_path).await?;
        Ok(ImportOutcome::Imported)
    }

    /// Ingests one drag-and-drop gesture, replacing the tree, and opens the
    /// first recognized source file if the drop contains one.  
    /// 處理一次拖放：取代現有樹，若其中含原始碼檔案則開啟第一個找到者。
    pub async fn import_dropped(
        &mut self,
        entries: Vec<DropEntry>,
    ) -> Result<ImportOutcome, WorkspaceError> {
        let nodes = ingest::walk_drop_entries(entries).await?;
        let Some(root) = ingest::assemble_drop_roots(nodes) else {
            return Ok(ImportOutcome::Cancelled);
        };
        let first_source = root.first_source_file().map(|node| node.path.clone());
        self.tree = Some(root);
        if let Some(path) = first_source {
            self.open_path(&path).await?;
        }
        Ok(ImportOutcome::Imported)
    }

    /// Opens the tree node at `path`, materializing or activating its
    /// buffer. An activation change discards the annotation set.  
    /// 開啟指定路徑的節點並實體化或啟用其緩衝區；使用中緩衝區變更時會捨棄註解集合。
    pub async fn open_path(&mut self, target: &str) -> Result<Opened, WorkspaceError> {
        let node = self
            .tree
            .as_ref()
            .and_then(|root| root.find(target))
            .cloned()
            .ok_or_else(|| WorkspaceError::UnknownPath(target.to_string()))?;
        self.open_node(&node).await
    }

    pub async fn open_node(&mut self, node: &TreeNode) -> Result<Opened, WorkspaceError> {
        let previous = self.buffers.active_path().map(str::to_string);
        let opened = self.buffers.open(node).await?;
        if previous.as_deref() != self.buffers.active_path() {
            self.annotations.clear();
        }
        self.persist_buffers();
        Ok(opened)
    }

    /// Activates an already open buffer (a tab click). Switching away from
    /// the current buffer discards the annotation set.  
    /// 啟用已開啟的緩衝區（點選分頁）；切換使用中緩衝區會捨棄註解集合。
    pub fn activate(&mut self, target: &str) -> bool {
        let changed = self.buffers.active_path() != Some(target);
        if !self.buffers.activate(target) {
            return false;
        }
        if changed {
            self.annotations.clear();
        }
        self.persist_active();
        true
    }

    /// Closes a buffer; closing the active one also clears annotations.  
    /// 關閉緩衝區；關閉使用中者同時清除註解。
    pub fn close_buffer(&mut self, target: &str) -> CloseOutcome {
        let outcome = self.buffers.close(target);
        if outcome.was_active {
            self.annotations.clear();
        }
        if outcome.removed {
            self.persist_buffers();
        }
        outcome
    }

    pub fn edit_content(&mut self, target: &str, text: impl Into<String>) -> bool {
        let changed = self.buffers.set_content(target, text);
        if changed {
            self.persist_buffers();
        }
        changed
    }

    /// Writes a buffer's current content back through its persistent
    /// handle. Transient and absent sources cannot be saved.  
    /// 透過持久參考將緩衝區內容寫回；一次性或缺失的來源無法儲存。
    pub async fn save_buffer(&self, target: &str) -> Result<(), WorkspaceError> {
        let buffer = self
            .buffers
            .get(target)
            .ok_or_else(|| WorkspaceError::UnknownPath(target.to_string()))?;
        match &buffer.source {
            NodeSource::Persistent(handle) => handle
                .write(buffer.content.as_bytes())
                .await
                .map_err(|err| WorkspaceError::Save {
                    path: target.to_string(),
                    reason: err.to_string(),
                }),
            _ => Err(WorkspaceError::Save {
                path: target.to_string(),
                reason: "no writable backing source".to_string(),
            }),
        }
    }

    /// Replaces the annotation set for the active buffer with freshly
    /// generated suggestions. Overlapping requests are refused by the
    /// in-flight flag; a generator failure keeps the prior set.  
    /// 以新產生的建議整批取代使用中緩衝區的註解；進行中旗標拒絕重疊請求，產生失敗則保留原集合。
    pub async fn generate_annotations(&mut self) -> Result<usize, WorkspaceError> {
        let content = self
            .active_buffer()
            .map(|buffer| buffer.content.clone())
            .ok_or(WorkspaceError::NoActiveBuffer)?;
        self.annotations.begin()?;
        match self.provider.generate(&content).await {
            Ok(suggestions) => {
                let count = suggestions.len();
                self.annotations.finish(suggestions);
                Ok(count)
            }
            Err(err) => {
                self.annotations.cancel();
                warn!(error = %err, "suggestion generation failed");
                Err(err.into())
            }
        }
    }

    /// Accepts the pending annotation at `line`: the suggestion is spliced
    /// into the active buffer immediately before that line and the set is
    /// renumbered. Absent annotations are a no-op.  
    /// 接受該行的待處理註解：建議文字插入使用中緩衝區目標行之前並重新編號；無對應註解則不動作。
    pub fn accept_annotation(&mut self, line: u32) -> bool {
        let Some(target) = self.buffers.active_path().map(str::to_string) else {
            return false;
        };
        let Some(suggestion) = self.annotations.accept(line) else {
            return false;
        };
        if let Some(buffer) = self.buffers.get(&target) {
            let next = splice_suggestion(&buffer.content, line, &suggestion);
            self.buffers.set_content(&target, next);
            self.persist_buffers();
        }
        true
    }

    pub fn reject_annotation(&mut self, line: u32) -> bool {
        self.annotations.reject(line)
    }

    /// Marks the annotation at `line` as manually edited and returns the
    /// line the presentation layer should scroll to.  
    /// 將該行註解標記為手動編輯，並回傳呈現層應捲動至的行號。
    pub fn edit_annotation(&mut self, line: u32) -> Option<u32> {
        self.annotations.edit(line)
    }

    fn persist_buffers(&self) {
        let result = if self.buffers.is_empty() {
            self.store.remove(OPEN_BUFFERS_KEY)
        } else {
            match serde_json::to_string(&self.buffers.snapshot()) {
                Ok(json) => self.store.set(OPEN_BUFFERS_KEY, &json),
                Err(err) => {
                    warn!(error = %err, "failed to encode buffer snapshot");
                    return;
                }
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to persist open buffers");
        }
        self.persist_active();
    }

    fn persist_active(&self) {
        let result = match self.buffers.active_path() {
            Some(active) => self.store.set(ACTIVE_BUFFER_KEY, active),
            None => self.store.remove(ACTIVE_BUFFER_KEY),
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to persist active buffer path");
        }
    }
}
