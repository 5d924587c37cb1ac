//! The three ingestion strategies. Each turns a platform-specific source
//! into a normalized, sorted virtual file tree.
//! 三種匯入策略；各自將平台特定來源轉換為正規化且排序完成的虛擬檔案樹。

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tracing::debug;

use crate::path;
use crate::source::{
    BlobSource, DirEntry, DirectoryHandle, DropEntry, FileFilter, FlatFile, Picker, PickerError,
    SourceError,
};
use crate::tree::{sibling_order, NodeSource, TreeNode, SYNTHETIC_ROOT_NAME};

/// Root name used when the legacy input yields no usable top segment.  
/// 傳統輸入無法提供可用頂層名稱時使用的根名稱。
pub const FALLBACK_ROOT_NAME: &str = "project";

/// Failure taxonomy shared by every ingestion strategy.  
/// 所有匯入策略共用的錯誤分類。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    /// The user dismissed a picker. Callers must treat this as a silent
    /// no-op and must not fall through to another strategy.
    #[error("import cancelled by user")]
    Aborted,
    /// The capability is missing or denied; callers may fall through to the
    /// next ingestion strategy.
    #[error("import source unavailable")]
    SourceUnavailable,
    #[error("import source unreadable: {0}")]
    Unreadable(String),
}

impl From<PickerError> for IngestError {
    fn from(err: PickerError) -> Self {
        match err {
            PickerError::Aborted => IngestError::Aborted,
            PickerError::Unavailable => IngestError::SourceUnavailable,
            PickerError::Failed(message) => IngestError::Unreadable(message),
        }
    }
}

impl From<SourceError> for IngestError {
    fn from(err: SourceError) -> Self {
        IngestError::Unreadable(err.to_string())
    }
}

/// Capability-picker strategy: pick a directory and walk it recursively.
/// Each leaf carries a persistent handle for later re-reads.  
/// 能力選擇器策略：選取目錄後遞迴走訪，每個檔案節點附帶可重讀的持久參考。
pub async fn ingest_picked_directory(picker: &dyn Picker) -> Result<TreeNode, IngestError> {
    let handle = match picker.pick_directory().await {
        Ok(handle) => handle,
        Err(PickerError::Unavailable) => {
            debug!("directory picker capability unavailable");
            return Err(IngestError::SourceUnavailable);
        }
        Err(err) => return Err(err.into()),
    };
    walk_directory(handle, "").await
}

/// Capability-picker strategy for one file; the node is root-less until it
/// is merged into a tree.  
/// 單一檔案的能力選擇器策略；節點在併入樹之前不帶父路徑。
pub async fn ingest_picked_file(
    picker: &dyn Picker,
    filter: &FileFilter,
) -> Result<TreeNode, IngestError> {
    let handle = match picker.pick_file(filter).await {
        Ok(handle) => handle,
        Err(PickerError::Unavailable) => {
            debug!("file picker capability unavailable");
            return Err(IngestError::SourceUnavailable);
        }
        Err(err) => return Err(err.into()),
    };
    let name = handle.name().to_string();
    Ok(TreeNode::file(
        name.clone(),
        name,
        NodeSource::Persistent(handle),
    ))
}

fn walk_directory<'a>(
    handle: Arc<dyn DirectoryHandle>,
    parent_path: &'a str,
) -> BoxFuture<'a, Result<TreeNode, IngestError>> {
    async move {
        let name = handle.name().to_string();
        let folder_path = path::join(parent_path, &name);
        let mut children = Vec::new();
        for entry in handle.entries().await? {
            match entry {
                DirEntry::File(file) => {
                    let file_name = file.name().to_string();
                    let file_path = path::join(&folder_path, &file_name);
                    children.push(TreeNode::file(
                        file_name,
                        file_path,
                        NodeSource::Persistent(file),
                    ));
                }
                DirEntry::Directory(dir) => {
                    children.push(walk_directory(dir, &folder_path).await?);
                }
            }
        }
        children.sort_by(sibling_order);
        Ok(TreeNode::folder(name, folder_path, children))
    }
    .boxed()
}

/// Accumulator for the flat-path reconstruction. Folders are memoized by
/// name within their parent, so one referenced by many files is created
/// exactly once; the whole structure is threaded explicitly rather than
/// shared through a captured map.  
/// 攤平路徑重建用的累加器；資料夾在父層內以名稱記憶化，確保只建立一次，且整體結構以值傳遞而非共享可變狀態。
#[derive(Default)]
struct FolderAcc {
    folders: BTreeMap<String, FolderAcc>,
    files: Vec<(String, Arc<dyn BlobSource>)>,
}

/// Legacy multi-file strategy: rebuild the tree from slash-delimited
/// relative paths. Returns `None` for an empty selection.  
/// 傳統多檔策略：從 `/` 分隔的相對路徑重建樹；空選取回傳 `None`。
pub fn tree_from_flat_files(files: Vec<FlatFile>) -> Option<TreeNode> {
    let root_name = files
        .first()?
        .relative_path
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_ROOT_NAME)
        .to_string();

    let mut acc = FolderAcc::default();
    for file in files {
        let segments: Vec<&str> = file.relative_path.split('/').collect();
        let Some((leaf, folders)) = segments.split_last() else {
            continue;
        };
        if leaf.is_empty() {
            continue;
        }
        let mut cursor = &mut acc;
        // the first segment is the root itself when a folder component exists
        for segment in folders.iter().skip(1) {
            cursor = cursor.folders.entry((*segment).to_string()).or_default();
        }
        cursor.files.push((leaf.to_string(), file.blob));
    }

    Some(build_folder(root_name.clone(), root_name, acc))
}

fn build_folder(name: String, folder_path: String, acc: FolderAcc) -> TreeNode {
    let mut children = Vec::new();
    for (child_name, child_acc) in acc.folders {
        let child_path = path::join(&folder_path, &child_name);
        children.push(build_folder(child_name, child_path, child_acc));
    }
    for (file_name, blob) in acc.files {
        let file_path = path::join(&folder_path, &file_name);
        children.push(TreeNode::file(
            file_name,
            file_path,
            NodeSource::Transient(blob),
        ));
    }
    children.sort_by(sibling_order);
    TreeNode::folder(name, folder_path, children)
}

/// Drag-drop strategy: walk every dropped item, draining each directory's
/// paginated reader until a batch comes back empty.  
/// 拖放策略：走訪每個拖放項目，目錄的分頁讀取器須持續讀到空批次為止。
pub async fn walk_drop_entries(entries: Vec<DropEntry>) -> Result<Vec<TreeNode>, IngestError> {
    let mut nodes = Vec::new();
    for entry in entries {
        nodes.push(walk_drop_entry(entry, "").await?);
    }
    Ok(nodes)
}

fn walk_drop_entry<'a>(
    entry: DropEntry,
    parent_path: &'a str,
) -> BoxFuture<'a, Result<TreeNode, IngestError>> {
    async move {
        match entry {
            DropEntry::File { name, blob } => {
                let file_path = path::join(parent_path, &name);
                Ok(TreeNode::file(name, file_path, NodeSource::Transient(blob)))
            }
            DropEntry::Directory { name, reader } => {
                let folder_path = path::join(parent_path, &name);
                let mut children = Vec::new();
                loop {
                    let batch = reader.next_batch().await?;
                    if batch.is_empty() {
                        break;
                    }
                    for child in batch {
                        children.push(walk_drop_entry(child, &folder_path).await?);
                    }
                }
                children.sort_by(sibling_order);
                Ok(TreeNode::folder(name, folder_path, children))
            }
        }
    }
    .boxed()
}

/// Turns the top-level nodes of one drop into a tree root: a lone folder
/// becomes the root directly, anything else is wrapped under a synthetic
/// root folder.  
/// 將一次拖放的頂層節點組成樹根：單一資料夾直接作為根，其餘情況包進合成根資料夾。
pub fn assemble_drop_roots(mut nodes: Vec<TreeNode>) -> Option<TreeNode> {
    match nodes.len() {
        0 => None,
        1 if nodes[0].is_folder() => nodes.pop(),
        _ => {
            let mut root =
                TreeNode::folder(SYNTHETIC_ROOT_NAME, SYNTHETIC_ROOT_NAME, Vec::new());
            for mut node in nodes {
                node.rebase(&root.path);
                root.children.push(node);
            }
            root.sort_children();
            Some(root)
        }
    }
}
