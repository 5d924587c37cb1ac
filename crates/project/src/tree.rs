use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::path;
use crate::source::{BlobSource, FileHandle, SourceError};

/// File extensions recognized as project source files.  
/// 視為專案原始碼的副檔名集合。
pub const SOURCE_FILE_EXTENSIONS: &[&str] = &["c", "cpp", "h", "hpp"];

/// Name given to a synthetic root folder when loose nodes need a parent.  
/// 需要為零散節點建立父層時，合成根資料夾使用的名稱。
pub const SYNTHETIC_ROOT_NAME: &str = "Project";

/// The kind of tree node.  
/// 樹狀節點的類型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

/// Backing source attached to a file node. Folders carry `None`. The tree is
/// the single owner of these handles; open buffers hold non-owning clones.  
/// 檔案節點所附帶的後端來源；資料夾為 `None`。樹為來源的唯一擁有者，開啟的緩衝區僅持有共享參考。
#[derive(Clone, Default)]
pub enum NodeSource {
    /// Capability reference that can be re-read and optionally written back.
    Persistent(Arc<dyn FileHandle>),
    /// One-shot in-memory byte source valid only for this session.
    Transient(Arc<dyn BlobSource>),
    #[default]
    None,
}

impl NodeSource {
    pub fn is_none(&self) -> bool {
        matches!(self, NodeSource::None)
    }

    /// Reads the full text through whichever live variant is attached,
    /// decoding lossily as UTF-8.  
    /// 透過現存的來源變體讀取完整文字，並以 UTF-8 寬鬆解碼。
    pub async fn read_text(&self) -> Result<String, SourceError> {
        let bytes = match self {
            NodeSource::Persistent(handle) => handle.read().await?,
            NodeSource::Transient(blob) => blob.read().await?,
            NodeSource::None => return Err(SourceError::Read("no backing source".to_string())),
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSource::Persistent(_) => f.write_str("Persistent"),
            NodeSource::Transient(_) => f.write_str("Transient"),
            NodeSource::None => f.write_str("None"),
        }
    }
}

/// One file or folder in the imported project. `path` is the unique
/// root-relative key; a folder's `path` plus `/` prefixes every descendant.  
/// 匯入專案中的單一檔案或資料夾；`path` 為唯一的根相對鍵值，資料夾路徑加上 `/` 為所有子孫路徑的前綴。
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
    pub source: NodeSource,
}

impl TreeNode {
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        source: NodeSource,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File,
            children: Vec::new(),
            source,
        }
    }

    pub fn folder(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<TreeNode>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Folder,
            children,
            source: NodeSource::None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Applies the sibling sort policy to every folder in the subtree.  
    /// 對子樹中的每個資料夾套用兄弟節點排序策略。
    pub fn sort_children(&mut self) {
        self.children.sort_by(sibling_order);
        for child in &mut self.children {
            child.sort_children();
        }
    }

    /// Finds a node by its unique path.  
    /// 依唯一路徑尋找節點。
    pub fn find(&self, target: &str) -> Option<&TreeNode> {
        if self.path == target {
            return Some(self);
        }
        for child in &self.children {
            if let Some(found) = child.find(target) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first search for the first file recognized as project source.  
    /// 深度優先搜尋第一個被視為專案原始碼的檔案。
    pub fn first_source_file(&self) -> Option<&TreeNode> {
        if self.kind == NodeKind::File && is_source_file(&self.name) {
            return Some(self);
        }
        for child in &self.children {
            if let Some(found) = child.first_source_file() {
                return Some(found);
            }
        }
        None
    }

    /// Re-keys this subtree under a new parent path, restoring the prefix
    /// invariant after the node is moved.  
    /// 將此子樹重新掛載到新的父路徑之下，恢復路徑前綴不變量。
    pub fn rebase(&mut self, parent_path: &str) {
        self.path = path::join(parent_path, &self.name);
        let base = self.path.clone();
        for child in &mut self.children {
            child.rebase(&base);
        }
    }
}

/// Sibling ordering contract: folders sort before files; within a kind,
/// ascending case-aware comparison by name.  
/// 兄弟節點排序契約：資料夾排在檔案之前，同類型依名稱做大小寫感知的遞增比較。
pub fn sibling_order(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.kind, b.kind) {
        (NodeKind::Folder, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Folder) => Ordering::Greater,
        _ => path::compare_names(&a.name, &b.name),
    }
}

/// Whether a file name carries one of the recognized source extensions.  
/// 判斷檔名是否具有被認可的原始碼副檔名。
pub fn is_source_file(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| SOURCE_FILE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Merges a single loose file into an existing tree, or synthesizes a root
/// folder around it when no tree exists. A previously merged file with the
/// same path is replaced rather than duplicated, keeping paths unique.  
/// 將單一零散檔案併入現有樹；若無樹則合成根資料夾。同路徑的舊檔案會被取代以維持路徑唯一。
pub fn merge_loose_file(root: Option<TreeNode>, mut file: TreeNode) -> TreeNode {
    let mut root = root.unwrap_or_else(|| {
        TreeNode::folder(SYNTHETIC_ROOT_NAME, SYNTHETIC_ROOT_NAME, Vec::new())
    });
    file.rebase(&root.path);
    root.children.retain(|child| child.path != file.path);
    root.children.push(file);
    root.sort_children();
    root
}
