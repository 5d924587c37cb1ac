use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by backing sources during read or write.  
/// 後端資料來源讀寫時可能發生的錯誤。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source read failed: {0}")]
    Read(String),
    #[error("source does not accept writes")]
    ReadOnly,
}

/// Capability-backed file reference that can be re-read later and optionally
/// written back.  
/// 具備能力授權的檔案參考，可重複讀取並選擇性寫回。
#[async_trait]
pub trait FileHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn read(&self) -> Result<Vec<u8>, SourceError>;

    /// Write-back is optional; sources without it report `ReadOnly`.  
    /// 寫回為選配能力；不支援的來源回報 `ReadOnly`。
    async fn write(&self, _bytes: &[u8]) -> Result<(), SourceError> {
        Err(SourceError::ReadOnly)
    }
}

/// One-shot in-memory byte source, valid only for the current session.  
/// 僅在本次工作階段內有效的一次性記憶體位元組來源。
#[async_trait]
pub trait BlobSource: Send + Sync {
    async fn read(&self) -> Result<Vec<u8>, SourceError>;
}

/// Entry yielded while enumerating a picked directory.  
/// 列舉已選取目錄時產生的項目。
#[derive(Clone)]
pub enum DirEntry {
    File(Arc<dyn FileHandle>),
    Directory(Arc<dyn DirectoryHandle>),
}

/// Directory reference whose children can be enumerated asynchronously.
/// Enumeration order is not guaranteed by the source.  
/// 可非同步列舉子項目的目錄參考；來源不保證列舉順序。
#[async_trait]
pub trait DirectoryHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn entries(&self) -> Result<Vec<DirEntry>, SourceError>;
}

/// Filter describing which files a picker should offer.  
/// 描述檔案選擇器應提供哪些檔案的篩選條件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub description: String,
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(description: impl Into<String>, extensions: &[&str]) -> Self {
        Self {
            description: description.into(),
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

/// Outcome of asking the host for a picker capability.  
/// 向宿主請求選擇器能力的結果。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PickerError {
    /// The user dismissed the dialog. Not an error condition.
    #[error("picker dismissed by user")]
    Aborted,
    /// The capability is missing, or denied by the embedding context.
    #[error("picker capability unavailable")]
    Unavailable,
    #[error("picker failed: {0}")]
    Failed(String),
}

/// Capability-based directory/file chooser granted by the host.  
/// 宿主授權的目錄/檔案選擇能力。
#[async_trait]
pub trait Picker: Send + Sync {
    async fn pick_directory(&self) -> Result<Arc<dyn DirectoryHandle>, PickerError>;

    async fn pick_file(&self, filter: &FileFilter) -> Result<Arc<dyn FileHandle>, PickerError>;
}

/// File delivered by the legacy multi-file input, annotated with its
/// slash-delimited path relative to the chosen directory.  
/// 傳統多檔輸入提供的檔案，附帶以 `/` 分隔的相對路徑。
#[derive(Clone)]
pub struct FlatFile {
    pub relative_path: String,
    pub blob: Arc<dyn BlobSource>,
}

impl FlatFile {
    pub fn new(relative_path: impl Into<String>, blob: Arc<dyn BlobSource>) -> Self {
        Self {
            relative_path: relative_path.into(),
            blob,
        }
    }
}

/// Legacy input that flattens an entire directory into a list of files.  
/// 將整個目錄攤平成檔案清單的傳統輸入。
#[async_trait]
pub trait FallbackInput: Send + Sync {
    async fn choose_directory_files(&self) -> Result<Vec<FlatFile>, PickerError>;

    async fn choose_file(&self, filter: &FileFilter) -> Result<Option<FlatFile>, PickerError>;
}

/// Item handed over by a drag-and-drop gesture.  
/// 拖放動作交付的項目。
#[derive(Clone)]
pub enum DropEntry {
    File {
        name: String,
        blob: Arc<dyn BlobSource>,
    },
    Directory {
        name: String,
        reader: Arc<dyn EntryReader>,
    },
}

impl DropEntry {
    pub fn name(&self) -> &str {
        match self {
            DropEntry::File { name, .. } | DropEntry::Directory { name, .. } => name,
        }
    }
}

/// Paginated reader over a dropped directory. A single request is not
/// guaranteed to return all children; callers must keep requesting batches
/// until an empty one comes back.  
/// 拖放目錄的分頁讀取器；單次請求不保證回傳全部子項目，須持續請求直到批次為空。
#[async_trait]
pub trait EntryReader: Send + Sync {
    async fn next_batch(&self) -> Result<Vec<DropEntry>, SourceError>;
}
