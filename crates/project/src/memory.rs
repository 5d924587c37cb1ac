//! In-memory implementations of the source contracts. These back transient
//! blobs in production and double as fixtures in tests.
//! 來源契約的記憶體實作；正式流程中支撐一次性資料，測試中作為替身使用。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::source::{
    BlobSource, DirEntry, DirectoryHandle, DropEntry, EntryReader, FallbackInput, FileFilter,
    FileHandle, FlatFile, Picker, PickerError, SourceError,
};

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Immutable in-memory byte blob.  
/// 不可變的記憶體位元組資料。
pub struct MemoryBlob {
    bytes: Vec<u8>,
}

impl MemoryBlob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            bytes: bytes.into(),
        })
    }
}

#[async_trait]
impl BlobSource for MemoryBlob {
    async fn read(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.bytes.clone())
    }
}

/// Writable in-memory file handle. Counts reads so tests can assert that
/// reopening a buffer never re-reads its source.  
/// 可寫入的記憶體檔案參考；會統計讀取次數，供測試驗證重複開啟不會重新讀取。
pub struct MemoryFile {
    name: String,
    bytes: Mutex<Vec<u8>>,
    reads: AtomicUsize,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            bytes: Mutex::new(bytes.into()),
            reads: AtomicUsize::new(0),
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn contents(&self) -> Vec<u8> {
        lock_unpoisoned(&self.bytes).clone()
    }
}

#[async_trait]
impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<Vec<u8>, SourceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.contents())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), SourceError> {
        *lock_unpoisoned(&self.bytes) = bytes.to_vec();
        Ok(())
    }
}

/// In-memory directory handle with a fixed entry list.  
/// 具固定項目清單的記憶體目錄參考。
pub struct MemoryDirectory {
    name: String,
    entries: Vec<DirEntry>,
}

impl MemoryDirectory {
    pub fn new(name: impl Into<String>, entries: Vec<DirEntry>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            entries,
        })
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entries(&self) -> Result<Vec<DirEntry>, SourceError> {
        Ok(self.entries.clone())
    }
}

/// Paginated reader with an explicit batch schedule; once the schedule is
/// exhausted every further request yields an empty batch.  
/// 依既定批次排程回傳項目的分頁讀取器；排程耗盡後一律回傳空批次。
pub struct BatchReader {
    batches: Mutex<VecDeque<Vec<DropEntry>>>,
}

impl BatchReader {
    pub fn new(batches: Vec<Vec<DropEntry>>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
        })
    }

    /// Splits a child list into fixed-size batches.  
    /// 將子項目清單切割為固定大小的批次。
    pub fn paced(children: Vec<DropEntry>, batch_size: usize) -> Arc<Self> {
        let size = batch_size.max(1);
        let batches = children
            .chunks(size)
            .map(|chunk| chunk.to_vec())
            .collect();
        Self::new(batches)
    }
}

#[async_trait]
impl EntryReader for BatchReader {
    async fn next_batch(&self) -> Result<Vec<DropEntry>, SourceError> {
        Ok(lock_unpoisoned(&self.batches).pop_front().unwrap_or_default())
    }
}

/// Picker double with a scripted outcome per capability.  
/// 依腳本回應每項能力的選擇器替身。
pub struct MemoryPicker {
    directory: Result<Arc<dyn DirectoryHandle>, PickerError>,
    file: Result<Arc<dyn FileHandle>, PickerError>,
}

impl MemoryPicker {
    /// Capability missing or denied by the embedding context.
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            directory: Err(PickerError::Unavailable),
            file: Err(PickerError::Unavailable),
        })
    }

    /// Every dialog is dismissed by the user.
    pub fn aborted() -> Arc<Self> {
        Arc::new(Self {
            directory: Err(PickerError::Aborted),
            file: Err(PickerError::Aborted),
        })
    }

    pub fn with_directory(directory: Arc<dyn DirectoryHandle>) -> Arc<Self> {
        Arc::new(Self {
            directory: Ok(directory),
            file: Err(PickerError::Unavailable),
        })
    }

    pub fn with_file(file: Arc<dyn FileHandle>) -> Arc<Self> {
        Arc::new(Self {
            directory: Err(PickerError::Unavailable),
            file: Ok(file),
        })
    }
}

#[async_trait]
impl Picker for MemoryPicker {
    async fn pick_directory(&self) -> Result<Arc<dyn DirectoryHandle>, PickerError> {
        self.directory.clone()
    }

    async fn pick_file(&self, _filter: &FileFilter) -> Result<Arc<dyn FileHandle>, PickerError> {
        self.file.clone()
    }
}

/// Legacy-input double yielding fixed flat file lists.  
/// 回傳固定攤平檔案清單的傳統輸入替身。
pub struct MemoryFallbackInput {
    directory_files: Vec<FlatFile>,
    single: Option<FlatFile>,
}

impl MemoryFallbackInput {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            directory_files: Vec::new(),
            single: None,
        })
    }

    pub fn with_directory_files(directory_files: Vec<FlatFile>) -> Arc<Self> {
        Arc::new(Self {
            directory_files,
            single: None,
        })
    }

    pub fn with_file(single: FlatFile) -> Arc<Self> {
        Arc::new(Self {
            directory_files: Vec::new(),
            single: Some(single),
        })
    }
}

#[async_trait]
impl FallbackInput for MemoryFallbackInput {
    async fn choose_directory_files(&self) -> Result<Vec<FlatFile>, PickerError> {
        Ok(self.directory_files.clone())
    }

    async fn choose_file(&self, _filter: &FileFilter) -> Result<Option<FlatFile>, PickerError> {
        Ok(self.single.clone())
    }
}
