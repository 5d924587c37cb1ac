//! Project-model and multi-source ingestion primitives for AnnoPad.
//! AnnoPad 專案模型與多來源匯入的核心模組。

pub mod ingest;
pub mod memory;
pub mod path;
pub mod source;
pub mod tree;

pub use ingest::{
    assemble_drop_roots, ingest_picked_directory, ingest_picked_file, tree_from_flat_files,
    walk_drop_entries, IngestError, FALLBACK_ROOT_NAME,
};
pub use source::{
    BlobSource, DirEntry, DirectoryHandle, DropEntry, EntryReader, FallbackInput, FileFilter,
    FileHandle, FlatFile, Picker, PickerError, SourceError,
};
pub use tree::{
    is_source_file, merge_loose_file, sibling_order, NodeKind, NodeSource, TreeNode,
    SOURCE_FILE_EXTENSIONS, SYNTHETIC_ROOT_NAME,
};
