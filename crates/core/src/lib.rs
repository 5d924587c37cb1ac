//! AnnoPad 核心：緩衝區、註解與工作區狀態機。 / AnnoPad core: buffers,
//! annotations, and the workspace state machine.
//!
//! The crate is presentation-agnostic. A shell supplies a `Picker`, a
//! `FallbackInput`, a `SuggestionProvider`, and a `KeyValueStore`; the
//! `Workspace` facade wires them to the tree and buffer model from
//! `annopad_project`.

pub mod annotations;
pub mod buffers;
pub mod store;
pub mod workspace;

mod util;

pub use annotations::{
    splice_suggestion, Annotation, AnnotationBoard, AnnotationError, AnnotationStatus,
    CannedSuggestions, ProviderError, Suggestion, SuggestionProvider,
};
pub use buffers::{BufferError, BufferSnapshot, CloseOutcome, OpenBuffer, OpenBuffers, Opened};
pub use store::{DirStore, KeyValueStore, MemoryStore, StoreError, ACTIVE_BUFFER_KEY, OPEN_BUFFERS_KEY};
pub use workspace::{ImportOutcome, Workspace, WorkspaceError};
