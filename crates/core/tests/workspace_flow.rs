//! End-to-end flows through the workspace facade, using the in-memory
//! source and store doubles.

use std::sync::Arc;

use annopad_core::{
    AnnotationStatus, CannedSuggestions, ImportOutcome, KeyValueStore, MemoryStore, Suggestion,
    SuggestionProvider, Workspace, ACTIVE_BUFFER_KEY, OPEN_BUFFERS_KEY,
};
use annopad_project::memory::{
    BatchReader, MemoryBlob, MemoryDirectory, MemoryFallbackInput, MemoryFile, MemoryPicker,
};
use annopad_project::source::{DirEntry, DropEntry, FallbackInput, FlatFile, Picker};

fn workspace(
    picker: Arc<dyn Picker>,
    fallback: Arc<dyn FallbackInput>,
    provider: Arc<dyn SuggestionProvider>,
    store: Arc<dyn KeyValueStore>,
) -> Workspace {
    Workspace::new(picker, fallback, provider, store)
}

fn no_suggestions() -> Arc<CannedSuggestions> {
    Arc::new(CannedSuggestions::default())
}

fn sample_directory() -> Arc<MemoryDirectory> {
    let src = MemoryDirectory::new(
        "src",
        vec![
            DirEntry::File(MemoryFile::new("main.c", b"int main() {\n  return 0;\n}".to_vec())),
            DirEntry::File(MemoryFile::new("util.c", b"// util".to_vec())),
        ],
    );
    MemoryDirectory::new(
        "proj",
        vec![
            DirEntry::Directory(src),
            DirEntry::File(MemoryFile::new("readme.txt", b"hello".to_vec())),
        ],
    )
}

#[tokio::test]
async fn folder_import_prefers_picker_and_opens_nothing() {
    let store = Arc::new(MemoryStore::new());
    let mut ws = workspace(
        MemoryPicker::with_directory(sample_directory()),
        MemoryFallbackInput::empty(),
        no_suggestions(),
        store,
    );

    assert_eq!(ws.import_folder().await.unwrap(), ImportOutcome::Imported);
    let root = ws.tree().expect("tree after import");
    assert_eq!(root.path, "proj");
    assert!(root.find("proj/src/main.c").is_some());
    assert!(ws.active_buffer().is_none());
}

#[tokio::test]
async fn folder_import_falls_back_to_legacy_input() {
    let fallback = MemoryFallbackInput::with_directory_files(vec![
        FlatFile::new("proj/src/a.c", MemoryBlob::new(b"aa".to_vec())),
        FlatFile::new("proj/readme.txt", MemoryBlob::new(b"rr".to_vec())),
    ]);
    let mut ws = workspace(
        MemoryPicker::unavailable(),
        fallback,
        no_suggestions(),
        Arc::new(MemoryStore::new()),
    );

    assert_eq!(ws.import_folder().await.unwrap(), ImportOutcome::Imported);
    let root = ws.tree().expect("tree from fallback");
    assert_eq!(root.name, "proj");
    assert!(root.find("proj/src/a.c").is_some());
}

#[tokio::test]
async fn dismissed_picker_cancels_without_trying_the_fallback() {
    // the fallback would succeed; a dismissal must never reach it
    let fallback = MemoryFallbackInput::with_directory_files(vec![FlatFile::new(
        "proj/a.c",
        MemoryBlob::new(b"aa".to_vec()),
    )]);
    let mut ws = workspace(
        MemoryPicker::aborted(),
        fallback,
        no_suggestions(),
        Arc::new(MemoryStore::new()),
    );

    assert_eq!(ws.import_folder().await.unwrap(), ImportOutcome::Cancelled);
    assert!(ws.tree().is_none());
}

#[tokio::test]
async fn single_file_import_merges_and_opens() {
    let mut ws = workspace(
        MemoryPicker::with_file(MemoryFile::new("main.c", b"int main() {}".to_vec())),
        MemoryFallbackInput::empty(),
        no_suggestions(),
        Arc::new(MemoryStore::new()),
    );

    assert_eq!(ws.import_file().await.unwrap(), ImportOutcome::Imported);
    let root = ws.tree().expect("synthesized root");
    assert_eq!(root.name, "Project");
    let active = ws.active_buffer().expect("merged file opened");
    assert_eq!(active.path, "Project/main.c");
    assert_eq!(active.content, "int main() {}");
}

#[tokio::test]
async fn drop_import_opens_first_source_file() {
    let src = DropEntry::Directory {
        name: "src".to_string(),
        reader: BatchReader::paced(
            vec![
                DropEntry::File {
                    name: "notes.txt".to_string(),
                    blob: MemoryBlob::new(b"n".to_vec()),
                },
                DropEntry::File {
                    name: "main.c".to_string(),
                    blob: MemoryBlob::new(b"int main() {}".to_vec()),
                },
            ],
            1,
        ),
    };
    let entry = DropEntry::Directory {
        name: "proj".to_string(),
        reader: BatchReader::paced(vec![src], 4),
    };
    let mut ws = workspace(
        MemoryPicker::unavailable(),
        MemoryFallbackInput::empty(),
        no_suggestions(),
        Arc::new(MemoryStore::new()),
    );

    assert_eq!(ws.import_dropped(vec![entry]).await.unwrap(), ImportOutcome::Imported);
    let active = ws.active_buffer().expect("first source file opened");
    assert_eq!(active.path, "proj/src/main.c");
}

#[tokio::test]
async fn accept_splices_suggestion_and_renumbers() {
    let provider = Arc::new(CannedSuggestions::new(vec![
        Suggestion::new(2, "X"),
        Suggestion::new(3, "Y"),
    ]));
    let mut ws = workspace(
        MemoryPicker::with_file(MemoryFile::new("main.c", b"a\nb\nc".to_vec())),
        MemoryFallbackInput::empty(),
        provider,
        Arc::new(MemoryStore::new()),
    );
    ws.import_file().await.unwrap();

    assert_eq!(ws.generate_annotations().await.unwrap(), 2);
    assert!(ws.accept_annotation(2));
    assert_eq!(ws.active_buffer().unwrap().content, "a\nX\nb\nc");

    // the later annotation moved from line 3 to line 4 with its anchor
    let lines: Vec<(u32, AnnotationStatus)> = ws
        .annotations()
        .annotations()
        .iter()
        .map(|a| (a.line, a.status))
        .collect();
    assert_eq!(
        lines,
        vec![(3, AnnotationStatus::Accepted), (4, AnnotationStatus::Pending)]
    );

    assert!(ws.accept_annotation(4));
    assert_eq!(ws.active_buffer().unwrap().content, "a\nX\nb\nY\nc");
}

#[tokio::test]
async fn switching_or_closing_active_buffer_clears_annotations() {
    let provider = Arc::new(CannedSuggestions::new(vec![Suggestion::new(1, "X")]));
    let mut ws = workspace(
        MemoryPicker::with_directory(sample_directory()),
        MemoryFallbackInput::empty(),
        provider,
        Arc::new(MemoryStore::new()),
    );
    ws.import_folder().await.unwrap();
    ws.open_path("proj/src/main.c").await.unwrap();
    ws.open_path("proj/src/util.c").await.unwrap();

    ws.generate_annotations().await.unwrap();
    assert_eq!(ws.annotations().annotations().len(), 1);

    // a tab switch discards the set
    assert!(ws.activate("proj/src/main.c"));
    assert!(ws.annotations().annotations().is_empty());

    ws.generate_annotations().await.unwrap();
    let outcome = ws.close_buffer("proj/src/main.c");
    assert!(outcome.was_active);
    assert_eq!(ws.buffers().active_path(), Some("proj/src/util.c"));
    assert!(ws.annotations().annotations().is_empty());
}

#[tokio::test]
async fn session_round_trips_through_the_store() {
    let store = Arc::new(MemoryStore::new());
    {
        let mut ws = workspace(
            MemoryPicker::with_directory(sample_directory()),
            MemoryFallbackInput::empty(),
            no_suggestions(),
            store.clone(),
        );
        ws.import_folder().await.unwrap();
        ws.open_path("proj/src/main.c").await.unwrap();
        ws.open_path("proj/readme.txt").await.unwrap();
        assert!(ws.edit_content("proj/src/main.c", "edited"));
        assert!(ws.activate("proj/src/main.c"));
    }

    assert!(store.get(OPEN_BUFFERS_KEY).unwrap().is_some());
    assert_eq!(
        store.get(ACTIVE_BUFFER_KEY).unwrap().as_deref(),
        Some("proj/src/main.c")
    );

    let mut ws = workspace(
        MemoryPicker::unavailable(),
        MemoryFallbackInput::empty(),
        no_suggestions(),
        store.clone(),
    );
    ws.restore();
    assert_eq!(ws.buffers().len(), 2);
    let active = ws.active_buffer().expect("restored active buffer");
    assert_eq!(active.path, "proj/src/main.c");
    assert_eq!(active.content, "edited");
    assert!(active.source.is_none());

    // closing everything clears the persisted snapshot
    ws.close_buffer("proj/src/main.c");
    ws.close_buffer("proj/readme.txt");
    assert!(store.get(OPEN_BUFFERS_KEY).unwrap().is_none());
    assert!(store.get(ACTIVE_BUFFER_KEY).unwrap().is_none());
}

#[tokio::test]
async fn save_writes_back_through_the_persistent_handle() {
    let handle = MemoryFile::new("main.c", b"before".to_vec());
    let mut ws = workspace(
        MemoryPicker::with_file(handle.clone()),
        MemoryFallbackInput::empty(),
        no_suggestions(),
        Arc::new(MemoryStore::new()),
    );
    ws.import_file().await.unwrap();

    assert!(ws.edit_content("Project/main.c", "after"));
    ws.save_buffer("Project/main.c").await.unwrap();
    assert_eq!(handle.contents(), b"after");
}

struct FailingProvider;

#[async_trait::async_trait]
impl SuggestionProvider for FailingProvider {
    async fn generate(
        &self,
        _content: &str,
    ) -> Result<Vec<Suggestion>, annopad_core::ProviderError> {
        Err(annopad_core::ProviderError::Failed("backend down".into()))
    }
}

#[tokio::test]
async fn failed_generation_keeps_the_prior_set() {
    let mut ws = workspace(
        MemoryPicker::with_file(MemoryFile::new("main.c", b"a\nb".to_vec())),
        MemoryFallbackInput::empty(),
        Arc::new(FailingProvider),
        Arc::new(MemoryStore::new()),
    );
    ws.import_file().await.unwrap();

    assert!(ws.generate_annotations().await.is_err());
    assert!(!ws.annotations().is_generating());
    // a later request is not blocked by the failed one
    assert!(ws.generate_annotations().await.is_err());
}

#[tokio::test]
async fn save_fails_for_buffers_without_a_persistent_source() {
    let store = Arc::new(MemoryStore::new());
    {
        let mut ws = workspace(
            MemoryPicker::with_file(MemoryFile::new("main.c", b"x".to_vec())),
            MemoryFallbackInput::empty(),
            no_suggestions(),
            store.clone(),
        );
        ws.import_file().await.unwrap();
    }

    // restored buffers carry no source and cannot be written back
    let mut ws = workspace(
        MemoryPicker::unavailable(),
        MemoryFallbackInput::empty(),
        no_suggestions(),
        store,
    );
    ws.restore();
    assert!(ws.save_buffer("Project/main.c").await.is_err());
}
