use async_trait::async_trait;
use thiserror::Error;

/// 單一註解的生命週期狀態。 / Lifecycle status of one annotation.
///
/// `Pending` may move to any of the other three; all three are terminal.
/// `Edited` means the user will implement the change manually, so it must
/// never be auto-spliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationStatus {
    Pending,
    Accepted,
    Rejected,
    Edited,
}

/// A suggested edit anchored to a 1-based line of the buffer snapshot the
/// set was generated against. Annotations are keyed by line, so two can
/// never coexist on the same line.  
/// 錨定在緩衝區快照第 `line` 行（1 起算）的建議編輯；以行號為鍵，同一行不會同時存在兩筆。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub line: u32,
    pub suggestion: String,
    pub status: AnnotationStatus,
}

/// Raw suggestion produced by a generator, before it enters the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub line: u32,
    pub suggestion: String,
}

impl Suggestion {
    pub fn new(line: u32, suggestion: impl Into<String>) -> Self {
        Self {
            line,
            suggestion: suggestion.into(),
        }
    }
}

/// 產生建議時的錯誤。 / Errors raised by a suggestion generator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("suggestion generation failed: {0}")]
    Failed(String),
}

/// External collaborator that produces suggestions for a buffer's content.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn generate(&self, content: &str) -> Result<Vec<Suggestion>, ProviderError>;
}

/// Fixed-list provider standing in for a real generation service.  
/// 以固定清單代替真實產生服務的提供者。
#[derive(Debug, Clone, Default)]
pub struct CannedSuggestions {
    suggestions: Vec<Suggestion>,
}

impl CannedSuggestions {
    pub fn new(suggestions: Vec<Suggestion>) -> Self {
        Self { suggestions }
    }
}

#[async_trait]
impl SuggestionProvider for CannedSuggestions {
    async fn generate(&self, _content: &str) -> Result<Vec<Suggestion>, ProviderError> {
        Ok(self.suggestions.clone())
    }
}

/// 註解狀態機的錯誤。 / Errors raised by the annotation state machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("a generation request is already in flight")]
    GenerationInFlight,
}

/// Annotation set for the currently active buffer, plus the session-wide
/// in-flight generation flag guarding overlapping `generate` calls.  
/// 目前使用中緩衝區的註解集合，以及防止產生請求重疊的全域進行中旗標。
#[derive(Debug, Default)]
pub struct AnnotationBoard {
    annotations: Vec<Annotation>,
    generating: bool,
}

impl AnnotationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn pending(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(|annotation| annotation.status == AnnotationStatus::Pending)
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Claims the in-flight flag for a new generation request.  
    /// 為新的產生請求取得進行中旗標。
    pub fn begin(&mut self) -> Result<(), AnnotationError> {
        if self.generating {
            return Err(AnnotationError::GenerationInFlight);
        }
        self.generating = true;
        Ok(())
    }

    /// Replaces the whole set with a fresh one, all `Pending`. A second
    /// suggestion for an already occupied line is discarded.  
    /// 以全新集合整批取代，狀態皆為 `Pending`；同一行的第二筆建議會被捨棄。
    pub fn finish(&mut self, suggestions: Vec<Suggestion>) {
        self.generating = false;
        let mut replacement: Vec<Annotation> = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            if replacement.iter().any(|existing| existing.line == suggestion.line) {
                continue;
            }
            replacement.push(Annotation {
                line: suggestion.line,
                suggestion: suggestion.suggestion,
                status: AnnotationStatus::Pending,
            });
        }
        self.annotations = replacement;
    }

    /// Releases the in-flight flag after a failed generation, keeping the
    /// prior set in place.  
    /// 產生失敗後釋放進行中旗標並保留原有集合。
    pub fn cancel(&mut self) {
        self.generating = false;
    }

    /// Discards the set, used when the active buffer closes or changes.  
    /// 捨棄整個集合；用於使用中緩衝區關閉或切換時。
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    /// Marks the pending annotation at `line` accepted and returns the text
    /// to splice. Every annotation at or past the insertion point is
    /// renumbered by +1 so later anchors keep tracking their lines.  
    /// 將該行的待處理註解標記為已接受並回傳要插入的文字；插入點之後的註解行號一律加一，維持錨定正確。
    pub fn accept(&mut self, line: u32) -> Option<String> {
        let index = self
            .annotations
            .iter()
            .position(|a| a.line == line && a.status == AnnotationStatus::Pending)?;
        self.annotations[index].status = AnnotationStatus::Accepted;
        let suggestion = self.annotations[index].suggestion.clone();
        for annotation in &mut self.annotations {
            if annotation.line >= line {
                annotation.line += 1;
            }
        }
        Some(suggestion)
    }

    /// Marks the pending annotation at `line` rejected; content untouched.  
    /// 將該行的待處理註解標記為已拒絕；內容不變。
    pub fn reject(&mut self, line: u32) -> bool {
        self.transition(line, AnnotationStatus::Rejected)
    }

    /// Marks the pending annotation at `line` as manually edited and
    /// returns the line the presentation layer should focus.  
    /// 將該行的待處理註解標記為手動編輯，並回傳呈現層應聚焦的行號。
    pub fn edit(&mut self, line: u32) -> Option<u32> {
        if self.transition(line, AnnotationStatus::Edited) {
            Some(line)
        } else {
            None
        }
    }

    fn transition(&mut self, line: u32, status: AnnotationStatus) -> bool {
        match self
            .annotations
            .iter_mut()
            .find(|a| a.line == line && a.status == AnnotationStatus::Pending)
        {
            Some(annotation) => {
                annotation.status = status;
                true
            }
            None => false,
        }
    }
}

/// Splits content into lines, inserts the suggestion as a new line
/// immediately before the 1-based target line, and rejoins. Out-of-range
/// targets append at the end.  
/// 將內容依行切割，在目標行（1 起算）之前插入建議文字後重組；超出範圍則附加於結尾。
pub fn splice_suggestion(content: &str, line: u32, suggestion: &str) -> String {
    let mut lines: Vec<&str> = content.split('\n').collect();
    let index = (line.saturating_sub(1) as usize).min(lines.len());
    lines.insert(index, suggestion);
    lines.join("\n")
}
