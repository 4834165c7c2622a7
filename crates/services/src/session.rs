use std::fmt;
use std::sync::Arc;

use storage::LocalProgressStore;
use translate_core::Clock;
use translate_core::model::{
    Annotation, EntryStatus, ParticleTaxonomy, ProgressRecord, SessionId, SubmissionEntry,
    WorkUnitId, percent_of,
};

use crate::error::SessionError;
use crate::remote::RemoteStore;

/// Translation text stored for sentences marked as needing none.
pub const NO_TRANSLATION_TEXT: &str = "No Translation Needed";

/// Name recorded when the annotator leaves theirs blank.
pub const ANONYMOUS_USER: &str = "Anonymous User";

/// Sentences shown before the current one.
const CONTEXT_SENTENCES: usize = 2;

/// Trimmed user name, or [`ANONYMOUS_USER`] when blank.
#[must_use]
pub fn normalize_user_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        ANONYMOUS_USER.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Where the session stands, one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPosition {
    pub current: usize,
    pub total: usize,
}

impl fmt::Display for SessionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} sentences", self.current, self.total)
    }
}

/// Result of one step through the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub entry: SubmissionEntry,
    pub progress: ProgressRecord,
    /// Why the remote append failed, if it did. The step still counts.
    pub append_error: Option<String>,
    pub finished: bool,
}

impl StepOutcome {
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.append_error.is_none()
    }
}

/// One annotator working through the sentences of one unit.
///
/// Every step appends an entry to the remote log on a best-effort basis,
/// records local progress, then advances. The cursor only moves forward.
pub struct TranslationSession {
    id: SessionId,
    user_name: String,
    unit: WorkUnitId,
    sentences: Vec<String>,
    index: usize,
    remote: Arc<dyn RemoteStore>,
    progress: LocalProgressStore,
    taxonomy: Option<Arc<dyn ParticleTaxonomy>>,
    clock: Clock,
}

impl TranslationSession {
    /// Start a session on `unit`. The session id comes from the clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if there are no sentences.
    pub fn start(
        unit: WorkUnitId,
        sentences: Vec<String>,
        user_name: &str,
        remote: Arc<dyn RemoteStore>,
        progress: LocalProgressStore,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        if sentences.is_empty() {
            return Err(SessionError::Empty);
        }
        let id = SessionId::from_start(clock.now());
        tracing::info!(session = %id, unit = %unit, sentences = sentences.len(), "session started");
        Ok(Self {
            id,
            user_name: normalize_user_name(user_name),
            unit,
            sentences,
            index: 0,
            remote,
            progress,
            taxonomy: None,
            clock,
        })
    }

    /// Check listed particles and meanings against `taxonomy` on submit.
    #[must_use]
    pub fn with_taxonomy(mut self, taxonomy: Arc<dyn ParticleTaxonomy>) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub fn unit(&self) -> &WorkUnitId {
        &self.unit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.index >= self.sentences.len()
    }

    /// The sentence awaiting an answer, `None` once finished.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.sentences.get(self.index).map(String::as_str)
    }

    /// Up to two sentences before the current one, oldest first.
    #[must_use]
    pub fn context(&self) -> &[String] {
        let end = self.index.min(self.sentences.len());
        let start = end.saturating_sub(CONTEXT_SENTENCES);
        &self.sentences[start..end]
    }

    #[must_use]
    pub fn position(&self) -> SessionPosition {
        SessionPosition {
            current: (self.index + 1).min(self.sentences.len()),
            total: self.sentences.len(),
        }
    }

    /// Share of sentences already answered.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        percent_of(self.index as u64, self.sentences.len() as u64)
    }

    /// Record a translation of the current sentence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyTranslation` for blank text,
    /// `SessionError::Annotation` if the annotation is not in the taxonomy,
    /// `SessionError::Completed` once every sentence is answered, or a
    /// progress error if local storage fails.
    pub async fn submit_translation(
        &mut self,
        text: &str,
        annotation: &Annotation,
    ) -> Result<StepOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyTranslation);
        }
        self.step(EntryStatus::Translated, text, annotation).await
    }

    /// Skip the current sentence. Skips never count toward completion in
    /// the remote stats, but still advance local progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once every sentence is answered, or
    /// a progress error if local storage fails.
    pub async fn skip(&mut self) -> Result<StepOutcome, SessionError> {
        self.step(EntryStatus::Skipped, "", &Annotation::none()).await
    }

    /// Mark the current sentence as not needing a translation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Annotation` if the annotation is not in the
    /// taxonomy, `SessionError::Completed` once every sentence is answered,
    /// or a progress error if local storage fails.
    pub async fn mark_no_translation_needed(
        &mut self,
        annotation: &Annotation,
    ) -> Result<StepOutcome, SessionError> {
        self.step(EntryStatus::NoTranslationNeeded, NO_TRANSLATION_TEXT, annotation)
            .await
    }

    async fn step(
        &mut self,
        status: EntryStatus,
        translation: &str,
        annotation: &Annotation,
    ) -> Result<StepOutcome, SessionError> {
        let Some(sentence) = self.sentences.get(self.index) else {
            return Err(SessionError::Completed);
        };
        if let Some(taxonomy) = &self.taxonomy {
            annotation.check(taxonomy.as_ref())?;
        }

        let mut entry = SubmissionEntry::new(
            &self.id,
            self.user_name.clone(),
            self.unit.clone(),
            status,
            self.clock.now(),
        );
        entry.sentence.clone_from(sentence);
        entry.translation = translation.to_owned();
        entry.particle = annotation.particle_field();
        entry.particle_meaning = annotation.meaning_field();

        let append_error = match self.remote.append(&entry).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(
                    session = %self.id,
                    unit = %self.unit,
                    index = self.index,
                    error = %err,
                    "remote append failed, continuing"
                );
                Some(err.to_string())
            }
        };

        let total = u32::try_from(self.sentences.len()).unwrap_or(u32::MAX);
        let completed = u32::try_from(self.index + 1).unwrap_or(u32::MAX);
        let progress = self
            .progress
            .record_progress(&self.unit, total, completed)
            .await?;

        self.index += 1;
        let finished = self.is_finished();
        if finished {
            tracing::info!(session = %self.id, unit = %self.unit, "session finished");
        }

        Ok(StepOutcome {
            entry,
            progress,
            append_error,
            finished,
        })
    }
}
