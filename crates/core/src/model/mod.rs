mod annotation;
mod catalog;
mod entry;
mod ids;
mod progress;
mod settings;
mod stats;

pub use annotation::{
    Annotation, AnnotationError, MeaningChoice, ParticleChoice, ParticleTaxonomy,
    VARIATION_PARTICLES,
};
pub use catalog::{Catalog, CatalogError, Manifest};
pub use entry::{EntryStatus, EntryValidationError, EntryWire, SubmissionEntry};
pub use ids::{SessionId, WorkUnitId, WorkUnitIdError};
pub use progress::ProgressRecord;
pub use settings::{
    DEFAULT_CACHE_SECS, DEFAULT_TIMEOUT_SECS, RemoteSettings, RemoteSettingsDraft,
    RemoteSettingsError,
};
pub use stats::{
    AllStats, FileStats, LastUpdated, MINUTES_PER_ENTRY, OverallStats, StatusLabel, UnitTally,
    percent_of,
};
