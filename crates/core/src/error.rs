use thiserror::Error;

use crate::model::{
    AnnotationError, CatalogError, EntryValidationError, RemoteSettingsError, WorkUnitIdError,
};

/// Any domain error from this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    WorkUnitId(#[from] WorkUnitIdError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Entry(#[from] EntryValidationError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    RemoteSettings(#[from] RemoteSettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Catalog, WorkUnitId};

    fn load(raw: &str) -> Result<usize, Error> {
        let catalog = Catalog::from_manifest_json(raw)?;
        let first = WorkUnitId::new(" ")?;
        Ok(catalog.len() + first.as_str().len())
    }

    #[test]
    fn domain_errors_convert() {
        assert!(matches!(load("{}"), Err(Error::Catalog(_))));
        assert!(matches!(
            load(r#"{"files": ["a.csv"]}"#),
            Err(Error::WorkUnitId(WorkUnitIdError::Empty))
        ));
        assert_eq!(
            Error::from(WorkUnitIdError::Empty).to_string(),
            "work unit id cannot be empty"
        );
    }
}
