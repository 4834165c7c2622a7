use thiserror::Error;

/// Particles whose spelling variation is recorded alongside the tag.
pub const VARIATION_PARTICLES: [&str; 3] = ["hor", "lah", "lor"];

const UNSET_PARTICLE: &str = "none";
const NO_PARTICLE: &str = "no_particle";
const OTHERS: &str = "others";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnnotationError {
    #[error("unknown particle: {0}")]
    UnknownParticle(String),

    #[error("meaning {meaning:?} is not listed for particle {particle}")]
    UnknownMeaning { particle: String, meaning: String },
}

/// Lookup of the discourse particles and their listed meanings.
///
/// The table itself lives with the presentation layer; the session only
/// needs to check choices against it.
pub trait ParticleTaxonomy: Send + Sync {
    /// Meanings listed for `particle`, or `None` if the particle is unknown.
    fn meanings(&self, particle: &str) -> Option<Vec<String>>;
}

/// Which particle the annotator tagged the sentence with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParticleChoice {
    #[default]
    Unset,
    NoParticle,
    Listed {
        tag: String,
        variation: Option<String>,
    },
    Other(String),
}

/// Which meaning the annotator picked for the particle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MeaningChoice {
    #[default]
    Unset,
    Listed(String),
    Other(String),
}

/// Particle metadata attached to one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub particle: ParticleChoice,
    pub meaning: MeaningChoice,
}

impl Annotation {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn no_particle() -> Self {
        Self {
            particle: ParticleChoice::NoParticle,
            meaning: MeaningChoice::Unset,
        }
    }

    #[must_use]
    pub fn listed(tag: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            particle: ParticleChoice::Listed {
                tag: tag.into(),
                variation: None,
            },
            meaning: MeaningChoice::Listed(meaning.into()),
        }
    }

    #[must_use]
    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        if let ParticleChoice::Listed { variation: slot, .. } = &mut self.particle {
            *slot = Some(variation.into());
        }
        self
    }

    /// Value stored in the `particle` column.
    ///
    /// Variations are kept only for `hor`, `lah` and `lor` (`"lah (lahhh)"`);
    /// an empty free-text particle falls back to `"others"`.
    #[must_use]
    pub fn particle_field(&self) -> String {
        match &self.particle {
            ParticleChoice::Unset => UNSET_PARTICLE.to_owned(),
            ParticleChoice::NoParticle => NO_PARTICLE.to_owned(),
            ParticleChoice::Listed { tag, variation } => {
                let variation = variation.as_deref().map(str::trim).unwrap_or_default();
                if !variation.is_empty() && VARIATION_PARTICLES.contains(&tag.as_str()) {
                    format!("{tag} ({variation})")
                } else {
                    tag.clone()
                }
            }
            ParticleChoice::Other(text) => non_blank_or_others(text),
        }
    }

    /// Value stored in the `particleMeaning` column. Always empty when no
    /// particle was tagged.
    #[must_use]
    pub fn meaning_field(&self) -> String {
        if matches!(self.particle, ParticleChoice::NoParticle) {
            return String::new();
        }
        match &self.meaning {
            MeaningChoice::Unset => String::new(),
            MeaningChoice::Listed(meaning) => meaning.clone(),
            MeaningChoice::Other(text) => non_blank_or_others(text),
        }
    }

    /// Check a listed particle and meaning against the taxonomy. Free-text
    /// and unset choices always pass.
    ///
    /// # Errors
    ///
    /// Returns `AnnotationError` if a listed tag or meaning is unknown.
    pub fn check(&self, taxonomy: &dyn ParticleTaxonomy) -> Result<(), AnnotationError> {
        let ParticleChoice::Listed { tag, .. } = &self.particle else {
            return Ok(());
        };
        let meanings = taxonomy
            .meanings(tag)
            .ok_or_else(|| AnnotationError::UnknownParticle(tag.clone()))?;
        if let MeaningChoice::Listed(meaning) = &self.meaning {
            if !meanings.iter().any(|m| m == meaning) {
                return Err(AnnotationError::UnknownMeaning {
                    particle: tag.clone(),
                    meaning: meaning.clone(),
                });
            }
        }
        Ok(())
    }
}

fn non_blank_or_others(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        OTHERS.to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoParticles;

    impl ParticleTaxonomy for TwoParticles {
        fn meanings(&self, particle: &str) -> Option<Vec<String>> {
            match particle {
                "lah" => Some(vec!["Appeal for accommodation".into()]),
                "meh" => Some(vec!["Marks a question involving scepticism".into()]),
                _ => None,
            }
        }
    }

    #[test]
    fn unset_and_no_particle_fields() {
        assert_eq!(Annotation::none().particle_field(), "none");
        assert_eq!(Annotation::none().meaning_field(), "");

        let mut a = Annotation::no_particle();
        a.meaning = MeaningChoice::Listed("ignored".into());
        assert_eq!(a.particle_field(), "no_particle");
        assert_eq!(a.meaning_field(), "");
    }

    #[test]
    fn variation_only_for_selected_particles() {
        let lah = Annotation::listed("lah", "Appeal for accommodation").with_variation(" lahhh ");
        assert_eq!(lah.particle_field(), "lah (lahhh)");

        let meh = Annotation::listed("meh", "x").with_variation("mehh");
        assert_eq!(meh.particle_field(), "meh");

        let blank = Annotation::listed("lor", "x").with_variation("  ");
        assert_eq!(blank.particle_field(), "lor");
    }

    #[test]
    fn free_text_falls_back_to_others() {
        let a = Annotation {
            particle: ParticleChoice::Other("  ".into()),
            meaning: MeaningChoice::Other("softener".into()),
        };
        assert_eq!(a.particle_field(), "others");
        assert_eq!(a.meaning_field(), "softener");

        let b = Annotation {
            particle: ParticleChoice::Other("leh".into()),
            meaning: MeaningChoice::Other(String::new()),
        };
        assert_eq!(b.particle_field(), "leh");
        assert_eq!(b.meaning_field(), "others");
    }

    #[test]
    fn check_against_taxonomy() {
        let taxonomy = TwoParticles;
        assert!(Annotation::listed("lah", "Appeal for accommodation").check(&taxonomy).is_ok());
        assert!(Annotation::none().check(&taxonomy).is_ok());
        assert_eq!(
            Annotation::listed("sia", "x").check(&taxonomy),
            Err(AnnotationError::UnknownParticle("sia".into()))
        );
        assert!(matches!(
            Annotation::listed("meh", "Indicate obviousness").check(&taxonomy),
            Err(AnnotationError::UnknownMeaning { .. })
        ));
    }
}
