/// Placeholder label suggestions
///
/// The session asks a `SuggestionProvider` for starting values whenever an
/// image has no staged annotation. The shipped provider just picks random
/// entries from the form vocabularies; a trained model can replace it by
/// implementing the same trait.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;

use super::edit::{
    Annotation, CENTERING_LEVELS, DIAGNOSTIC_UTILITIES, FIELD_OF_VIEW_LEVELS,
    ILLUMINATION_LEVELS, LATERALITIES, OBSTRUCTIONS, QUALITY_GRADES, SHARPNESS_LEVELS,
    STUDY_TYPES,
};

/// Source of default form values for an image
pub trait SuggestionProvider {
    /// Suggest values for the image at `path`.
    ///
    /// Implementations must return an annotation with no artifact flags
    /// and no notes.
    fn suggest(&mut self, path: &Path) -> Annotation;

    /// Short name shown in the status line
    fn name(&self) -> &str;
}

/// Random picks from the fixed vocabularies
pub struct RandomSuggester<R: Rng = StdRng> {
    rng: R,
}

impl RandomSuggester<StdRng> {
    /// Seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, handy for demos and tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSuggester<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomSuggester<R> {
    fn pick(&mut self, options: &[&str]) -> String {
        options
            .choose(&mut self.rng)
            .map(|option| option.to_string())
            .unwrap_or_default()
    }
}

impl<R: Rng> SuggestionProvider for RandomSuggester<R> {
    fn suggest(&mut self, path: &Path) -> Annotation {
        log::debug!("Suggesting random labels for {}", path.display());

        Annotation {
            study_type: self.pick(STUDY_TYPES),
            laterality: self.pick(LATERALITIES),
            sharpness: self.pick(SHARPNESS_LEVELS),
            illumination: self.pick(ILLUMINATION_LEVELS),
            centering: self.pick(CENTERING_LEVELS),
            field_of_view: self.pick(FIELD_OF_VIEW_LEVELS),
            obstructions: self.pick(OBSTRUCTIONS),
            quality: self.pick(QUALITY_GRADES),
            diagnostic_utility: self.pick(DIAGNOSTIC_UTILITIES),
            ..Annotation::default()
        }
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_come_from_vocabularies() {
        let mut suggester = RandomSuggester::with_seed(7);
        for _ in 0..20 {
            let a = suggester.suggest(Path::new("/scans/a.png"));
            assert!(STUDY_TYPES.contains(&a.study_type.as_str()));
            assert!(LATERALITIES.contains(&a.laterality.as_str()));
            assert!(SHARPNESS_LEVELS.contains(&a.sharpness.as_str()));
            assert!(ILLUMINATION_LEVELS.contains(&a.illumination.as_str()));
            assert!(CENTERING_LEVELS.contains(&a.centering.as_str()));
            assert!(FIELD_OF_VIEW_LEVELS.contains(&a.field_of_view.as_str()));
            assert!(OBSTRUCTIONS.contains(&a.obstructions.as_str()));
            assert!(QUALITY_GRADES.contains(&a.quality.as_str()));
            assert!(DIAGNOSTIC_UTILITIES.contains(&a.diagnostic_utility.as_str()));
            assert!(a.artifacts.is_empty());
            assert!(a.doctor_notes.is_empty());
        }
    }

    #[test]
    fn test_same_seed_same_suggestions() {
        let path = Path::new("/scans/a.png");
        let mut first = RandomSuggester::with_seed(42);
        let mut second = RandomSuggester::with_seed(42);
        assert_eq!(first.suggest(path), second.suggest(path));
    }
}
