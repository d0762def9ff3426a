//! Confusable character classes used to soften the edit distance.

use ahash::AHashSet;

use crate::config::ConfusableClass;

/// Fraction of the class weight subtracted per confusable substitution.
pub const CONFUSABLE_BONUS_FACTOR: f64 = 0.3;

/// Compiled lookup over the configured confusable classes.
///
/// Classes are ordered; when a pair of characters shares more than one class,
/// the earliest one in the configuration wins.
#[derive(Debug, Clone)]
pub struct ConfusableClasses {
    classes: Vec<(AHashSet<char>, f64)>,
}

impl ConfusableClasses {
    /// Compile the configured classes.
    pub fn new(classes: &[ConfusableClass]) -> Self {
        let classes = classes
            .iter()
            .map(|class| {
                let members: AHashSet<char> =
                    class.chars.chars().map(|c| c.to_ascii_lowercase()).collect();
                (members, class.weight)
            })
            .collect();

        ConfusableClasses { classes }
    }

    /// Compile the default classes.
    pub fn default_classes() -> Self {
        ConfusableClasses::new(&ConfusableClass::default_classes())
    }

    /// Bonus earned by substituting `a` for `b`.
    ///
    /// Non-zero only when both characters belong to the same class; the bonus
    /// is `CONFUSABLE_BONUS_FACTOR × class weight`.
    pub fn substitution_bonus(&self, a: char, b: char) -> f64 {
        if a == b {
            return 0.0;
        }
        let a = a.to_ascii_lowercase();
        let b = b.to_ascii_lowercase();
        for (members, weight) in &self.classes {
            if members.contains(&a) && members.contains(&b) {
                return CONFUSABLE_BONUS_FACTOR * weight;
            }
        }
        0.0
    }
}
