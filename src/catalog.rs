//! Plant categories and the disease vocabulary of each category's model.
//!
//! Every supported species is one [`CatalogEntry`]: the category, the file
//! name of its model artifact, and the ordered list of disease labels that
//! the model emits probabilities for. Keeping the three together in one
//! table is deliberate: the label order must match the model's output order
//! position by position, and the registry checks the lengths at load time.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A plant species the application can classify leaves for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Apple leaves.
    Apple,
    /// Tomato leaves.
    Tomato,
    /// Corn leaves.
    Corn,
    /// Potato leaves.
    Potato,
}

impl Category {
    /// All supported categories, in the order they appear in the UI.
    pub const ALL: [Category; 4] = [
        Category::Apple,
        Category::Tomato,
        Category::Corn,
        Category::Potato,
    ];

    /// Lowercase identifier used in artifact file names.
    pub fn slug(self) -> &'static str {
        match self {
            Category::Apple => "apple",
            Category::Tomato => "tomato",
            Category::Corn => "corn",
            Category::Potato => "potato",
        }
    }

    /// Display name shown in the category selector.
    pub fn name(self) -> &'static str {
        match self {
            Category::Apple => "Apple",
            Category::Tomato => "Tomato",
            Category::Corn => "Corn",
            Category::Potato => "Potato",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown plant category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| {
                category.name().eq_ignore_ascii_case(value)
                    || category.slug().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}

/// One row of the category table: species, artifact file, output vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    /// The species this entry describes.
    pub category: Category,
    /// File name of the serialized model inside the models directory.
    pub artifact: &'static str,
    /// Disease labels in the exact order the model emits probabilities.
    pub labels: &'static [&'static str],
}

/// The fixed build-time table of supported categories.
pub const ENTRIES: [CatalogEntry; 4] = [
    CatalogEntry {
        category: Category::Apple,
        artifact: "best_apple.onnx",
        labels: &["Healthy", "Apple Rust", "Apple Scab"],
    },
    CatalogEntry {
        category: Category::Tomato,
        artifact: "best_tomato.onnx",
        labels: &[
            "Tomato Early Blight",
            "Tomato Late Blight",
            "Tomato Mosaic Virus",
            "Tomato Yellow Virus",
            "Tomato Bacterial Spot",
            "Tomato Septoria Spot",
            "Tomato Mold Leaf",
        ],
    },
    CatalogEntry {
        category: Category::Corn,
        artifact: "best_corn.onnx",
        labels: &["Gray Leaf Spot", "Corn Rust", "Corn Leaf Blight"],
    },
    CatalogEntry {
        category: Category::Potato,
        artifact: "best_potato.onnx",
        labels: &["Potato Early Blight", "Potato Late Blight", "Healthy"],
    },
];

/// Look up the catalog entry for a category.
pub fn entry(category: Category) -> &'static CatalogEntry {
    // ENTRIES is ordered by discriminant; the alignment test below pins it.
    &ENTRIES[category as usize]
}

/// The ordered disease-label vocabulary for a category.
pub fn disease_labels(category: Category) -> &'static [&'static str] {
    entry(category).labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_ordered_by_discriminant() {
        for (index, entry) in ENTRIES.iter().enumerate() {
            assert_eq!(entry.category as usize, index);
        }
    }

    #[test]
    fn every_category_has_an_entry() {
        for category in Category::ALL {
            let entry = entry(category);
            assert_eq!(entry.category, category);
            assert!(!entry.labels.is_empty());
            assert!(entry.artifact.ends_with(".onnx"));
        }
    }

    #[test]
    fn label_vocabularies_match_the_model_head_sizes() {
        assert_eq!(disease_labels(Category::Apple).len(), 3);
        assert_eq!(disease_labels(Category::Tomato).len(), 7);
        assert_eq!(disease_labels(Category::Corn).len(), 3);
        assert_eq!(disease_labels(Category::Potato).len(), 3);
    }

    #[test]
    fn parses_names_and_slugs_case_insensitively() {
        assert_eq!("Apple".parse::<Category>().unwrap(), Category::Apple);
        assert_eq!("potato".parse::<Category>().unwrap(), Category::Potato);
        assert_eq!("CORN".parse::<Category>().unwrap(), Category::Corn);
        assert!("Cactus".parse::<Category>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for category in Category::ALL {
            let parsed: Category = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }
}
