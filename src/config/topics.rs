//! The closed topic catalog.
//!
//! Analysis output is constrained to these topics; unknown values are dropped
//! during validation. The catalog can be overridden from the configuration
//! file (`video_topics`).

/// Canonical topic catalog used when the configuration does not override it.
pub const DEFAULT_TOPICS: &[&str] = &[
    "Technology",
    "Science",
    "Education",
    "History",
    "Geography",
    "Travel",
    "Food",
    "Cooking",
    "Health",
    "Fitness",
    "Medicine",
    "Psychology",
    "Philosophy",
    "Religion",
    "Politics",
    "Economics",
    "Business",
    "Finance",
    "Marketing",
    "Entrepreneurship",
    "Career",
    "Law",
    "Environment",
    "Nature",
    "Animals",
    "Space",
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "Engineering",
    "Architecture",
    "Art",
    "Music",
    "Cinema",
    "Literature",
    "Theatre",
    "Photography",
    "Fashion",
    "Design",
    "Sports",
    "Gaming",
    "Hobbies",
    "Family",
    "Relationships",
    "Culture",
    "Society",
    "News",
    "Transportation",
    "Cars",
    "Agriculture",
    "Weather",
    "Language Learning",
    "Everyday Life",
    "Humor",
];

/// Build the default catalog as owned strings for `Settings`.
pub fn default_topic_catalog() -> Vec<String> {
    DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_size_and_uniqueness() {
        assert!(DEFAULT_TOPICS.len() >= 50 && DEFAULT_TOPICS.len() <= 60);

        let mut lowered: Vec<String> = DEFAULT_TOPICS.iter().map(|t| t.to_lowercase()).collect();
        lowered.sort();
        lowered.dedup();
        assert_eq!(lowered.len(), DEFAULT_TOPICS.len());
    }
}
