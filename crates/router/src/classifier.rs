//! Local/cloud classification.

use switchyard_config::ClassifierConfig;
use switchyard_core::tier::RouteTier;

/// Decides whether a message needs a cloud provider.
///
/// Any configured keyword (case-insensitive substring) or a message longer
/// than the threshold sends it to the cloud; everything else stays local.
#[derive(Debug, Clone)]
pub struct MessageClassifier {
    keywords: Vec<String>,
    long_message_threshold: usize,
}

impl MessageClassifier {
    pub fn new<I, S>(keywords: I, long_message_threshold: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            long_message_threshold,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(&config.cloud_keywords, config.long_message_threshold)
    }

    pub fn classify(&self, text: &str) -> RouteTier {
        if text.chars().count() > self.long_message_threshold {
            return RouteTier::Cloud;
        }

        let lowered = text.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            RouteTier::Cloud
        } else {
            RouteTier::Local
        }
    }
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}
