use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a topic is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicCategory {
    Address,
    Tx,
}

impl TopicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicCategory::Address => "address",
            TopicCategory::Tx => "tx",
        }
    }
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relay mailbox for one pending external operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub category: TopicCategory,
    /// Callback URL handed to the mobile app; also the URL we poll
    pub url: String,
}

impl Topic {
    pub fn new(relay_base: &str, category: TopicCategory) -> Self {
        let id = Uuid::new_v4().to_string();
        let url = format!("{}/{}", relay_base.trim_end_matches('/'), id);
        Self { id, category, url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_url_single_slash() {
        let with_slash = Topic::new("https://relay.example/", TopicCategory::Tx);
        let without = Topic::new("https://relay.example", TopicCategory::Tx);

        assert_eq!(with_slash.url, format!("https://relay.example/{}", with_slash.id));
        assert_eq!(without.url, format!("https://relay.example/{}", without.id));
    }

    #[test]
    fn test_topic_ids_unique() {
        let a = Topic::new("https://relay.example/", TopicCategory::Address);
        let b = Topic::new("https://relay.example/", TopicCategory::Address);
        assert_ne!(a.id, b.id);
        assert_eq!(a.category.to_string(), "address");
    }
}
