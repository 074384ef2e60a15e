use crate::feed::Feed;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub feeds: Vec<Feed>,
}

impl Category {
    pub fn new(id: i64, title: &str, parent_id: Option<i64>) -> Self {
        Self {
            id,
            title: title.to_string(),
            parent_id,
            feeds: vec![],
        }
    }

    pub fn with_feeds(mut self, feeds: Vec<Feed>) -> Self {
        self.feeds = feeds;
        self
    }
}
