use crate::utils;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Option<i64>,
    pub feed_id: Option<i64>,
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub content: String,
    pub pub_date: Option<i64>,
    pub unread: bool,
}

impl Article {
    pub fn builder() -> ArticleBuilder {
        ArticleBuilder::default()
    }

    pub fn unread(&self) -> bool {
        self.unread
    }

    pub fn draw(&self) -> String {
        let unread = if self.unread() { "N" } else { " " };
        let date = self
            .pub_date
            .map(utils::formatted_pub_date)
            .unwrap_or_else(|| " ".repeat(16));
        format!("{} {} {}", date, unread, self.title)
    }
}

#[derive(Default)]
pub struct ArticleBuilder {
    id: Option<i64>,
    feed_id: Option<i64>,
    guid: Option<String>,
    title: Option<String>,
    link: Option<String>,
    content: Option<String>,
    pub_date: Option<i64>,
    unread: Option<bool>,
}

impl ArticleBuilder {
    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn feed_id(mut self, feed_id: i64) -> Self {
        self.feed_id = Some(feed_id);
        self
    }

    pub fn guid(mut self, guid: String) -> Self {
        self.guid = Some(guid);
        self
    }

    pub fn title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }

    pub fn pub_date(mut self, pub_date: Option<i64>) -> Self {
        self.pub_date = pub_date;
        self
    }

    pub fn unread(mut self, unread: bool) -> Self {
        self.unread = Some(unread);
        self
    }

    /// Articles start unread. A missing guid falls back to the link, then the title.
    pub fn build(self) -> Article {
        let title = self.title.unwrap_or_default();
        let guid = self
            .guid
            .filter(|g| !g.is_empty())
            .or_else(|| self.link.clone())
            .unwrap_or_else(|| title.clone());
        Article {
            id: self.id,
            feed_id: self.feed_id,
            guid,
            title,
            link: self.link,
            content: self.content.unwrap_or_default(),
            pub_date: self.pub_date,
            unread: self.unread.unwrap_or(true),
        }
    }
}
