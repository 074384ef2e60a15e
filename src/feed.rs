use crate::article::Article;
use crate::error::{Error, Result};
use crate::utils;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: Option<i64>,
    pub title: String,
    pub xml_url: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Default)]
pub struct FeedBuilder {
    id: Option<i64>,
    title: Option<String>,
    xml_url: Option<String>,
    link: Option<String>,
    description: Option<String>,
    category_id: Option<i64>,
    articles: Option<Vec<Article>>,
}

impl FeedBuilder {
    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn xml_url(mut self, xml_url: String) -> Self {
        self.xml_url = Some(xml_url);
        self
    }

    pub fn link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn category_id(mut self, category_id: Option<i64>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn articles(mut self, articles: Vec<Article>) -> Self {
        self.articles = Some(articles);
        self
    }

    pub fn build(self) -> Feed {
        Feed {
            id: self.id,
            title: self.title.unwrap_or_default(),
            xml_url: self.xml_url.unwrap_or_default(),
            link: self.link,
            description: self.description,
            category_id: self.category_id,
            articles: self.articles.unwrap_or_default(),
        }
    }
}

impl Feed {
    pub fn builder() -> FeedBuilder {
        FeedBuilder::default()
    }

    fn from_rss(channel: rss::Channel, xml_url: &str) -> Self {
        let articles = channel
            .items()
            .iter()
            .map(|item| {
                let content = item
                    .content()
                    .or_else(|| item.description())
                    .unwrap_or_default();
                Article::builder()
                    .guid(item.guid().map(|g| g.value().to_string()).unwrap_or_default())
                    .title(item.title().unwrap_or_default().to_string())
                    .link(item.link().map(str::to_string))
                    .content(content.to_string())
                    .pub_date(item.pub_date().and_then(utils::parse_pub_date))
                    .build()
            })
            .collect();

        Feed::builder()
            .title(channel.title().to_string())
            .xml_url(xml_url.to_string())
            .link(non_empty(channel.link()))
            .description(non_empty(channel.description()))
            .articles(articles)
            .build()
    }

    fn from_atom(feed: atom_syndication::Feed, xml_url: &str) -> Self {
        let articles = feed
            .entries()
            .iter()
            .map(|entry| {
                let content = entry
                    .content()
                    .and_then(|c| c.value())
                    .map(str::to_string)
                    .or_else(|| entry.summary().map(|s| s.value.clone()))
                    .unwrap_or_default();
                let pub_date = entry.published().unwrap_or(entry.updated()).timestamp();
                Article::builder()
                    .guid(entry.id().to_string())
                    .title(entry.title().value.clone())
                    .link(alternate_link(entry.links()))
                    .content(content)
                    .pub_date(Some(pub_date))
                    .build()
            })
            .collect();

        Feed::builder()
            .title(feed.title().value.clone())
            .xml_url(xml_url.to_string())
            .link(alternate_link(feed.links()))
            .description(feed.subtitle().map(|s| s.value.clone()))
            .articles(articles)
            .build()
    }
}

/// Parses an RSS or Atom document fetched from `xml_url`.
pub fn parse(xml: &str, xml_url: &str) -> Result<Feed> {
    match rss::Channel::read_from(xml.as_bytes()) {
        Ok(channel) => {
            debug!("Parsed {} as RSS", xml_url);
            return Ok(Feed::from_rss(channel, xml_url));
        }
        Err(rss::Error::InvalidStartTag) | Err(rss::Error::Eof) => {}
        Err(e) => return Err(Error::XmlDeserialize(e.to_string())),
    }

    match atom_syndication::Feed::read_from(xml.as_bytes()) {
        Ok(feed) => {
            debug!("Parsed {} as Atom", xml_url);
            Ok(Feed::from_atom(feed, xml_url))
        }
        Err(atom_syndication::Error::InvalidStartTag) | Err(atom_syndication::Error::Eof) => {
            Err(Error::XmlBadFormat)
        }
        Err(e) => Err(Error::XmlDeserialize(e.to_string())),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn alternate_link(links: &[atom_syndication::Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| links.first())
        .map(|l| l.href().to_string())
}
