use crate::article::Article;
use crate::category::Category;
use crate::db::DB;
use crate::error::{Error, Result};
use crate::feed::{self, Feed};
use crate::http::HttpClient;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Handlers behind the bridge commands. Owns the database and the HTTP client.
pub struct Backend {
    db: Mutex<DB>,
    http: Box<dyn HttpClient>,
}

impl Backend {
    pub fn new(db: DB, http: Box<dyn HttpClient>) -> Self {
        Self {
            db: Mutex::new(db),
            http,
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, DB>> {
        self.db
            .lock()
            .map_err(|_| Error::Custom("database lock poisoned".to_string()))
    }

    pub fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        self.db()?.get_feeds()
    }

    pub fn get_all_categories(&self) -> Result<Vec<Category>> {
        let db = self.db()?;
        let mut categories = Vec::new();
        for category in db.get_categories()? {
            let feeds = db.get_feeds_for_category(category.id)?;
            categories.push(category.with_feeds(feeds));
        }
        Ok(categories)
    }

    pub fn add_category(&self, title: &str, parent_id: Option<i64>) -> Result<Category> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgs {
                command: "add_category".to_string(),
                reason: "title is empty".to_string(),
            });
        }

        let db = self.db()?;
        if let Some(parent_id) = parent_id {
            if db.get_category(parent_id)?.is_none() {
                return Err(Error::NotFound(format!("category {}", parent_id)));
            }
        }
        let id = db.create_category(title, parent_id)?;
        info!("Added category {} ({})", title, id);
        Ok(Category::new(id, title, parent_id))
    }

    /// Downloads and parses a feed without storing it.
    pub async fn fetch_feed(&self, url: &str) -> Result<Feed> {
        let content = self.http.fetch(url).await?;
        feed::parse(&content, url)
    }

    /// Adding a url that is already subscribed returns the stored feed.
    pub async fn add_feed(
        &self,
        url: &str,
        title: Option<String>,
        category_id: Option<i64>,
    ) -> Result<Feed> {
        {
            let db = self.db()?;
            if let Some(existing) = db.get_feed_by_url(url)? {
                warn!("Feed {} is already stored as {:?}", url, existing.id);
                return Ok(existing);
            }
            if let Some(category_id) = category_id {
                if db.get_category(category_id)?.is_none() {
                    return Err(Error::NotFound(format!("category {}", category_id)));
                }
            }
        }

        let mut feed = self.fetch_feed(url).await?;
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            feed.title = title;
        }
        feed.category_id = category_id;

        // another call may have stored the url while we were fetching
        let db = self.db()?;
        if let Some(existing) = db.get_feed_by_url(url)? {
            warn!("Feed {} was stored while fetching as {:?}", url, existing.id);
            return Ok(existing);
        }
        let feed_id = db.create_feed_with_articles(&feed)?;
        info!(
            "Added feed {} ({}) with {} articles",
            feed.title,
            feed_id,
            feed.articles.len()
        );
        db.get_feed(feed_id)?
            .ok_or_else(|| Error::NotFound(format!("feed {}", feed_id)))
    }

    /// Re-fetches a stored feed and returns how many articles were new.
    pub async fn refresh_feed(&self, feed_id: i64) -> Result<usize> {
        let stored = self
            .db()?
            .get_feed(feed_id)?
            .ok_or_else(|| Error::NotFound(format!("feed {}", feed_id)))?;

        let fetched = self.fetch_feed(&stored.xml_url).await?;
        let inserted = self.db()?.create_articles(feed_id, &fetched.articles)?;
        info!("Refreshed feed {}: {} new articles", feed_id, inserted);
        Ok(inserted)
    }

    pub fn get_articles_for_feed(&self, feed_id: i64) -> Result<Vec<Article>> {
        let db = self.db()?;
        if db.get_feed(feed_id)?.is_none() {
            return Err(Error::NotFound(format!("feed {}", feed_id)));
        }
        db.get_articles_for_feed(feed_id)
    }

    pub fn mark_article_as_read(&self, article_id: i64) -> Result<()> {
        self.db()?.mark_article_as_read(article_id)
    }

    pub fn mark_article_as_unread(&self, article_id: i64) -> Result<()> {
        self.db()?.mark_article_as_unread(article_id)
    }

    pub fn get_unread_count(&self, feed_id: Option<i64>, category_id: Option<i64>) -> Result<i64> {
        let db = self.db()?;
        match (feed_id, category_id) {
            (Some(feed_id), _) => db.get_feed_unread_count(feed_id),
            (None, Some(category_id)) => db.get_category_unread_count(category_id),
            (None, None) => Err(Error::InvalidArgs {
                command: "get_unread_count".to_string(),
                reason: "either feedId or categoryId is required".to_string(),
            }),
        }
    }
}
