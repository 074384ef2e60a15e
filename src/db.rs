use crate::article::Article;
use crate::category::Category;
use crate::error::{Error, Result};
use crate::feed::Feed;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

pub struct DB {
    conn: Connection,
}

const FEED_COLUMNS: &str = "id, title, xml_url, link, description, category_id";
const ARTICLE_COLUMNS: &str = "id, feed_id, guid, title, link, content, pub_date, unread";

impl DB {
    pub fn open(path: &str) -> Result<Self> {
        debug!("Opening database at {}", path);
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn create_db(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS categories (
                id              INTEGER PRIMARY KEY,
                title           TEXT NOT NULL,
                parent_id       INTEGER REFERENCES categories(id)
            );
            CREATE TABLE IF NOT EXISTS feeds (
                id              INTEGER PRIMARY KEY,
                title           TEXT NOT NULL,
                xml_url         TEXT NOT NULL UNIQUE,
                link            TEXT,
                description     TEXT,
                category_id     INTEGER REFERENCES categories(id)
            );
            CREATE TABLE IF NOT EXISTS articles (
                id            INTEGER PRIMARY KEY,
                feed_id       INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                guid          TEXT NOT NULL,
                title         TEXT NOT NULL,
                link          TEXT,
                content       TEXT NOT NULL,
                pub_date      INTEGER,
                unread        INTEGER NOT NULL DEFAULT 1,
                UNIQUE (feed_id, guid)
            );",
        )?;
        Ok(())
    }

    pub fn create_category(&self, title: &str, parent_id: Option<i64>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories (title, parent_id) VALUES (?1, ?2)",
            params![title, parent_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_category(&self, category_id: i64) -> Result<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, title, parent_id FROM categories WHERE id = ?1",
                [category_id],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, parent_id FROM categories ORDER BY id")?;

        let cat_iter = stmt.query_map([], category_from_row)?;
        let mut categories = Vec::new();
        for category in cat_iter {
            categories.push(category?);
        }
        Ok(categories)
    }

    pub fn create_feed(&self, feed: &Feed) -> Result<i64> {
        insert_feed(&self.conn, feed)
    }

    pub fn get_feed(&self, feed_id: i64) -> Result<Option<Feed>> {
        let sql = format!("SELECT {} FROM feeds WHERE id = ?1", FEED_COLUMNS);
        let feed = self
            .conn
            .query_row(&sql, [feed_id], feed_from_row)
            .optional()?;
        Ok(feed)
    }

    pub fn get_feed_by_url(&self, xml_url: &str) -> Result<Option<Feed>> {
        let sql = format!("SELECT {} FROM feeds WHERE xml_url = ?1", FEED_COLUMNS);
        let feed = self
            .conn
            .query_row(&sql, [xml_url], feed_from_row)
            .optional()?;
        Ok(feed)
    }

    pub fn get_feeds(&self) -> Result<Vec<Feed>> {
        let sql = format!("SELECT {} FROM feeds ORDER BY id", FEED_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let feeds_iter = stmt.query_map([], feed_from_row)?;
        let mut feeds = Vec::new();
        for feed in feeds_iter {
            feeds.push(feed?);
        }
        Ok(feeds)
    }

    pub fn get_feeds_for_category(&self, category_id: i64) -> Result<Vec<Feed>> {
        let sql = format!(
            "SELECT {} FROM feeds WHERE category_id = :category_id ORDER BY id",
            FEED_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let feeds_iter = stmt.query_map(&[(":category_id", &category_id)], feed_from_row)?;
        let mut feeds = Vec::new();
        for feed in feeds_iter {
            feeds.push(feed?);
        }
        Ok(feeds)
    }

    /// Stores a fetched feed together with its articles in one transaction.
    pub fn create_feed_with_articles(&self, feed: &Feed) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let feed_id = insert_feed(&tx, feed)?;
        let inserted = insert_articles(&tx, feed_id, &feed.articles)?;
        tx.commit()?;
        debug!("Stored feed {} with {} articles", feed_id, inserted);
        Ok(feed_id)
    }

    /// Inserts in one transaction; articles already stored for the feed are skipped.
    /// Returns how many rows were new.
    pub fn create_articles(&self, feed_id: i64, articles: &[Article]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = insert_articles(&tx, feed_id, articles)?;
        tx.commit()?;
        debug!("Stored {} new articles for feed {}", inserted, feed_id);
        Ok(inserted)
    }

    pub fn get_articles_for_feed(&self, feed_id: i64) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles
            WHERE feed_id = :feed_id
            ORDER BY pub_date IS NULL, pub_date DESC, id ASC",
            ARTICLE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let article_iter = stmt.query_map(&[(":feed_id", &feed_id)], article_from_row)?;
        let mut articles = Vec::new();
        for article in article_iter {
            articles.push(article?);
        }
        Ok(articles)
    }

    pub fn get_article(&self, article_id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = :id", ARTICLE_COLUMNS);
        let article = self
            .conn
            .query_row(&sql, &[(":id", &article_id)], article_from_row)
            .optional()?;
        Ok(article)
    }

    pub fn mark_article_as_read(&self, article_id: i64) -> Result<()> {
        self.set_unread(article_id, false)
    }

    pub fn mark_article_as_unread(&self, article_id: i64) -> Result<()> {
        self.set_unread(article_id, true)
    }

    fn set_unread(&self, article_id: i64, unread: bool) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "UPDATE
                articles
            SET
                unread = ?1
            WHERE
                id = ?2",
        )?;
        let updated = stmt.execute(params![unread, article_id])?;
        if updated == 0 {
            return Err(Error::NotFound(format!("article {}", article_id)));
        }
        Ok(())
    }

    pub fn get_feed_unread_count(&self, feed_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE feed_id = :feed_id AND unread = 1",
            &[(":feed_id", &feed_id)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Counts the category and every category nested below it.
    pub fn get_category_unread_count(&self, category_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "
                WITH RECURSIVE tree(id) AS (
                    SELECT :category_id
                    UNION
                    SELECT c.id FROM categories c INNER JOIN tree t ON c.parent_id = t.id
                )
                SELECT COUNT(*)
                FROM articles a
                INNER JOIN feeds f ON a.feed_id = f.id
                WHERE f.category_id IN (SELECT id FROM tree) AND a.unread = 1",
            &[(":category_id", &category_id)],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn insert_feed(conn: &Connection, feed: &Feed) -> Result<i64> {
    conn.execute(
        "INSERT INTO feeds (
            title       ,
            xml_url     ,
            link        ,
            description ,
            category_id
        ) values (
            ?1, ?2, ?3, ?4, ?5
        )",
        params![
            feed.title,
            feed.xml_url,
            feed.link,
            feed.description,
            feed.category_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_articles(conn: &Connection, feed_id: i64, articles: &[Article]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO articles (
            feed_id    ,
            guid       ,
            title      ,
            link       ,
            content    ,
            pub_date   ,
            unread
        ) values (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7
        )",
    )?;
    let mut inserted = 0;
    for article in articles {
        inserted += stmt.execute(params![
            feed_id,
            article.guid,
            article.title,
            article.link,
            article.content,
            article.pub_date,
            article.unread,
        ])?;
    }
    Ok(inserted)
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category::new(row.get(0)?, &row.get::<_, String>(1)?, row.get(2)?))
}

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    Ok(Feed::builder()
        .id(row.get(0)?)
        .title(row.get(1)?)
        .xml_url(row.get(2)?)
        .link(row.get(3)?)
        .description(row.get(4)?)
        .category_id(row.get(5)?)
        .build())
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article::builder()
        .id(row.get(0)?)
        .feed_id(row.get(1)?)
        .guid(row.get(2)?)
        .title(row.get(3)?)
        .link(row.get(4)?)
        .content(row.get(5)?)
        .pub_date(row.get(6)?)
        .unread(row.get(7)?)
        .build())
}
