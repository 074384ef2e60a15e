//! Named-command bridge between the shell and the backend.
//!
//! The shell never touches the database or the network itself. It sends a
//! command name plus JSON arguments through a [`Bridge`] and awaits a JSON
//! reply. [`CommandRouter`] is the in-process backend side of the bridge;
//! tests substitute their own implementation.

use crate::commands::Backend;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

pub const GET_ALL_FEEDS: &str = "get_all_feeds";
pub const GET_ALL_CATEGORIES: &str = "get_all_categories";
pub const ADD_CATEGORY: &str = "add_category";
pub const FETCH_FEED: &str = "fetch_feed";
pub const ADD_FEED: &str = "add_feed";
pub const REFRESH_FEED: &str = "refresh_feed";
pub const GET_ARTICLES_FOR_FEED: &str = "get_articles_for_feed";
pub const MARK_ARTICLE_AS_READ: &str = "mark_article_as_read";
pub const MARK_ARTICLE_AS_UNREAD: &str = "mark_article_as_unread";
pub const GET_UNREAD_COUNT: &str = "get_unread_count";

/// Every command the router answers to.
pub const COMMANDS: &[&str] = &[
    GET_ALL_FEEDS,
    GET_ALL_CATEGORIES,
    ADD_CATEGORY,
    FETCH_FEED,
    ADD_FEED,
    REFRESH_FEED,
    GET_ARTICLES_FOR_FEED,
    MARK_ARTICLE_AS_READ,
    MARK_ARTICLE_AS_UNREAD,
    GET_UNREAD_COUNT,
];

#[async_trait]
pub trait Bridge: Send + Sync {
    /// Runs `command` on the backend. `args` is `Value::Null` for commands without parameters.
    async fn invoke(&self, command: &str, args: Value) -> Result<Value>;
}

/// Invokes `command` and deserializes the reply.
pub async fn invoke_as<T: DeserializeOwned>(
    bridge: &dyn Bridge,
    command: &str,
    args: Value,
) -> Result<T> {
    let value = bridge.invoke(command, args).await?;
    Ok(serde_json::from_value(value)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCategoryArgs {
    title: String,
    parent_id: Option<i64>,
}

#[derive(Deserialize)]
struct UrlArgs {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFeedArgs {
    url: String,
    title: Option<String>,
    category_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedIdArgs {
    feed_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleIdArgs {
    article_id: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UnreadCountArgs {
    feed_id: Option<i64>,
    category_id: Option<i64>,
}

fn args<T: DeserializeOwned>(command: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::InvalidArgs {
        command: command.to_string(),
        reason: e.to_string(),
    })
}

fn reply<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

pub struct CommandRouter {
    backend: Arc<Backend>,
}

impl CommandRouter {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    async fn dispatch(&self, command: &str, params: Value) -> Result<Value> {
        let backend = &self.backend;
        match command {
            GET_ALL_FEEDS => reply(backend.get_all_feeds()?),
            GET_ALL_CATEGORIES => reply(backend.get_all_categories()?),
            ADD_CATEGORY => {
                let a: AddCategoryArgs = args(command, params)?;
                reply(backend.add_category(&a.title, a.parent_id)?)
            }
            FETCH_FEED => {
                let a: UrlArgs = args(command, params)?;
                reply(backend.fetch_feed(&a.url).await?)
            }
            ADD_FEED => {
                let a: AddFeedArgs = args(command, params)?;
                reply(backend.add_feed(&a.url, a.title, a.category_id).await?)
            }
            REFRESH_FEED => {
                let a: FeedIdArgs = args(command, params)?;
                reply(backend.refresh_feed(a.feed_id).await?)
            }
            GET_ARTICLES_FOR_FEED => {
                let a: FeedIdArgs = args(command, params)?;
                reply(backend.get_articles_for_feed(a.feed_id)?)
            }
            MARK_ARTICLE_AS_READ => {
                let a: ArticleIdArgs = args(command, params)?;
                reply(backend.mark_article_as_read(a.article_id)?)
            }
            MARK_ARTICLE_AS_UNREAD => {
                let a: ArticleIdArgs = args(command, params)?;
                reply(backend.mark_article_as_unread(a.article_id)?)
            }
            GET_UNREAD_COUNT => {
                let a: UnreadCountArgs = if params.is_null() {
                    UnreadCountArgs::default()
                } else {
                    args(command, params)?
                };
                reply(backend.get_unread_count(a.feed_id, a.category_id)?)
            }
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

#[async_trait]
impl Bridge for CommandRouter {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value> {
        debug!("invoke {}", command);
        let result = self.dispatch(command, args).await;
        if let Err(e) = &result {
            error!("Command {} failed: {}", command, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{backend, RSS};
    use crate::feed::Feed;
    use serde_json::json;

    fn router() -> CommandRouter {
        CommandRouter::new(Arc::new(backend(&[("https://news.example/rss", RSS)])))
    }

    #[tokio::test]
    async fn empty_backend_returns_empty_lists() {
        let router = router();
        assert_eq!(router.invoke(GET_ALL_FEEDS, Value::Null).await.unwrap(), json!([]));
        assert_eq!(
            router.invoke(GET_ALL_CATEGORIES, Value::Null).await.unwrap(),
            json!([])
        );
    }

    #[tokio::test]
    async fn commands_take_camel_case_args() {
        let router = router();
        let category = router
            .invoke(ADD_CATEGORY, json!({ "title": "News" }))
            .await
            .unwrap();
        assert_eq!(category["title"], "News");

        let feed: Feed = invoke_as(
            &router,
            ADD_FEED,
            json!({ "url": "https://news.example/rss", "categoryId": category["id"] }),
        )
        .await
        .unwrap();
        assert_eq!(feed.category_id, category["id"].as_i64());

        let articles = router
            .invoke(GET_ARTICLES_FOR_FEED, json!({ "feedId": feed.id }))
            .await
            .unwrap();
        let article_id = articles[0]["id"].clone();
        assert_eq!(articles[0]["unread"], true);

        router
            .invoke(MARK_ARTICLE_AS_READ, json!({ "articleId": article_id }))
            .await
            .unwrap();
        let count = router
            .invoke(GET_UNREAD_COUNT, json!({ "categoryId": category["id"] }))
            .await
            .unwrap();
        assert_eq!(count, json!(0));

        let categories = router.invoke(GET_ALL_CATEGORIES, Value::Null).await.unwrap();
        assert_eq!(categories[0]["feeds"][0]["xmlUrl"], "https://news.example/rss");
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let err = router().invoke("get_feed", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(ref c) if c == "get_feed"));
    }

    #[tokio::test]
    async fn missing_args_are_rejected() {
        let err = router()
            .invoke(GET_ARTICLES_FOR_FEED, json!({ "feed": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgs { ref command, .. } if command == GET_ARTICLES_FOR_FEED));
    }

    #[test]
    fn every_command_is_routed() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let router = router();
        for command in COMMANDS {
            let result = rt.block_on(router.invoke(command, Value::Null));
            assert!(!matches!(result, Err(Error::UnknownCommand(_))), "{}", command);
        }
    }
}
