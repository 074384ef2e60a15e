//! Page data for the top-level layout.
//!
//! Before the shell draws its first frame it runs [`LayoutLoader::load`],
//! which asks the backend for every feed and, optionally, every category.
//! The loader does not look inside the records. It hands them to the view
//! exactly as the backend returned them.

use crate::bridge::{Bridge, GET_ALL_CATEGORIES, GET_ALL_FEEDS};
use crate::category::Category;
use crate::error::{Error, Result};
use crate::feed::Feed;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The shell is a static single-page app: every route is prerendered and
/// nothing is rendered server side.
pub const PRERENDER: bool = true;
pub const SSR: bool = false;

/// Build-time route switches. They do not change how data is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub prerender: bool,
    pub ssr: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            prerender: PRERENDER,
            ssr: SSR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    pub feeds: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub categories: Option<Vec<Value>>,
}

/// [`LayoutData`] with the records decoded for the view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedLayoutData {
    pub feeds: Vec<Feed>,
    pub categories: Option<Vec<Category>>,
}

impl LayoutData {
    pub fn typed(&self) -> Result<TypedLayoutData> {
        let feeds = self
            .feeds
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Feed>, _>>()?;
        let categories = match &self.categories {
            Some(categories) => Some(
                categories
                    .iter()
                    .cloned()
                    .map(serde_json::from_value)
                    .collect::<std::result::Result<Vec<Category>, _>>()?,
            ),
            None => None,
        };
        Ok(TypedLayoutData { feeds, categories })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutLoader {
    with_categories: bool,
}

impl Default for LayoutLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LayoutLoader {
    pub fn new(with_categories: bool) -> Self {
        Self { with_categories }
    }

    /// Feeds only.
    pub fn feeds_only() -> Self {
        Self::new(false)
    }

    /// Fetches feeds, then categories if enabled. Bridge errors propagate as-is.
    pub async fn load(&self, bridge: &dyn Bridge) -> Result<LayoutData> {
        let feeds = into_list(GET_ALL_FEEDS, bridge.invoke(GET_ALL_FEEDS, Value::Null).await?)?;
        debug!(?feeds, "feeds");

        let categories = if self.with_categories {
            let categories = into_list(
                GET_ALL_CATEGORIES,
                bridge.invoke(GET_ALL_CATEGORIES, Value::Null).await?,
            )?;
            debug!(?categories, "categories");
            Some(categories)
        } else {
            None
        };

        Ok(LayoutData { feeds, categories })
    }

    pub async fn load_typed(&self, bridge: &dyn Bridge) -> Result<TypedLayoutData> {
        self.load(bridge).await?.typed()
    }
}

fn into_list(command: &str, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::UnexpectedReply {
            command: command.to_string(),
            reply: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingBridge {
        replies: HashMap<String, Value>,
        fail: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingBridge {
        fn with(mut self, command: &str, reply: Value) -> Self {
            self.replies.insert(command.to_string(), reply);
            self
        }

        fn failing(mut self, command: &str) -> Self {
            self.fail = Some(command.to_string());
            self
        }

        fn calls(&self, command: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.as_str() == command)
                .count()
        }
    }

    #[async_trait]
    impl Bridge for RecordingBridge {
        async fn invoke(&self, command: &str, _args: Value) -> Result<Value> {
            self.calls.lock().unwrap().push(command.to_string());
            if self.fail.as_deref() == Some(command) {
                return Err(Error::Custom("backend exploded".to_string()));
            }
            self.replies
                .get(command)
                .cloned()
                .ok_or_else(|| Error::UnknownCommand(command.to_string()))
        }
    }

    #[tokio::test]
    async fn feeds_pass_through_unchanged() {
        let feeds = json!([{ "id": 2, "title": "B", "extra": { "nested": [1, 2] } }]);
        let bridge = RecordingBridge::default().with(GET_ALL_FEEDS, feeds.clone());

        let data = LayoutLoader::feeds_only().load(&bridge).await.unwrap();
        assert_eq!(Value::Array(data.feeds.clone()), feeds);
        assert_eq!(data.categories, None);
        assert_eq!(bridge.calls(GET_ALL_FEEDS), 1);
        assert_eq!(bridge.calls(GET_ALL_CATEGORIES), 0);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({ "feeds": [{ "id": 2, "title": "B", "extra": { "nested": [1, 2] } }] })
        );
    }

    #[tokio::test]
    async fn loads_feeds_and_categories_once_each() {
        let bridge = RecordingBridge::default()
            .with(GET_ALL_FEEDS, json!([{ "id": 1, "title": "A" }]))
            .with(GET_ALL_CATEGORIES, json!([{ "id": 10, "name": "News" }]));

        let data = LayoutLoader::default().load(&bridge).await.unwrap();
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "feeds": [{ "id": 1, "title": "A" }],
                "categories": [{ "id": 10, "name": "News" }]
            })
        );
        assert_eq!(bridge.calls(GET_ALL_FEEDS), 1);
        assert_eq!(bridge.calls(GET_ALL_CATEGORIES), 1);
        assert_eq!(
            *bridge.calls.lock().unwrap(),
            vec![GET_ALL_FEEDS.to_string(), GET_ALL_CATEGORIES.to_string()]
        );
    }

    #[tokio::test]
    async fn empty_lists_stay_empty() {
        let bridge = RecordingBridge::default()
            .with(GET_ALL_FEEDS, json!([]))
            .with(GET_ALL_CATEGORIES, json!([]));

        let data = LayoutLoader::default().load(&bridge).await.unwrap();
        assert!(data.feeds.is_empty());
        assert_eq!(data.categories, Some(vec![]));
    }

    #[tokio::test]
    async fn bridge_failure_propagates() {
        let bridge = RecordingBridge::default()
            .with(GET_ALL_CATEGORIES, json!([]))
            .failing(GET_ALL_FEEDS);
        let err = LayoutLoader::default().load(&bridge).await.unwrap_err();
        assert!(matches!(err, Error::Custom(ref m) if m == "backend exploded"));
        // nothing else is attempted once feeds fail
        assert_eq!(bridge.calls(GET_ALL_CATEGORIES), 0);

        let bridge = RecordingBridge::default()
            .with(GET_ALL_FEEDS, json!([]))
            .failing(GET_ALL_CATEGORIES);
        assert!(LayoutLoader::default().load(&bridge).await.is_err());
    }

    #[tokio::test]
    async fn non_list_reply_is_an_error() {
        let bridge = RecordingBridge::default().with(GET_ALL_FEEDS, json!({ "id": 1 }));
        let err = LayoutLoader::feeds_only().load(&bridge).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedReply { ref command, .. } if command == GET_ALL_FEEDS
        ));

        let bridge = RecordingBridge::default()
            .with(GET_ALL_FEEDS, json!([]))
            .with(GET_ALL_CATEGORIES, Value::Null);
        assert!(matches!(
            LayoutLoader::default().load(&bridge).await,
            Err(Error::UnexpectedReply { .. })
        ));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn logs_feeds_and_categories() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let bridge = RecordingBridge::default()
            .with(GET_ALL_FEEDS, json!([{ "id": 1, "title": "Alpha feed" }]))
            .with(GET_ALL_CATEGORIES, json!([{ "id": 10, "title": "Beta category" }]));
        LayoutLoader::default().load(&bridge).await.unwrap();

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("feeds="), "{}", output);
        assert!(output.contains("Alpha feed"), "{}", output);
        assert!(output.contains("categories="), "{}", output);
        assert!(output.contains("Beta category"), "{}", output);
    }

    #[tokio::test]
    async fn typed_view_decodes_backend_records() {
        let bridge = RecordingBridge::default()
            .with(
                GET_ALL_FEEDS,
                json!([{ "id": 1, "title": "A", "xmlUrl": "https://a.example/rss",
                         "link": null, "description": null, "categoryId": 10 }]),
            )
            .with(
                GET_ALL_CATEGORIES,
                json!([{ "id": 10, "title": "News", "parentId": null }]),
            );

        let data = LayoutLoader::default().load_typed(&bridge).await.unwrap();
        assert_eq!(data.feeds[0].xml_url, "https://a.example/rss");
        assert_eq!(data.feeds[0].category_id, Some(10));
        let categories = data.categories.unwrap();
        assert_eq!(categories[0].title, "News");
        assert!(categories[0].feeds.is_empty());
    }

    #[test]
    fn route_flags_default_to_static_prerender() {
        let options = RouteOptions::default();
        assert!(options.prerender);
        assert!(!options.ssr);
    }
}
