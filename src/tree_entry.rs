use crate::category::Category;
use crate::feed::Feed;
use crate::loader::TypedLayoutData;
use std::collections::HashSet;
use std::fmt;

pub const UNCATEGORISED: &str = "Uncategorised";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TreeEntry {
    pub title: String,
    pub feed_id: Option<i64>,
    pub category_id: Option<i64>,
    pub unread_count: Option<i64>,
}

impl TreeEntry {
    pub fn is_feed(&self) -> bool {
        self.feed_id.is_some()
    }
}

impl fmt::Display for TreeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unread_count {
            Some(count) if count > 0 => write!(f, "{} ({})", self.title, count),
            _ => write!(f, "{}", self.title),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub entry: TreeEntry,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(entry: TreeEntry) -> Self {
        Self {
            entry,
            children: vec![],
        }
    }
}

fn feed_node(feed: &Feed) -> TreeNode {
    TreeNode::leaf(TreeEntry {
        title: feed.title.clone(),
        feed_id: feed.id,
        category_id: feed.category_id,
        unread_count: None,
    })
}

/// Sidebar layout: categories nest by parent and hold their feeds. Feeds
/// without a known category go under [`UNCATEGORISED`]. Without categories
/// the sidebar is a flat feed list.
pub fn layout_tree(data: &TypedLayoutData) -> Vec<TreeNode> {
    let categories = match &data.categories {
        Some(categories) => categories,
        None => return data.feeds.iter().map(feed_node).collect(),
    };

    let known: HashSet<i64> = categories.iter().map(|c| c.id).collect();

    fn children_of(
        parent: Option<i64>,
        data: &TypedLayoutData,
        categories: &[Category],
        known: &HashSet<i64>,
        seen: &mut HashSet<i64>,
    ) -> Vec<TreeNode> {
        let mut nodes = vec![];
        for category in categories {
            let is_root = category.parent_id.map_or(true, |p| !known.contains(&p));
            let matches = match parent {
                Some(parent) => category.parent_id == Some(parent),
                None => is_root,
            };
            // guard against parent cycles
            if !matches || !seen.insert(category.id) {
                continue;
            }
            let mut children = children_of(Some(category.id), data, categories, known, seen);
            children.extend(
                data.feeds
                    .iter()
                    .filter(|f| f.category_id == Some(category.id))
                    .map(feed_node),
            );
            nodes.push(TreeNode {
                entry: TreeEntry {
                    title: category.title.clone(),
                    feed_id: None,
                    category_id: Some(category.id),
                    unread_count: None,
                },
                children,
            });
        }
        nodes
    }

    let mut seen = HashSet::new();
    let mut nodes = children_of(None, data, categories, &known, &mut seen);

    let orphans: Vec<TreeNode> = data
        .feeds
        .iter()
        .filter(|f| f.category_id.map_or(true, |id| !known.contains(&id)))
        .map(feed_node)
        .collect();
    if !orphans.is_empty() {
        nodes.push(TreeNode {
            entry: TreeEntry {
                title: UNCATEGORISED.to_string(),
                ..TreeEntry::default()
            },
            children: orphans,
        });
    }
    nodes
}
