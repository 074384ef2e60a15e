use crate::article::Article;
use crate::bridge::{
    self, Bridge, ADD_CATEGORY, ADD_FEED, GET_ARTICLES_FOR_FEED, GET_UNREAD_COUNT,
    MARK_ARTICLE_AS_READ, REFRESH_FEED,
};
use crate::feed::Feed;
use crate::error::Result;
use crate::loader::{LayoutLoader, TypedLayoutData};
use crate::tree_entry::{layout_tree, TreeEntry, TreeNode};
use crate::utils;
use cursive::theme::{BorderStyle, Palette};
use cursive::traits::With;
use cursive::views::{EditView, ListView, OnEventView, TextView};
use cursive::{
    traits::*,
    views::{Dialog, LinearLayout, Panel, SelectView},
    Cursive, CursiveRunnable,
};
use cursive_tree_view::{Placement, TreeView};
use ellipse::Ellipse;
use serde_json::{json, Value};
use std::process::Command;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

pub struct UI {
    siv: CursiveRunnable,
}

/// What the shell needs to talk to the backend after the first load.
#[derive(Clone)]
pub struct Shell {
    pub bridge: Arc<dyn Bridge>,
    pub runtime: Handle,
    pub loader: LayoutLoader,
    pub browser: Option<String>,
}

impl Shell {
    fn invoke_as<T: serde::de::DeserializeOwned>(&self, command: &str, args: Value) -> Result<T> {
        self.runtime
            .block_on(bridge::invoke_as(self.bridge.as_ref(), command, args))
    }

    fn reload(&self) -> Result<TypedLayoutData> {
        self.runtime.block_on(self.loader.load_typed(self.bridge.as_ref()))
    }
}

struct UserData {
    shell: Shell,
    layout: TypedLayoutData,
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

impl UI {
    pub fn new() -> Self {
        Self {
            siv: cursive::default(),
        }
    }

    pub fn create(&mut self, layout: TypedLayoutData, shell: Shell) {
        self.siv.set_theme(cursive::theme::Theme {
            shadow: false,
            borders: BorderStyle::Simple,
            palette: Palette::default().with(|palette| {
                use cursive::theme::BaseColor::*;

                {
                    use cursive::theme::Color::TerminalDefault;
                    use cursive::theme::PaletteColor::*;

                    palette[Background] = TerminalDefault;
                    palette[View] = TerminalDefault;
                    palette[Primary] = White.dark();
                    palette[HighlightText] = Black.dark();
                    palette[TitlePrimary] = Blue.light();
                    palette[Secondary] = Blue.light();
                    palette[Highlight] = Blue.dark();
                    palette[HighlightInactive] = Cyan.light();
                }
            }),
        });

        let mut tree = TreeView::<TreeEntry>::new();
        build_tree(&shell, &layout, &mut tree);
        tree.set_on_submit(show_feed);

        self.siv.set_user_data(UserData { shell, layout });

        self.siv.add_global_callback('R', refresh_all);
        self.siv.add_global_callback('a', add_feed_dialog);
        self.siv.add_global_callback('c', add_category_dialog);
        self.siv.add_global_callback('q', |s| s.quit());

        let mut select = SelectView::<Article>::new();
        select.set_on_submit(open_article);

        self.siv.add_fullscreen_layer(
            LinearLayout::horizontal()
                .child(
                    Panel::new(tree.with_name("tree").scrollable())
                        .title("Feeds")
                        .with_name("tree_panel")
                        .full_height()
                        .max_width(50)
                        .min_width(20),
                )
                .child(
                    Dialog::new()
                        .content(
                            OnEventView::new(select.with_name("content").scrollable())
                                .on_event('j', content_select_down)
                                .on_event('k', content_select_up)
                                .on_event('o', open_in_browser),
                        )
                        .title("Articles")
                        .with_name("panel")
                        .full_height()
                        .full_width(),
                ),
        );

        self.siv.run();
    }
}

fn shell(siv: &mut Cursive) -> Option<Shell> {
    siv.with_user_data(|user_data: &mut UserData| user_data.shell.clone())
}

fn show_error(siv: &mut Cursive, message: String) {
    error!("{}", message);
    siv.add_layer(Dialog::info(message).title("Error"));
}

fn show_feed(siv: &mut Cursive, row: usize) {
    let entry = siv
        .call_on_name("tree", move |tree: &mut TreeView<TreeEntry>| {
            tree.borrow_item(row).cloned()
        })
        .flatten()
        .unwrap_or_default();
    let feed_id = match entry.feed_id {
        Some(id) => id,
        None => return,
    };
    let shell = match shell(siv) {
        Some(shell) => shell,
        None => return,
    };

    let articles: Vec<Article> =
        match shell.invoke_as(GET_ARTICLES_FOR_FEED, json!({ "feedId": feed_id })) {
            Ok(articles) => articles,
            Err(e) => return show_error(siv, format!("Could not load articles: {}", e)),
        };

    siv.call_on_name("panel", move |view: &mut Dialog| {
        view.set_title(entry.title);
    });
    siv.call_on_name("content", move |view: &mut SelectView<Article>| {
        view.clear();
        for article in articles {
            view.add_item(article.draw(), article);
        }
    });

    if let Err(e) = siv.focus_name("content") {
        warn!("Could not focus article list: {:?}", e);
    }
}

fn open_article(siv: &mut Cursive, item: &Article) {
    if item.unread() {
        if let (Some(shell), Some(article_id)) = (shell(siv), item.id) {
            match shell.invoke_as::<Value>(MARK_ARTICLE_AS_READ, json!({ "articleId": article_id }))
            {
                Ok(_) => {
                    let mut read = item.clone();
                    read.unread = false;
                    siv.call_on_name("content", move |view: &mut SelectView<Article>| {
                        if let Some(id) = view.selected_id() {
                            view.remove_item(id);
                            view.insert_item(id, read.draw(), read);
                            view.set_selection(id);
                        }
                    });
                    decrement_unread(siv, item.feed_id);
                }
                Err(e) => warn!("Could not mark article {} as read: {}", article_id, e),
            }
        }
    }

    let text = html2text::from_read(item.content.as_bytes(), 78);
    siv.add_layer(
        Dialog::around(TextView::new(text).scrollable())
            .button("Close", |s| {
                s.pop_layer();
            })
            .title(item.title.as_str().truncate_ellipse(70))
            .max_width(80),
    );
}

fn decrement_unread(siv: &mut Cursive, feed_id: Option<i64>) {
    siv.call_on_name("tree", move |tree: &mut TreeView<TreeEntry>| {
        let feed_row = (0..tree.len()).find(|row| {
            tree.borrow_item(*row)
                .map_or(false, |item| item.is_feed() && item.feed_id == feed_id)
        });
        // the feed and every category above it
        let mut next = feed_row;
        while let Some(row) = next {
            if let Some(item) = tree.borrow_item_mut(row) {
                if let Some(count) = item.unread_count {
                    if count > 0 {
                        item.unread_count = Some(count - 1);
                    }
                }
            }
            next = tree.item_parent(row);
        }
    });
}

fn open_in_browser(siv: &mut Cursive) {
    let article = siv
        .call_on_name("content", |view: &mut SelectView<Article>| {
            view.selection().map(|a| (*a).clone())
        })
        .flatten();
    let article = match article {
        Some(article) => article,
        None => return,
    };
    let browser = match shell(siv).and_then(|s| s.browser) {
        Some(browser) => browser,
        None => return show_error(siv, "No browser configured".to_string()),
    };
    let link = article
        .link
        .clone()
        .or_else(|| utils::extract_links(&article.content).into_iter().next());
    match link {
        Some(link) => {
            info!("Opening {} with {}", link, browser);
            if let Err(e) = Command::new(&browser).arg(&link).spawn() {
                show_error(siv, format!("Could not start {}: {}", browser, e));
            }
        }
        None => show_error(siv, "Article has no link".to_string()),
    }
}

/// Category of the selected tree row, if any.
fn selected_category(siv: &mut Cursive) -> Option<i64> {
    siv.call_on_name("tree", |tree: &mut TreeView<TreeEntry>| {
        tree.row()
            .and_then(|row| tree.borrow_item(row))
            .and_then(|item| item.category_id)
    })
    .flatten()
}

fn edit_text(siv: &mut Cursive, name: &str) -> String {
    siv.call_on_name(name, |view: &mut EditView| view.get_content().to_string())
        .unwrap_or_default()
}

fn add_feed_dialog(siv: &mut Cursive) {
    let category_id = selected_category(siv);
    siv.add_layer(
        Dialog::around(
            ListView::new()
                .child("Url", EditView::new().with_name("feed_url").min_width(50))
                .child("Title", EditView::new().with_name("feed_title")),
        )
        .title("Add feed")
        .button("Add", move |s| {
            let url = edit_text(s, "feed_url");
            let title = edit_text(s, "feed_title");
            s.pop_layer();
            if url.trim().is_empty() {
                return;
            }
            let shell = match shell(s) {
                Some(shell) => shell,
                None => return,
            };
            let args = json!({ "url": url.trim(), "title": title, "categoryId": category_id });
            match shell.invoke_as::<Feed>(ADD_FEED, args) {
                Ok(feed) => {
                    info!("Subscribed to {}", feed.xml_url);
                    reload_tree(s);
                }
                Err(e) => show_error(s, format!("Could not add feed: {}", e)),
            }
        })
        .dismiss_button("Cancel"),
    );
}

fn add_category_dialog(siv: &mut Cursive) {
    let parent_id = selected_category(siv);
    siv.add_layer(
        Dialog::around(EditView::new().with_name("category_title").min_width(30))
            .title("Add category")
            .button("Add", move |s| {
                let title = edit_text(s, "category_title");
                s.pop_layer();
                let shell = match shell(s) {
                    Some(shell) => shell,
                    None => return,
                };
                let args = json!({ "title": title, "parentId": parent_id });
                match shell.invoke_as::<Value>(ADD_CATEGORY, args) {
                    Ok(_) => reload_tree(s),
                    Err(e) => show_error(s, format!("Could not add category: {}", e)),
                }
            })
            .dismiss_button("Cancel"),
    );
}

/// Re-fetches every feed from the network, then reloads the sidebar.
fn refresh_all(siv: &mut Cursive) {
    let (shell, layout) = match siv.with_user_data(|user_data: &mut UserData| {
        (user_data.shell.clone(), user_data.layout.clone())
    }) {
        Some(data) => data,
        None => return,
    };

    for feed_id in layout.feeds.iter().filter_map(|f| f.id) {
        if let Err(e) = shell.invoke_as::<usize>(REFRESH_FEED, json!({ "feedId": feed_id })) {
            warn!("Could not refresh feed {}: {}", feed_id, e);
        }
    }
    reload_tree(siv);
}

fn reload_tree(siv: &mut Cursive) {
    let shell = match shell(siv) {
        Some(shell) => shell,
        None => return,
    };
    let layout = match shell.reload() {
        Ok(layout) => layout,
        Err(e) => return show_error(siv, format!("Could not reload feeds: {}", e)),
    };

    let tree_layout = layout.clone();
    siv.call_on_name("tree", |tree: &mut TreeView<TreeEntry>| {
        tree.clear();
        build_tree(&shell, &tree_layout, tree);
    });
    siv.with_user_data(|user_data: &mut UserData| user_data.layout = layout);
    if let Err(e) = siv.focus_name("tree") {
        warn!("Could not focus tree: {:?}", e);
    }
}

fn with_unread_counts(shell: &Shell, node: &mut TreeNode) {
    let args = match (node.entry.feed_id, node.entry.category_id) {
        (Some(feed_id), _) => Some(json!({ "feedId": feed_id })),
        (None, Some(category_id)) => Some(json!({ "categoryId": category_id })),
        (None, None) => None,
    };
    if let Some(args) = args {
        match shell.invoke_as::<i64>(GET_UNREAD_COUNT, args) {
            Ok(count) => node.entry.unread_count = Some(count),
            Err(e) => warn!("Could not count unread for {}: {}", node.entry.title, e),
        }
    }
    for child in node.children.iter_mut() {
        with_unread_counts(shell, child);
    }
    if node.entry.feed_id.is_none() && node.entry.category_id.is_none() {
        let total = node
            .children
            .iter()
            .filter_map(|c| c.entry.unread_count)
            .sum();
        node.entry.unread_count = Some(total);
    }
}

fn insert_node(tree: &mut TreeView<TreeEntry>, node: TreeNode, placement: Placement, row: usize) {
    let inserted = if node.entry.is_feed() {
        tree.insert_item(node.entry, placement, row)
    } else {
        tree.insert_container_item(node.entry, placement, row)
    };
    if let Some(parent) = inserted {
        for child in node.children {
            insert_node(tree, child, Placement::LastChild, parent);
        }
    }
}

fn build_tree(shell: &Shell, layout: &TypedLayoutData, tree: &mut TreeView<TreeEntry>) {
    // FIXME: this element is needed purely to properly align tree elements
    tree.insert_item(TreeEntry::default(), Placement::After, 0);

    let mut nodes = layout_tree(layout);
    for node in nodes.iter_mut() {
        with_unread_counts(shell, node);
    }

    // each root lands right below the placeholder, so go backwards
    for node in nodes.into_iter().rev() {
        insert_node(tree, node, Placement::After, 0);
    }

    // FIXME: hack to properly align elements in tree view
    if tree.len() > 1 {
        tree.remove_item(0);
    }
}

fn content_select_down(s: &mut Cursive) {
    s.call_on_name("content", move |view: &mut SelectView<Article>| {
        view.select_down(1)
    });
}

fn content_select_up(s: &mut Cursive) {
    s.call_on_name("content", move |view: &mut SelectView<Article>| {
        view.select_up(1)
    });
}
