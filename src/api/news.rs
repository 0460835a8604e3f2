use super::client::ScoreSightClient;
use super::error::{ApiError, Outcome};
use crate::models::{ArticleKind, BlogAuthor, BlogPost, NewsArticle, NewsCategory, User};
use crate::utils::fallback::sample_news;
use crate::utils::store::{
    load_json, save_json, SessionStore, StoreError, BLOG_POSTS_KEY, SAVED_ARTICLES_KEY,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

const NEWS_PATH: &str = "/api/news/epl";
pub const DEFAULT_NEWS_LIMIT: u32 = 20;
const EXCERPT_LENGTH: usize = 150;

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    pub_date: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl NewsItem {
    fn into_article(self, index: usize) -> NewsArticle {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "No title available".to_string());
        let category = NewsCategory::from_title(&title);

        NewsArticle {
            id: self.id.unwrap_or_else(|| format!("news-{}", index)),
            content: self
                .content
                .or_else(|| self.summary.clone())
                .unwrap_or_default(),
            excerpt: self
                .summary
                .unwrap_or_else(|| "Click to read more...".to_string()),
            author: "News Source".to_string(),
            published_at: self
                .published
                .or(self.pub_date)
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            source: self.source.unwrap_or_else(|| "Unknown Source".to_string()),
            link: self.link,
            image_url: self.image_url,
            title,
            category,
            kind: ArticleKind::News,
            likes: 0,
            comments: 0,
        }
    }
}

impl ScoreSightClient {
    pub async fn fetch_news(&self, limit: u32) -> Result<Vec<NewsArticle>, ApiError> {
        let request = self.get(NEWS_PATH).query(&[("limit", limit)]);
        let response: NewsResponse = self.send_json(request).await?;

        if !response.success || response.data.is_empty() {
            return Err(ApiError::Decode("news feed returned no articles".to_string()));
        }

        Ok(response
            .data
            .into_iter()
            .enumerate()
            .map(|(i, item)| item.into_article(i))
            .collect())
    }

    /// Latest headlines, falling back to sample articles
    pub async fn news(&self, limit: u32) -> Outcome<Vec<NewsArticle>> {
        Outcome::or_fallback(self.fetch_news(limit).await, sample_news)
    }
}

/// Fields a user fills in when writing a post
#[derive(Debug, Clone, Default)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
}

/// User-authored posts and saved article ids, cached in the session store
pub struct BlogShelf {
    store: Arc<dyn SessionStore>,
}

impl BlogShelf {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Newest first
    pub fn posts(&self) -> Result<Vec<BlogPost>, StoreError> {
        Ok(load_json(self.store.as_ref(), BLOG_POSTS_KEY)?.unwrap_or_default())
    }

    pub fn publish(&self, draft: BlogDraft, author: &User) -> Result<BlogPost, ApiError> {
        let title = draft.title.trim();
        let content = draft.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ApiError::Validation(
                "A post needs a title and some content".to_string(),
            ));
        }

        let excerpt = draft
            .excerpt
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| excerpt_of(content));

        let mut posts = self.posts()?;
        let now = Utc::now();
        let post = BlogPost {
            id: format!("blog-{}-{}", now.timestamp_millis(), posts.len() + 1),
            title: title.to_string(),
            content: content.to_string(),
            excerpt,
            author: BlogAuthor {
                id: author.id.clone(),
                name: author.display_name(),
                avatar: None,
            },
            published_at: now.to_rfc3339(),
            tags: draft
                .tags
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            likes: 0,
            comments: 0,
            is_published: true,
        };

        posts.insert(0, post.clone());
        save_json(self.store.as_ref(), BLOG_POSTS_KEY, &posts)?;
        Ok(post)
    }

    /// Returns whether a post was removed
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut posts = self.posts()?;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Ok(false);
        }
        save_json(self.store.as_ref(), BLOG_POSTS_KEY, &posts)?;
        Ok(true)
    }

    pub fn saved_articles(&self) -> Result<Vec<String>, StoreError> {
        Ok(load_json(self.store.as_ref(), SAVED_ARTICLES_KEY)?.unwrap_or_default())
    }

    /// Save or unsave an article; returns true if it is now saved
    pub fn toggle_saved(&self, article_id: &str) -> Result<bool, StoreError> {
        let mut saved = self.saved_articles()?;
        let now_saved = if let Some(pos) = saved.iter().position(|id| id == article_id) {
            saved.remove(pos);
            false
        } else {
            saved.push(article_id.to_string());
            true
        };
        save_json(self.store.as_ref(), SAVED_ARTICLES_KEY, &saved)?;
        Ok(now_saved)
    }
}

fn excerpt_of(content: &str) -> String {
    if content.chars().count() <= EXCERPT_LENGTH {
        return content.to_string();
    }
    let cut: String = content.chars().take(EXCERPT_LENGTH).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::store::MemoryStore;

    fn author() -> User {
        User {
            id: "u1".to_string(),
            email: "fan@example.com".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Fan".to_string(),
            token: "t".to_string(),
        }
    }

    #[test]
    fn test_news_item_defaults() {
        let item: NewsItem = serde_json::from_str(
            r#"{"title": "Chelsea complete deal for striker", "summary": "Done deal", "pubDate": "2024-01-01"}"#,
        )
        .unwrap();
        let article = item.into_article(3);
        assert_eq!(article.id, "news-3");
        assert_eq!(article.category, NewsCategory::Transfer);
        assert_eq!(article.excerpt, "Done deal");
        assert_eq!(article.content, "Done deal");
        assert_eq!(article.published_at, "2024-01-01");
        assert_eq!(article.source, "Unknown Source");

        let empty: NewsItem = serde_json::from_str("{}").unwrap();
        let article = empty.into_article(0);
        assert_eq!(article.title, "No title available");
        assert_eq!(article.excerpt, "Click to read more...");
    }

    #[test]
    fn test_publish_and_delete_posts() {
        let shelf = BlogShelf::new(Arc::new(MemoryStore::new()));
        let first = shelf
            .publish(
                BlogDraft {
                    title: "Title race".to_string(),
                    content: "x".repeat(400),
                    excerpt: None,
                    tags: vec![" Analysis ".to_string(), "".to_string()],
                },
                &author(),
            )
            .unwrap();
        assert!(first.excerpt.ends_with("..."));
        assert_eq!(first.tags, vec!["analysis".to_string()]);
        assert_eq!(first.author.name, "Sam Fan");

        assert_eq!(shelf.posts().unwrap().len(), 1);
        assert!(shelf.delete(&first.id).unwrap());
        assert!(!shelf.delete(&first.id).unwrap());
        assert!(shelf.posts().unwrap().is_empty());
    }

    #[test]
    fn test_publish_requires_title_and_content() {
        let shelf = BlogShelf::new(Arc::new(MemoryStore::new()));
        let err = shelf
            .publish(
                BlogDraft {
                    title: "  ".to_string(),
                    content: "body".to_string(),
                    ..Default::default()
                },
                &author(),
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_toggle_saved() {
        let shelf = BlogShelf::new(Arc::new(MemoryStore::new()));
        assert!(shelf.toggle_saved("1").unwrap());
        assert!(shelf.toggle_saved("2").unwrap());
        assert!(!shelf.toggle_saved("1").unwrap());
        assert_eq!(shelf.saved_articles().unwrap(), vec!["2".to_string()]);
    }
}
