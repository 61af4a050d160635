// src/structured.rs
//! Per-domain structured extraction. Each known host family gets its own
//! field set (article platform, forum, Q&A, video platform, generic blog),
//! behind a closed enum exposing only the accessors the credibility model
//! actually reads. Unmatched domains fall through to `Unknown`.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A community-validation signal observed in page text, kept as the raw token
/// (e.g. `"1.2k"`) so scoring can normalize it once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleFields {
    pub author: Option<String>,
    pub author_credentials: Option<String>,
    pub author_verified: bool,
    pub publish_date: Option<String>,
    pub claps: Vec<String>,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForumFields {
    pub author: Option<String>,
    pub upvotes: Vec<String>,
    pub comments: Vec<String>,
    pub snippets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaFields {
    pub author: Option<String>,
    pub author_credentials: Option<String>,
    pub upvotes: Vec<String>,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoFields {
    pub channel: Option<String>,
    pub subscribers: Vec<String>,
    pub likes: Vec<String>,
    pub comments: Vec<String>,
    pub publish_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogFields {
    pub author: Option<String>,
    pub publish_date: Option<String>,
    pub snippets: Vec<String>,
}

/// Closed set of per-domain structured field bags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredFields {
    Article(ArticleFields),
    Forum(ForumFields),
    Qa(QaFields),
    Video(VideoFields),
    GenericBlog(BlogFields),
    Unknown,
}

impl StructuredFields {
    /// Select the extractor by matching the URL against known host
    /// substrings; unmatched hosts get the generic blog extractor when the
    /// text looks like prose, else `Unknown`.
    pub fn extract(url: &str, text: &str) -> Self {
        let u = url.to_ascii_lowercase();
        if u.contains("medium.com") || u.contains("substack.com") {
            Self::Article(extract_article(text))
        } else if u.contains("reddit.com") {
            Self::Forum(extract_forum(text))
        } else if u.contains("quora.com") || u.contains("stackexchange.com") {
            Self::Qa(extract_qa(text))
        } else if u.contains("youtube") || u.contains("youtu.be") {
            Self::Video(extract_video(text))
        } else if text.len() >= 80 {
            Self::GenericBlog(extract_blog(text))
        } else {
            Self::Unknown
        }
    }

    pub fn author_verified(&self) -> bool {
        matches!(self, Self::Article(a) if a.author_verified)
    }

    /// Maximum subscriber/follower token observed, still unnormalized.
    pub fn subscriber_tokens(&self) -> &[String] {
        match self {
            Self::Video(v) => &v.subscribers,
            _ => &[],
        }
    }

    pub fn author_credentials(&self) -> Option<&str> {
        match self {
            Self::Article(a) => a.author_credentials.as_deref(),
            Self::Qa(q) => q.author_credentials.as_deref(),
            _ => None,
        }
    }

    pub fn publish_date(&self) -> Option<&str> {
        match self {
            Self::Article(a) => a.publish_date.as_deref(),
            Self::Video(v) => v.publish_date.as_deref(),
            Self::GenericBlog(b) => b.publish_date.as_deref(),
            _ => None,
        }
    }

    /// All community-validation signals as (name, raw token) pairs.
    pub fn community_signals(&self) -> Vec<Signal> {
        fn push(out: &mut Vec<Signal>, name: &str, tokens: &[String]) {
            for t in tokens {
                out.push(Signal {
                    name: name.to_string(),
                    value: t.clone(),
                });
            }
        }
        let mut out = Vec::new();
        match self {
            Self::Article(a) => {
                push(&mut out, "claps", &a.claps);
                push(&mut out, "comments", &a.comments);
            }
            Self::Forum(f) => {
                push(&mut out, "upvotes", &f.upvotes);
                push(&mut out, "comments", &f.comments);
            }
            Self::Qa(q) => {
                push(&mut out, "upvotes", &q.upvotes);
                push(&mut out, "comments", &q.answers);
            }
            Self::Video(v) => {
                push(&mut out, "likes", &v.likes);
                push(&mut out, "comments", &v.comments);
                push(&mut out, "subscribers", &v.subscribers);
            }
            Self::GenericBlog(_) | Self::Unknown => {}
        }
        out
    }

    /// Metadata-shaped view for attaching to an `Insight`. A serialization
    /// failure degrades to null rather than aborting extraction.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/* ----------------------------
Shared field miners
---------------------------- */

fn counted(text: &str, noun: &str) -> Vec<String> {
    // One compiled regex per noun is overkill; build on the fly but bound hits.
    let pattern = format!(r"(?i)([\d][\d,]*(?:\.\d+)?\s*[km]?)\s*{noun}");
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    re.captures_iter(text)
        .take(5)
        .map(|c| c[1].trim().to_string())
        .collect()
}

fn author_of(text: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        // Case-sensitive name part so "by switching to" is not an author.
        Regex::new(r"\b[Bb]y\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})").unwrap()
    });
    re.captures(text).map(|c| c[1].to_string())
}

fn credentials_of(text: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(ph\.?d|professor|researcher|data scientist|founder|marketer|growth (?:coach|consultant|strategist)|social media manager)\b",
        )
        .unwrap()
    });
    re.find(text).map(|m| m.as_str().to_string())
}

fn publish_date_of(text: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:published|posted|updated)(?:\s+on)?\s*:?\s*(\d{4}-\d{2}-\d{2}|[A-Za-z]{3,9}\.?\s+\d{1,2},?\s+\d{4})",
        )
        .unwrap()
    });
    re.captures(text).map(|c| c[1].to_string())
}

fn sample_snippets(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() > 40 && s.len() < 240)
        .take(3)
        .map(str::to_string)
        .collect()
}

fn extract_article(text: &str) -> ArticleFields {
    ArticleFields {
        author: author_of(text),
        author_credentials: credentials_of(text),
        author_verified: text.to_ascii_lowercase().contains("verified"),
        publish_date: publish_date_of(text),
        claps: counted(text, "claps"),
        comments: counted(text, "(?:comments|responses)"),
    }
}

fn extract_forum(text: &str) -> ForumFields {
    ForumFields {
        author: author_of(text),
        upvotes: counted(text, "(?:upvotes|points)"),
        comments: counted(text, "comments"),
        snippets: sample_snippets(text),
    }
}

fn extract_qa(text: &str) -> QaFields {
    QaFields {
        author: author_of(text),
        author_credentials: credentials_of(text),
        upvotes: counted(text, "upvotes"),
        answers: counted(text, "answers"),
    }
}

fn extract_video(text: &str) -> VideoFields {
    VideoFields {
        channel: author_of(text),
        subscribers: counted(text, "subscribers"),
        likes: counted(text, "likes"),
        comments: counted(text, "comments"),
        publish_date: publish_date_of(text),
    }
}

fn extract_blog(text: &str) -> BlogFields {
    BlogFields {
        author: author_of(text),
        publish_date: publish_date_of(text),
        snippets: sample_snippets(text),
    }
}
