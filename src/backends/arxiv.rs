//! 论文检索后端（arXiv Atom API）

use async_trait::async_trait;
use serde::Deserialize;

use crate::backends::text::{collapse_whitespace, truncate_chars};
use crate::backends::{BackendError, SearchProvider, check_status};
use crate::types::Resource;

const ENDPOINT: &str = "https://export.arxiv.org/api/query";

/// Atom feed中用到的部分，其余元素忽略
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: Option<String>,
}

pub struct ArxivProvider {
    client: reqwest::Client,
}

impl ArxivProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for ArxivProvider {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError> {
        let search_query = format!("all:{}", query);
        let max_results = limit.to_string();
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;
        let feed = check_status(response)?.text().await?;
        parse_feed(&feed)
    }
}

/// 解析Atom feed，保持feed中的相关性排序
pub fn parse_feed(feed: &str) -> Result<Vec<Resource>, BackendError> {
    if !feed.contains("<feed") {
        return Err(BackendError::Malformed("response is not an Atom feed".to_string()));
    }

    let feed: Feed = quick_xml::de::from_str(feed)
        .map_err(|e| BackendError::Malformed(format!("invalid Atom feed: {}", e)))?;

    let mut papers = Vec::new();
    for entry in feed.entries {
        let id = entry.id.trim();
        if id.is_empty() {
            continue;
        }
        let title = collapse_whitespace(&entry.title);

        // arXiv以错误条目的形式返回查询错误
        if id.contains("/api/errors") {
            return Err(BackendError::Malformed(title));
        }
        if title.is_empty() {
            continue;
        }

        let mut paper = Resource::new(title, id).with_kind("paper");
        if let Some(summary) = entry.summary.as_deref().map(collapse_whitespace)
            && !summary.is_empty()
        {
            paper = paper.with_snippet(truncate_chars(&summary, 200));
        }
        papers.push(paper);
    }

    Ok(papers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:demand forecasting</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1704.04110v3</id>
    <title>DeepAR: Probabilistic Forecasting with
      Autoregressive Recurrent Networks</title>
    <summary>  Probabilistic forecasting, i.e. estimating the probability distribution
of a time series' future given its past, is a key enabler.</summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1905.10437v4</id>
    <title>N-BEATS: Neural basis expansion analysis</title>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(FEED).unwrap();

        assert_eq!(papers.len(), 2);
        assert_eq!(
            papers[0].title,
            "DeepAR: Probabilistic Forecasting with Autoregressive Recurrent Networks"
        );
        assert_eq!(papers[0].url, "http://arxiv.org/abs/1704.04110v3");
        assert!(papers[0].snippet.as_deref().unwrap().starts_with("Probabilistic forecasting"));
        assert_eq!(papers[1].title, "N-BEATS: Neural basis expansion analysis");
        assert!(papers[1].snippet.is_none());
    }

    #[test]
    fn test_parse_feed_decodes_xml_escapes() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>http://arxiv.org/abs/1</id><title>Q&amp;A over &lt;Tables&gt;</title><summary>Joins &amp; lookups</summary></entry></feed>"#;

        let papers = parse_feed(feed).unwrap();

        assert_eq!(papers[0].title, "Q&A over <Tables>");
        assert_eq!(papers[0].snippet.as_deref(), Some("Joins & lookups"));
    }

    #[test]
    fn test_parse_feed_ignores_extension_elements() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/2001.00001v1</id>
    <updated>2020-01-01T00:00:00Z</updated>
    <title>Graph Networks for Routing</title>
    <author><name>A. Author</name></author>
    <author><name>B. Author</name></author>
    <arxiv:primary_category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <link href="http://arxiv.org/abs/2001.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2001.00001v1" rel="related" type="application/pdf"/>
  </entry>
</feed>"#;

        let papers = parse_feed(feed).unwrap();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Graph Networks for Routing");
        assert_eq!(papers[0].url, "http://arxiv.org/abs/2001.00001v1");
    }

    #[test]
    fn test_parse_empty_feed() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_feed(feed).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_entry() {
        let feed = r#"<feed><entry><id>http://arxiv.org/api/errors#incorrect_id_format</id><title>Error</title><summary>bad</summary></entry></feed>"#;
        assert!(matches!(parse_feed(feed), Err(BackendError::Malformed(_))));
    }

    #[test]
    fn test_parse_non_feed() {
        assert!(matches!(
            parse_feed("<html>Service Unavailable</html>"),
            Err(BackendError::Malformed(_))
        ));
    }
}
