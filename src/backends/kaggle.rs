//! 数据集检索后端（Kaggle搜索页面）

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use scraper::{Html, Selector};
use std::collections::HashSet;

use crate::backends::text::element_text;
use crate::backends::{BROWSER_USER_AGENT, BackendError, SearchProvider, check_status};
use crate::types::Resource;

const BASE_URL: &str = "https://www.kaggle.com";

/// 过短的标题通常是图标或导航链接
const MIN_TITLE_CHARS: usize = 6;

const LINK_SELECTOR: &str =
    r#"a[href*="/datasets/"], a[href*="/code/"], a[href*="/notebooks/"]"#;

pub struct KaggleProvider {
    client: reqwest::Client,
}

impl KaggleProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for KaggleProvider {
    fn name(&self) -> &'static str {
        "kaggle"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError> {
        let response = self
            .client
            .get(format!("{}/search", BASE_URL))
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .query(&[("q", query)])
            .send()
            .await?;
        let html = check_status(response)?.text().await?;
        Ok(parse_search_page(&html, limit))
    }
}

/// 提取数据集与Notebook链接，数据集在前，按URL去重
pub fn parse_search_page(html: &str, limit: usize) -> Vec<Resource> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(LINK_SELECTOR) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut datasets = Vec::new();
    let mut notebooks = Vec::new();

    for link in document.select(&selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let kind = if href.contains("/datasets/") {
            "dataset"
        } else if href.contains("/code/") || href.contains("/notebooks/") {
            "notebook"
        } else {
            continue;
        };

        let title = element_text(&link);
        if title.chars().count() < MIN_TITLE_CHARS {
            continue;
        }

        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", BASE_URL, href)
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let resource = Resource::new(title, url).with_kind(kind);
        if kind == "dataset" {
            datasets.push(resource);
        } else {
            notebooks.push(resource);
        }
    }

    datasets.into_iter().chain(notebooks).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<nav><a href="/datasets">Datasets</a><a href="/code">Code</a></nav>
<a href="/code/alice/retail-demand-eda">Retail Demand EDA</a>
<a href="/datasets/acme/store-sales"><span>Store Sales</span> Forecasting</a>
<a href="/datasets/acme/store-sales">Store Sales Forecasting (dup)</a>
<a href="https://www.kaggle.com/datasets/bob/m5">M5 Forecasting Accuracy</a>
<a href="/datasets/x/y">tiny</a>
<a href="/competitions/titanic">Titanic Competition</a>
"#;

    #[test]
    fn test_parse_search_page() {
        let results = parse_search_page(PAGE, 10);

        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Store Sales Forecasting",
                "M5 Forecasting Accuracy",
                "Retail Demand EDA"
            ]
        );
        assert_eq!(results[0].url, "https://www.kaggle.com/datasets/acme/store-sales");
        assert_eq!(results[0].kind.as_deref(), Some("dataset"));
        assert_eq!(results[2].kind.as_deref(), Some("notebook"));
    }

    #[test]
    fn test_parse_search_page_limit() {
        assert_eq!(parse_search_page(PAGE, 1).len(), 1);
    }

    #[test]
    fn test_parse_search_page_decodes_titles() {
        let page = r#"<a class="sc-card" href="/datasets/acme/q-a">Q&amp;A Pairs &#8212; Retail Support</a>"#;

        let results = parse_search_page(page, 5);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Q&A Pairs \u{2014} Retail Support");
        assert_eq!(results[0].url, "https://www.kaggle.com/datasets/acme/q-a");
    }

    #[test]
    fn test_parse_script_rendered_page() {
        let page = r#"<html><body><div id="root"></div><script src="/static/app.js"></script></body></html>"#;
        assert!(parse_search_page(page, 5).is_empty());
    }
}
