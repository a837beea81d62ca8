//! 网页搜索后端（DuckDuckGo HTML版）

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use scraper::{Html, Selector};

use crate::backends::text::{element_text, truncate_chars};
use crate::backends::{BROWSER_USER_AGENT, BackendError, SearchProvider, check_status};
use crate::types::Resource;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// 标题链接与摘要按文档顺序一并选出
const RESULT_SELECTOR: &str = "a.result__a, .result__snippet";

pub struct DuckDuckGoProvider {
    client: reqwest::Client,
}

impl DuckDuckGoProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError> {
        let response = self
            .client
            .get(ENDPOINT)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .query(&[("q", query)])
            .send()
            .await?;
        let html = check_status(response)?.text().await?;
        Ok(parse_results(&html, limit))
    }
}

/// 解析结果页：每个结果标题链接与其后、下一个结果之前的摘要配对
pub fn parse_results(html: &str, limit: usize) -> Vec<Resource> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(RESULT_SELECTOR) else {
        return Vec::new();
    };

    let mut resources = Vec::new();
    // 被跳过的结果（广告、空标题）其摘要也一并丢弃
    let mut current: Option<Resource> = None;

    for element in document.select(&selector) {
        if element.value().classes().any(|class| class == "result__a") {
            if let Some(done) = current.take() {
                resources.push(done);
            }
            if resources.len() >= limit {
                break;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let url = resolve_redirect(href);
            // 广告链接
            if url.contains("duckduckgo.com/y.js") {
                continue;
            }
            let title = element_text(&element);
            if title.is_empty() {
                continue;
            }
            current = Some(Resource::new(title, url));
        } else if let Some(resource) = current.as_mut()
            && resource.snippet.is_none()
        {
            let snippet = element_text(&element);
            if !snippet.is_empty() {
                resource.snippet = Some(truncate_chars(&snippet, 500));
            }
        }
    }

    if let Some(done) = current
        && resources.len() < limit
    {
        resources.push(done);
    }
    resources
}

/// 将 `//duckduckgo.com/l/?uddg=...` 跳转链接还原为目标地址
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    if let Ok(parsed) = url::Url::parse(&absolute)
        && parsed.path().starts_with("/l/")
        && let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg")
    {
        return target.into_owned();
    }

    absolute
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.acme.com%2Fabout&amp;rut=abc">About <b>Acme</b> Corp</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.acme.com%2Fabout">Acme builds &amp; sells anvils to coyotes.</a>
</div>
<div class="result results_links results_links_deep result--ad">
  <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=bing">Buy Anvils</a>
</div>
<div class="result results_links results_links_deep web-result">
  <a rel="nofollow" class="result__a" href="https://en.wikipedia.org/wiki/Acme_Corporation">Acme Corporation - Wikipedia</a>
</div>
"#;

    #[test]
    fn test_parse_results() {
        let results = parse_results(SAMPLE, 5);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "About Acme Corp");
        assert_eq!(results[0].url, "https://www.acme.com/about");
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("Acme builds & sells anvils to coyotes.")
        );
        assert_eq!(results[1].title, "Acme Corporation - Wikipedia");
        assert_eq!(results[1].url, "https://en.wikipedia.org/wiki/Acme_Corporation");
        assert!(results[1].snippet.is_none());
    }

    #[test]
    fn test_parse_results_respects_limit() {
        assert_eq!(parse_results(SAMPLE, 1).len(), 1);
    }

    #[test]
    fn test_parse_results_decodes_entities_in_any_attribute_order() {
        let page = r#"
<div class="result">
  <a href="https://acme.com/overview" rel="nofollow" class="result__title-link result__a">Acme&#8217;s Business &#x2014; Overview</a>
  <div class="result__snippet">Founded in 1920 &mdash; anvils &amp; more.</div>
</div>
<div class="result"><a href="https://acme.com" class="result__a">Acme Overview</a></div>
"#;

        let results = parse_results(page, 5);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Acme\u{2019}s Business \u{2014} Overview");
        assert_eq!(results[0].url, "https://acme.com/overview");
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("Founded in 1920 \u{2014} anvils & more.")
        );
        assert_eq!(results[1].title, "Acme Overview");
        assert_eq!(results[1].url, "https://acme.com");
    }

    #[test]
    fn test_parse_results_zero_limit() {
        assert!(parse_results(SAMPLE, 0).is_empty());
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html><body>No results.</body></html>", 5).is_empty());
    }
}
