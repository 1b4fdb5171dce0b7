//! Web search through DuckDuckGo's HTML endpoint (no API key needed).

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_MAX_RESULTS: usize = 5;

/// Search the web with DuckDuckGo.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; RedditPostGenerator/1.0)")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "Search the web with DuckDuckGo. Returns results with titles, snippets and URLs. Use for researching a topic before writing a post."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let url = format!("{}?q={}", DDG_HTML_URL, urlencoding::encode(query));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("DuckDuckGo returned HTTP {}", status));
        }
        let html = response.text().await?;

        let results = extract_ddg_results(&html, max_results);
        tracing::debug!("DuckDuckGo returned {} results for {:?}", results.len(), query);

        if results.is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

/// Extract up to `max_results` results from DuckDuckGo HTML.
fn extract_ddg_results(html: &str, max_results: usize) -> Vec<String> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__body\"").skip(1) {
        if results.len() >= max_results {
            break;
        }

        let title = inner_text_after(chunk, "class=\"result__a\"");
        let snippet = inner_text_after(chunk, "class=\"result__snippet\"").unwrap_or("No snippet");
        let url = inner_text_after(chunk, "class=\"result__url\"")
            .map(str::trim)
            .unwrap_or("");

        if let Some(title) = title.filter(|t| !t.is_empty()) {
            results.push(format!(
                "**{}**\n{}\nURL: {}",
                html_decode(title),
                html_decode(snippet),
                url
            ));
        }
    }

    results
}

/// Text between the end of the tag carrying `marker` and the next `<`.
fn inner_text_after<'a>(chunk: &'a str, marker: &str) -> Option<&'a str> {
    chunk
        .split(marker)
        .nth(1)
        .and_then(|s| s.split('>').nth(1))
        .and_then(|s| s.split('<').next())
}

fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_html(title: &str, snippet: &str, url: &str) -> String {
        format!(
            r#"<div class="result__body"><h2><a class="result__a" href="/l/?u=x">{title}</a></h2>
<a class="result__url" href="/l/?u=x"> {url} </a>
<a class="result__snippet" href="/l/?u=x">{snippet}</a></div>"#
        )
    }

    #[test]
    fn extracts_title_snippet_and_url() {
        let html = format!(
            "<html>{}</html>",
            result_html("Rust &amp; WebAssembly", "Fast &quot;safe&quot; code", "rust-lang.org")
        );
        let results = extract_ddg_results(&html, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0],
            "**Rust & WebAssembly**\nFast \"safe\" code\nURL: rust-lang.org"
        );
    }

    #[test]
    fn honours_max_results() {
        let html: String = (0..8)
            .map(|i| result_html(&format!("Title {i}"), "s", "example.com"))
            .collect();
        assert_eq!(extract_ddg_results(&html, 3).len(), 3);
        assert_eq!(extract_ddg_results(&html, 20).len(), 8);
    }

    #[test]
    fn no_results_page_yields_nothing() {
        assert!(extract_ddg_results("<html><body>No results.</body></html>", 5).is_empty());
    }

    #[tokio::test]
    async fn missing_query_is_rejected() {
        let tool = DuckDuckGoSearch::new().unwrap();
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("query"));
    }
}
