//! Reddit tools: inspect subreddits and submit posts on behalf of one account.
//!
//! Authentication uses Reddit's OAuth2 "script app" password grant. The bearer
//! token is fetched on first use and refreshed shortly before it expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{Tool, ToolRegistry};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_URL: &str = "https://oauth.reddit.com";
/// Refresh this long before Reddit's stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The five strings a Reddit script app needs.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Authenticated Reddit API client shared by the Reddit tools.
pub struct RedditClient {
    http: Client,
    credentials: RedditCredentials,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            credentials,
            token: Mutex::new(None),
        })
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Return a valid bearer token, fetching a new one if needed.
    async fn access_token(&self) -> anyhow::Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting Reddit access token for u/{}", self.credentials.username);
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Reddit authentication failed (HTTP {}): {}",
                status,
                body
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let token = parsed.into_token()?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}{}", API_URL, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        read_json(response).await
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> anyhow::Result<Value> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}{}", API_URL, path))
            .bearer_auth(token)
            .form(form)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn subreddit_info(&self, subreddit: &str) -> anyhow::Result<Value> {
        let about = self
            .get(&format!("/r/{}/about", normalize_subreddit(subreddit)), &[])
            .await?;
        summarize_subreddit(&about)
    }

    pub async fn subreddit_rules(&self, subreddit: &str) -> anyhow::Result<Value> {
        let rules = self
            .get(&format!("/r/{}/about/rules", normalize_subreddit(subreddit)), &[])
            .await?;
        Ok(summarize_rules(&rules))
    }

    pub async fn top_posts(
        &self,
        subreddit: &str,
        time_filter: &str,
        limit: u64,
    ) -> anyhow::Result<Value> {
        let listing = self
            .get(
                &format!("/r/{}/top", normalize_subreddit(subreddit)),
                &[("t", time_filter.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(summarize_listing(&listing))
    }

    pub async fn submit_text_post(
        &self,
        subreddit: &str,
        title: &str,
        content: &str,
        flair_id: Option<&str>,
    ) -> anyhow::Result<Value> {
        let mut form = vec![
            ("api_type", "json".to_string()),
            ("kind", "self".to_string()),
            ("sr", normalize_subreddit(subreddit).to_string()),
            ("title", title.to_string()),
            ("text", content.to_string()),
        ];
        if let Some(flair) = flair_id {
            form.push(("flair_id", flair.to_string()));
        }

        tracing::info!("Submitting post to r/{}: {}", normalize_subreddit(subreddit), title);
        let response = self.post_form("/api/submit", &form).await?;
        let data = api_json_data(&response)?;
        Ok(json!({
            "id": data["id"],
            "name": data["name"],
            "url": data["url"],
            "subreddit": normalize_subreddit(subreddit),
            "title": title,
        }))
    }

    pub async fn reply_to_post(&self, post_id: &str, content: &str) -> anyhow::Result<Value> {
        let thing_id = if post_id.starts_with("t3_") {
            post_id.to_string()
        } else {
            format!("t3_{}", post_id)
        };

        let response = self
            .post_form(
                "/api/comment",
                &[
                    ("api_type", "json".to_string()),
                    ("thing_id", thing_id),
                    ("text", content.to_string()),
                ],
            )
            .await?;
        let data = api_json_data(&response)?;
        let comment = &data["things"][0]["data"];
        Ok(json!({
            "id": comment["id"],
            "permalink": comment["permalink"],
        }))
    }
}

async fn read_json(response: reqwest::Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("Reddit API error (HTTP {}): {}", status, body));
    }
    Ok(serde_json::from_str(&body)?)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

impl TokenResponse {
    /// Reddit reports bad credentials as HTTP 200 with an `error` field.
    fn into_token(self) -> anyhow::Result<AccessToken> {
        if let Some(error) = self.error {
            return Err(anyhow::anyhow!("Reddit authentication failed: {}", error));
        }
        let value = self
            .access_token
            .ok_or_else(|| anyhow::anyhow!("Reddit token response has no access_token"))?;
        let lifetime = Duration::from_secs(self.expires_in.unwrap_or(3600));
        Ok(AccessToken {
            value,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }
}

/// Accept "r/rust", "/r/rust" or "rust".
fn normalize_subreddit(name: &str) -> &str {
    let name = name.trim().trim_start_matches('/');
    name.strip_prefix("r/").unwrap_or(name)
}

/// Unwrap `{"json": {"errors": [...], "data": {...}}}` from an `api_type=json` call.
fn api_json_data(response: &Value) -> anyhow::Result<&Value> {
    let body = &response["json"];
    if let Some(errors) = body["errors"].as_array() {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.as_array()
                        .map(|parts| {
                            parts
                                .iter()
                                .filter_map(|p| p.as_str())
                                .collect::<Vec<_>>()
                                .join(": ")
                        })
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(anyhow::anyhow!("Reddit rejected the request: {}", messages.join("; ")));
        }
    }
    Ok(&body["data"])
}

fn summarize_subreddit(about: &Value) -> anyhow::Result<Value> {
    let data = &about["data"];
    if data.is_null() {
        return Err(anyhow::anyhow!("Subreddit not found"));
    }
    Ok(json!({
        "display_name": data["display_name"],
        "title": data["title"],
        "description": data["public_description"],
        "subscribers": data["subscribers"],
        "active_users": data["active_user_count"],
        "over_18": data["over18"],
        "submission_type": data["submission_type"],
        "created_utc": data["created_utc"],
    }))
}

fn summarize_rules(rules: &Value) -> Value {
    let rules: Vec<Value> = rules["rules"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|r| {
                    json!({
                        "name": r["short_name"],
                        "description": r["description"],
                        "applies_to": r["kind"],
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "rules": rules })
}

fn summarize_listing(listing: &Value) -> Value {
    let posts: Vec<Value> = listing["data"]["children"]
        .as_array()
        .map(|children| {
            children
                .iter()
                .map(|c| {
                    let p = &c["data"];
                    json!({
                        "id": p["id"],
                        "title": p["title"],
                        "author": p["author"],
                        "score": p["score"],
                        "num_comments": p["num_comments"],
                        "permalink": p["permalink"],
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "posts": posts })
}

fn required_str<'a>(args: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' argument", key))
}

fn subreddit_schema(extra: Value) -> Value {
    let mut properties = json!({
        "subreddit": {
            "type": "string",
            "description": "Subreddit name, with or without the r/ prefix"
        }
    });
    if let (Some(props), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        props.extend(extra.clone());
    }
    properties
}

/// Register every Reddit tool, all sharing one authenticated client.
pub fn register_tools(registry: &mut ToolRegistry, client: Arc<RedditClient>) {
    registry.register(Arc::new(GetSubredditInfo(Arc::clone(&client))));
    registry.register(Arc::new(GetSubredditRules(Arc::clone(&client))));
    registry.register(Arc::new(GetTopPosts(Arc::clone(&client))));
    registry.register(Arc::new(CreatePost(Arc::clone(&client))));
    registry.register(Arc::new(ReplyToPost(client)));
}

pub struct GetSubredditInfo(Arc<RedditClient>);

#[async_trait]
impl Tool for GetSubredditInfo {
    fn name(&self) -> &str {
        "get_subreddit_info"
    }

    fn description(&self) -> &str {
        "Get information about a subreddit: title, description, subscriber count and allowed submission type."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": subreddit_schema(json!({})),
            "required": ["subreddit"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let subreddit = required_str(&args, "subreddit")?;
        Ok(self.0.subreddit_info(subreddit).await?.to_string())
    }
}

pub struct GetSubredditRules(Arc<RedditClient>);

#[async_trait]
impl Tool for GetSubredditRules {
    fn name(&self) -> &str {
        "get_subreddit_rules"
    }

    fn description(&self) -> &str {
        "Get the posting rules of a subreddit. Check these before submitting."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": subreddit_schema(json!({})),
            "required": ["subreddit"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let subreddit = required_str(&args, "subreddit")?;
        Ok(self.0.subreddit_rules(subreddit).await?.to_string())
    }
}

pub struct GetTopPosts(Arc<RedditClient>);

#[async_trait]
impl Tool for GetTopPosts {
    fn name(&self) -> &str {
        "get_top_posts"
    }

    fn description(&self) -> &str {
        "Get the top posts of a subreddit for a time period, to learn what the community engages with."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": subreddit_schema(json!({
                "time_filter": {
                    "type": "string",
                    "enum": ["hour", "day", "week", "month", "year", "all"],
                    "description": "Time period (default: week)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of posts to return (default: 10, max: 100)"
                }
            })),
            "required": ["subreddit"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let subreddit = required_str(&args, "subreddit")?;
        let time_filter = args["time_filter"].as_str().unwrap_or("week");
        let limit = args["limit"].as_u64().unwrap_or(10).clamp(1, 100);
        Ok(self
            .0
            .top_posts(subreddit, time_filter, limit)
            .await?
            .to_string())
    }
}

pub struct CreatePost(Arc<RedditClient>);

#[async_trait]
impl Tool for CreatePost {
    fn name(&self) -> &str {
        "create_post"
    }

    fn description(&self) -> &str {
        "Submit a text post to a subreddit. The content is Reddit markdown."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": subreddit_schema(json!({
                "title": { "type": "string", "description": "Post title" },
                "content": { "type": "string", "description": "Post body in Reddit markdown" },
                "flair_id": { "type": "string", "description": "Optional flair template id" }
            })),
            "required": ["subreddit", "title", "content"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let subreddit = required_str(&args, "subreddit")?;
        let title = required_str(&args, "title")?;
        let content = required_str(&args, "content")?;
        let flair_id = args["flair_id"].as_str();
        Ok(self
            .0
            .submit_text_post(subreddit, title, content, flair_id)
            .await?
            .to_string())
    }
}

pub struct ReplyToPost(Arc<RedditClient>);

#[async_trait]
impl Tool for ReplyToPost {
    fn name(&self) -> &str {
        "reply_to_post"
    }

    fn description(&self) -> &str {
        "Add a comment to a post. Use this for links or sources that should not go in the post body."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "post_id": { "type": "string", "description": "Post id, with or without the t3_ prefix" },
                "content": { "type": "string", "description": "Comment body in Reddit markdown" }
            },
            "required": ["post_id", "content"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let post_id = required_str(&args, "post_id")?;
        let content = required_str(&args, "content")?;
        Ok(self.0.reply_to_post(post_id, content).await?.to_string())
    }
}
