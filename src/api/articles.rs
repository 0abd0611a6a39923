use crate::error::Result;
use crate::http_client::{ApiRequest, GatewayClient};
use crate::models::article::{Article, ArticleList, ArticleQuery, CommentList, CreateArticleRequest};

pub async fn list(gateway: &GatewayClient, query: &ArticleQuery) -> Result<ArticleList> {
    let request = ApiRequest::get("/articles")
        .query_opt("page", query.page)
        .query_opt("pageSize", query.page_size)
        .query("orderBy", query.order_by.as_str())
        .query_opt("keyword", query.keyword.as_deref().filter(|k| !k.is_empty()));
    gateway.send_json(request).await
}

pub async fn get(gateway: &GatewayClient, id: i64) -> Result<Article> {
    gateway
        .send_json(ApiRequest::get(format!("/articles/{}", id)))
        .await
}

/// Post to the free board
pub async fn create(gateway: &GatewayClient, request: &CreateArticleRequest) -> Result<Article> {
    let request = ApiRequest::post("/articles").json(request)?;
    gateway.send_json(request).await
}

pub async fn comments(
    gateway: &GatewayClient,
    id: i64,
    limit: u32,
    cursor: Option<i64>,
) -> Result<CommentList> {
    let request = ApiRequest::get(format!("/articles/{}/comments", id))
        .query("limit", limit)
        .query_opt("cursor", cursor);
    gateway.send_json(request).await
}
