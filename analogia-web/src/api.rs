use analogia_client::api::{
    self, Comment, CommentId, CommentPage, CommentStore, CommentUpdate, EmailVerification,
    IdentityVerifier, NewComment, PageRequest, UsernameAssignment,
};
use async_trait::async_trait;

use crate::ApiConfig;

/// Comment store and member directory, as exposed by the backend's REST api
#[derive(Clone, Debug, PartialEq)]
pub struct HttpApi {
    host: String,
}

// Paged listings are answered with the backend framework's page envelope
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendPage {
    content: Vec<Comment>,
    total_elements: u64,
    #[serde(default)]
    last: Option<bool>,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> HttpApi {
        HttpApi {
            host: String::from(config.host.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.host, path)
    }
}

async fn send(req: reqwest::RequestBuilder) -> Result<Vec<u8>, api::Error> {
    let resp = req.send().await.map_err(|e| {
        tracing::warn!("request failed: {e:?}");
        api::Error::Network(e.to_string())
    })?;
    let status = resp.status();
    let body = resp
        .bytes()
        .await
        .map_err(|e| api::Error::Network(e.to_string()))?;
    if !status.is_success() {
        return Err(api::Error::from_response(status, &body));
    }
    Ok(body.to_vec())
}

async fn fetch<R>(req: reqwest::RequestBuilder) -> Result<R, api::Error>
where
    R: for<'de> serde::Deserialize<'de>,
{
    let body = send(req).await?;
    serde_json::from_slice(&body)
        .map_err(|e| api::Error::Unknown(format!("failed to parse data from server: {e}")))
}

#[async_trait(?Send)]
impl CommentStore for HttpApi {
    async fn fetch_page(&self, req: PageRequest) -> Result<CommentPage, api::Error> {
        let page: BackendPage = fetch(
            crate::CLIENT
                .get(self.url("comments"))
                .query(&req.query_pairs()),
        )
        .await?;
        Ok(match page.last {
            Some(last) => CommentPage {
                comments: page.content,
                has_more: !last,
            },
            None => CommentPage::from_totals(
                page.content,
                req.page,
                req.page_size,
                page.total_elements,
            ),
        })
    }

    async fn create_comment(&self, c: NewComment) -> Result<Comment, api::Error> {
        fetch(crate::CLIENT.post(self.url("comments")).json(&c)).await
    }

    async fn update_comment(&self, id: CommentId, u: CommentUpdate) -> Result<Comment, api::Error> {
        fetch(
            crate::CLIENT
                .put(self.url(&format!("comments/{id}")))
                .json(&u),
        )
        .await
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), api::Error> {
        send(crate::CLIENT.delete(self.url(&format!("comments/{id}")))).await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl IdentityVerifier for HttpApi {
    async fn verify_email(&self, email: &str) -> Result<EmailVerification, api::Error> {
        fetch(
            crate::CLIENT
                .get(self.url("members/verify"))
                .query(&[("email", email)]),
        )
        .await
    }

    async fn assign_username(&self, email: &str, username: &str) -> Result<(), api::Error> {
        send(
            crate::CLIENT
                .post(self.url("members/username"))
                .json(&UsernameAssignment {
                    email: String::from(email),
                    username: String::from(username),
                }),
        )
        .await?;
        Ok(())
    }
}
