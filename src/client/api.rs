use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{Post, PublicUser};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status and a `message`.
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// True for the 401 a visitor without a cookie gets; not worth surfacing.
    pub fn is_missing_credential(&self) -> bool {
        self.status() == Some(401)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: PublicUser,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    users: Vec<PublicUser>,
}

#[derive(Deserialize)]
struct PostEnvelope {
    post: Post,
}

#[derive(Deserialize)]
struct PostsEnvelope {
    posts: Vec<Post>,
}

#[derive(Deserialize)]
struct UploadEnvelope {
    url: String,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: String,
}

/// Typed HTTP client for the Quill API. Keeps the `token` cookie in its
/// own jar, so every call after login or register is authenticated.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// `base` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // -- Auth --

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, ClientError> {
        let body = json!({ "username": username, "email": email, "password": password });
        let env: UserEnvelope = Self::send(self.http.post(self.url("/auth/register")).json(&body)).await?;
        Ok(env.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let body = json!({ "email": email, "password": password });
        let env: UserEnvelope = Self::send(self.http.post(self.url("/auth/login")).json(&body)).await?;
        Ok(env.user)
    }

    pub async fn logout(&self) -> Result<String, ClientError> {
        let env: MessageEnvelope = Self::send(self.http.post(self.url("/auth/logout"))).await?;
        Ok(env.message)
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        let env: UserEnvelope = Self::send(self.http.get(self.url("/auth/me"))).await?;
        Ok(env.user)
    }

    // -- Posts --

    pub async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        let env: PostsEnvelope = Self::send(self.http.get(self.url("/posts"))).await?;
        Ok(env.posts)
    }

    pub async fn my_posts(&self) -> Result<Vec<Post>, ClientError> {
        let env: PostsEnvelope = Self::send(self.http.get(self.url("/posts/my-posts"))).await?;
        Ok(env.posts)
    }

    pub async fn get_post(&self, id: &str) -> Result<Post, ClientError> {
        let env: PostEnvelope = Self::send(self.http.get(self.url(&format!("/posts/{id}")))).await?;
        Ok(env.post)
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        image: &str,
    ) -> Result<Post, ClientError> {
        let body = json!({ "title": title, "content": content, "image": image });
        let env: PostEnvelope = Self::send(self.http.post(self.url("/posts")).json(&body)).await?;
        Ok(env.post)
    }

    pub async fn update_post(
        &self,
        id: &str,
        title: &str,
        content: &str,
        image: &str,
    ) -> Result<Post, ClientError> {
        let body = json!({ "title": title, "content": content, "image": image });
        let request = self.http.put(self.url(&format!("/posts/{id}"))).json(&body);
        let env: PostEnvelope = Self::send(request).await?;
        Ok(env.post)
    }

    pub async fn delete_post(&self, id: &str) -> Result<String, ClientError> {
        let request = self.http.delete(self.url(&format!("/posts/{id}")));
        let env: MessageEnvelope = Self::send(request).await?;
        Ok(env.message)
    }

    /// Upload an image and return the hosted URL to store on a post.
    pub async fn upload_image(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new().part("image", part);
        let request = self.http.post(self.url("/upload/image")).multipart(form);
        let env: UploadEnvelope = Self::send(request).await?;
        Ok(env.url)
    }

    // -- Admin --

    pub async fn admin_users(&self) -> Result<Vec<PublicUser>, ClientError> {
        let env: UsersEnvelope = Self::send(self.http.get(self.url("/admin/users"))).await?;
        Ok(env.users)
    }

    pub async fn admin_delete_user(&self, id: &str) -> Result<String, ClientError> {
        let request = self.http.delete(self.url(&format!("/admin/users/{id}")));
        let env: MessageEnvelope = Self::send(request).await?;
        Ok(env.message)
    }

    pub async fn admin_posts(&self) -> Result<Vec<Post>, ClientError> {
        let env: PostsEnvelope = Self::send(self.http.get(self.url("/admin/posts"))).await?;
        Ok(env.posts)
    }
}
