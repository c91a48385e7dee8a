//! 协作方 HTTP 客户端
//!
//! 会话、消息、通知与各类写操作的 REST 访问；
//! 聊天附件通过 multipart 上传。

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use config::ApiConfig;
use domain::{
    ApiError, CollaboratorApi, Conversation, ConversationId, Message, NewMessage, Notification,
    NotificationId,
};

/// 协作方 HTTP 客户端
#[derive(Clone)]
pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    /// 创建客户端
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 非 2xx 响应统一转成状态错误
    fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status {
                code: status.as_u16(),
            })
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Self::check_status(response)?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn post_json(&self, path: &str, payload: &JsonValue) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Self::check_status(response)?;
        Ok(())
    }

    async fn put_empty(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        match Self::check_status(response) {
            Ok(_) => Ok(()),
            // 幂等写：重复标记返回 404/409 时不视为失败
            Err(ApiError::Status { code })
                if code == StatusCode::NOT_FOUND.as_u16()
                    || code == StatusCode::CONFLICT.as_u16() =>
            {
                debug!("idempotent write on {} returned {}", path, code);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CollaboratorApi for HttpApiClient {
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.get_json("/conversations").await
    }

    async fn fetch_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, ApiError> {
        self.get_json(&format!("/conversations/{}/messages", conversation_id))
            .await
    }

    async fn send_message(&self, message: NewMessage) -> Result<Message, ApiError> {
        let request = match message.attachment {
            Some(upload) => {
                // 二进制附件走 multipart
                let part = Part::bytes(upload.bytes)
                    .file_name(upload.filename)
                    .mime_str(&upload.mime_type)
                    .map_err(|e| ApiError::Http(e.to_string()))?;
                let mut form = Form::new()
                    .text("conversationId", message.conversation_id.to_string())
                    .part("attachment", part);
                if let Some(content) = message.content {
                    form = form.text("content", content);
                }
                self.client.post(self.url("/messages")).multipart(form)
            }
            None => self.client.post(self.url("/messages")).json(&json!({
                "conversationId": message.conversation_id,
                "content": message.content,
            })),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Self::check_status(response)?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn mark_seen(&self, conversation_id: ConversationId) -> Result<(), ApiError> {
        self.put_empty(&format!("/conversations/{}/seen", conversation_id))
            .await
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get_json("/notifications").await
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), ApiError> {
        self.put_empty(&format!("/notifications/{}/read", id)).await
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.put_empty("/notifications/read-all").await
    }

    async fn save_listing(&self, payload: JsonValue) -> Result<(), ApiError> {
        self.post_json("/listings", &payload).await
    }

    async fn create_booking(&self, payload: JsonValue) -> Result<(), ApiError> {
        self.post_json("/bookings", &payload).await
    }

    async fn submit_review(&self, payload: JsonValue) -> Result<(), ApiError> {
        self.post_json("/reviews", &payload).await
    }
}
