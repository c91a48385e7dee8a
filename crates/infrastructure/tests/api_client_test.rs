//! 协作方 HTTP 客户端集成测试

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use config::ApiConfig;
use domain::{ApiError, CollaboratorApi, ConversationId, NewMessage, NotificationId};
use infrastructure::HttpApiClient;

async fn client_for(server: &MockServer) -> HttpApiClient {
    HttpApiClient::new(&ApiConfig {
        base_url: server.uri(),
    })
}

#[tokio::test]
async fn test_fetch_conversations_decodes_wire_shape() {
    let server = MockServer::start().await;
    let conversation_id = Uuid::new_v4();
    let participant = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": conversation_id,
                "participant": participant,
                "lastMessageSummary": "合同已发您邮箱",
                "unreadCount": 2
            }
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let conversations = client.fetch_conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].id, ConversationId::from(conversation_id));
    assert_eq!(conversations[0].unread_count, 2);
}

#[tokio::test]
async fn test_send_text_message_posts_json() {
    let server = MockServer::start().await;
    let conversation_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_json(json!({
            "conversationId": conversation_id,
            "content": "下午三点可以"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": message_id,
            "conversationId": conversation_id,
            "senderId": Uuid::new_v4(),
            "content": "下午三点可以",
            "createdAt": "2025-06-01T12:00:00Z",
            "deliveryStatus": "sent"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let message = client
        .send_message(NewMessage {
            conversation_id: ConversationId::from(conversation_id),
            content: Some("下午三点可以".to_string()),
            attachment: None,
        })
        .await
        .unwrap();
    assert_eq!(message.content.as_deref(), Some("下午三点可以"));
}

#[tokio::test]
async fn test_send_attachment_uses_multipart() {
    let server = MockServer::start().await;
    let conversation_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": Uuid::new_v4(),
            "conversationId": conversation_id,
            "senderId": Uuid::new_v4(),
            "content": null,
            "attachment": {
                "filename": "lease.pdf",
                "url": "https://cdn.example.com/lease.pdf",
                "mimeType": "application/pdf"
            },
            "createdAt": "2025-06-01T12:00:00Z",
            "deliveryStatus": "sent"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let message = client
        .send_message(NewMessage {
            conversation_id: ConversationId::from(conversation_id),
            content: None,
            attachment: Some(domain::AttachmentUpload {
                filename: "lease.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                bytes: vec![0x25, 0x50, 0x44, 0x46],
            }),
        })
        .await
        .unwrap();
    assert!(message.attachment.is_some());

    // multipart 请求带边界的 content-type
    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn test_mark_seen_tolerates_repeat_writes() {
    let server = MockServer::start().await;
    let conversation_id = Uuid::new_v4();
    Mock::given(method("PUT"))
        .and(path(format!("/conversations/{}/seen", conversation_id)))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    // 重复标记视为幂等成功
    client
        .mark_seen(ConversationId::from(conversation_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/notifications/read-all"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    match client.mark_all_notifications_read().await {
        Err(ApiError::Status { code }) => assert_eq!(code, 500),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_mark_notification_read_hits_expected_path() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("PUT"))
        .and(path(format!("/notifications/{}/read", id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client
        .mark_notification_read(NotificationId::from(id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_write_endpoints_post_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/listings"))
        .and(body_json(json!({ "id": 42, "title": "朝南两居室" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client
        .save_listing(json!({ "id": 42, "title": "朝南两居室" }))
        .await
        .unwrap();
    client
        .create_booking(json!({ "listingId": 42, "nights": 2 }))
        .await
        .unwrap();
}
