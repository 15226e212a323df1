//! End-to-end exercise of the chat flow over real sockets: two clients
//! connect, register, exchange messages, and an offline receiver later picks
//! the backlog up through conversation initialize.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tutoria_server::api;
use tutoria_server::config::ServerConfig;
use tutoria_shared::protocol::{
    ClientEvent, ContactsResponse, InitializeRequest, InitializeResponse, SendMessage, ServerEvent,
};
use tutoria_shared::types::{ConversationId, Role, User, UserId};
use tutoria_store::Database;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    _dir: tempfile::TempDir,
    addr: SocketAddr,
    http: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        for (id, role, name) in [
            ("student-1", Role::Student, "Linus"),
            ("tutor-1", Role::Tutor, "Ada"),
        ] {
            db.upsert_user(&User {
                id: id.into(),
                role,
                display_name: name.to_owned(),
            })
            .unwrap();
        }
        db.add_enrollment(&"tutor-1".into(), &"student-1".into(), "algebra")
            .unwrap();

        let state = api::build_state(ServerConfig::default(), db);
        let app = api::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            _dir: dir,
            addr,
            http: reqwest::Client::new(),
        }
    }

    async fn connect(&self, user_id: &str) -> WsClient {
        let (mut socket, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .unwrap();

        let register = ClientEvent::RegisterIdentity {
            user_id: UserId::new(user_id),
        };
        socket
            .send(WsMessage::Text(register.to_json().unwrap()))
            .await
            .unwrap();
        socket
    }

    async fn initialize(&self, user_id: &str, partner_id: &str) -> InitializeResponse {
        self.http
            .post(format!("http://{}/conversations/initialize", self.addr))
            .json(&InitializeRequest {
                user_id: UserId::new(user_id),
                partner_id: UserId::new(partner_id),
            })
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

async fn send(
    socket: &mut WsClient,
    sender: &str,
    receiver: &str,
    conversation_id: ConversationId,
    body: &str,
) {
    let event = ClientEvent::SendMessage(SendMessage {
        sender_id: UserId::new(sender),
        receiver_id: UserId::new(receiver),
        conversation_id,
        body: body.to_owned(),
    });
    socket
        .send(WsMessage::Text(event.to_json().unwrap()))
        .await
        .unwrap();
}

async fn next_event(socket: &mut WsClient) -> ServerEvent {
    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("timed out waiting for server event")
        .expect("socket closed")
        .unwrap();
    match frame {
        WsMessage::Text(text) => ServerEvent::from_json(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn two_clients_exchange_messages_in_order() {
    let server = TestServer::spawn().await;

    let conversation = server.initialize("student-1", "tutor-1").await;
    assert!(conversation.messages.is_empty());

    let mut student = server.connect("student-1").await;
    let mut tutor = server.connect("tutor-1").await;

    // Registration races the first send; give the server a beat.
    tokio::time::sleep(Duration::from_millis(100)).await;

    send(
        &mut student,
        "student-1",
        "tutor-1",
        conversation.conversation_id,
        "Hello",
    )
    .await;

    let first = match next_event(&mut tutor).await {
        ServerEvent::Message(message) => message,
        other => panic!("unexpected event: {other:?}"),
    };
    assert_eq!(first.body, "Hello");
    assert_eq!(first.sender_id, UserId::new("student-1"));

    send(
        &mut tutor,
        "tutor-1",
        "student-1",
        conversation.conversation_id,
        "Hi there",
    )
    .await;

    let second = match next_event(&mut student).await {
        ServerEvent::Message(message) => message,
        other => panic!("unexpected event: {other:?}"),
    };
    assert_eq!(second.body, "Hi there");
    assert!(second.created_at > first.created_at);

    // A fresh initialize from either side replays both messages in order.
    let replay = server.initialize("tutor-1", "student-1").await;
    assert_eq!(replay.conversation_id, conversation.conversation_id);
    let bodies: Vec<&str> = replay.messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["Hello", "Hi there"]);
}

#[tokio::test]
async fn offline_receiver_catches_up_via_initialize() {
    let server = TestServer::spawn().await;
    let conversation = server.initialize("student-1", "tutor-1").await;

    let mut student = server.connect("student-1").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The tutor is not connected at all.
    send(
        &mut student,
        "student-1",
        "tutor-1",
        conversation.conversation_id,
        "Are you there?",
    )
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let replay = server.initialize("tutor-1", "student-1").await;
    assert_eq!(replay.messages.len(), 1);
    assert_eq!(replay.messages[0].body, "Are you there?");
}

#[tokio::test]
async fn contacts_endpoint_reflects_enrollment() {
    let server = TestServer::spawn().await;

    let response: ContactsResponse = server
        .http
        .get(format!("http://{}/contacts/student-1", server.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let ids: Vec<&str> = response
        .contacts
        .iter()
        .map(|c| c.user_id.as_str())
        .collect();
    assert_eq!(ids, vec!["tutor-1"]);
}

#[tokio::test]
async fn initialize_rejects_unknown_identity() {
    let server = TestServer::spawn().await;

    let status = server
        .http
        .post(format!("http://{}/conversations/initialize", server.addr))
        .json(&InitializeRequest {
            user_id: UserId::new("student-1"),
            partner_id: UserId::new("ghost"),
        })
        .send()
        .await
        .unwrap()
        .status();

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unregistered_connection_cannot_send() {
    let server = TestServer::spawn().await;
    let conversation = server.initialize("student-1", "tutor-1").await;

    let mut tutor = server.connect("tutor-1").await;

    // Raw socket that never registers.
    let (mut anonymous, _) = connect_async(format!("ws://{}/ws", server.addr))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let event = ClientEvent::SendMessage(SendMessage {
        sender_id: UserId::new("student-1"),
        receiver_id: UserId::new("tutor-1"),
        conversation_id: conversation.conversation_id,
        body: "spoofed".to_owned(),
    });
    anonymous
        .send(WsMessage::Text(event.to_json().unwrap()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Nothing was persisted and nothing reached the tutor.
    let replay = server.initialize("student-1", "tutor-1").await;
    assert!(replay.messages.is_empty());

    let pending = tokio::time::timeout(Duration::from_millis(200), tutor.next()).await;
    assert!(pending.is_err());
}
