#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use souklou::{
    AppState, app,
    auth::JwtKeys,
    db::{Identity, NewIdentity, Role},
    registry::SessionMode,
    store::Store,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct Server {
    pub addr: SocketAddr,
    pub state: AppState,
}

pub async fn spawn(mode: SessionMode) -> Server {
    let store = Store::in_memory().await.unwrap();
    let state = AppState::new(store, JwtKeys::from_secret(b"test-secret"), mode, Duration::from_secs(30));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state.clone(), None);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Server { addr, state }
}

impl Server {
    pub async fn person(&self, username: &str, role: Role) -> Identity {
        self.state
            .store
            .create_identity(NewIdentity {
                username: username.to_owned(),
                role,
                first_name: username.to_owned(),
                last_name: "Test".to_owned(),
            })
            .await
            .unwrap()
    }

    pub fn token(&self, identity: &Identity) -> String {
        self.state
            .keys
            .issue(identity.id, identity.role, time::Duration::hours(1))
            .unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Connect and wait for the admission snapshot, which arrives once the
    /// connection is registered and subscribed.
    pub async fn connect(&self, identity: &Identity) -> (Ws, Value) {
        let url = format!("ws://{}/ws?token={}", self.addr, self.token(identity));
        let (mut ws, _) = connect_async(url).await.unwrap();
        let snapshot = next_event(&mut ws).await;
        assert_eq!(snapshot["event"], "unread_notifications");
        (ws, snapshot)
    }
}

pub async fn send(ws: &mut Ws, event: Value) {
    ws.send(Message::Text(event.to_string().into())).await.unwrap();
}

/// The next JSON event, skipping control frames.
pub async fn next_event(ws: &mut Ws) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Assert nothing but control frames arrives for a short while.
pub async fn expect_silence(ws: &mut Ws) {
    let quiet = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(_)) => continue,
                _ => return String::new(),
            }
        }
    })
    .await;
    if let Ok(text) = quiet {
        panic!("expected silence, got {text:?}");
    }
}

/// Poll until `check` holds, for at most a couple of seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition never held");
}
