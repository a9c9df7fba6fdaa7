mod common;

use common::{expect_silence, next_event, spawn};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use souklou::{db::Role, notifications::announce, registry::SessionMode};

#[tokio::test]
async fn banner_and_auth() {
    let server = spawn(SessionMode::Single).await;
    let client = Client::new();

    let banner: Value = client.get(server.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(banner["name"], "souklou");
    assert_eq!(banner["endpoints"]["websocket"], "/ws");

    let res = client.get(server.url("/api/chat/conversations")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "unauthorized");

    let res = client
        .get(server.url("/api/notifications"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn conversation_and_message_flow() {
    let server = spawn(SessionMode::Single).await;
    let client = Client::new();
    let a = server.person("awa", Role::Student).await;
    let b = server.person("bakary", Role::Teacher).await;
    let c = server.person("chantal", Role::Student).await;
    let (token_a, token_b, token_c) = (server.token(&a), server.token(&b), server.token(&c));

    let post_conversation = |token: String, body: Value| {
        client
            .post(server.url("/api/chat/conversations"))
            .bearer_auth(token)
            .json(&body)
            .send()
    };

    assert_eq!(post_conversation(token_a.clone(), json!({})).await.unwrap().status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        post_conversation(token_a.clone(), json!({ "userId": a.id })).await.unwrap().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        post_conversation(token_a.clone(), json!({ "userId": 999 })).await.unwrap().status(),
        StatusCode::NOT_FOUND
    );

    // B is online before the conversation exists
    let (mut ws_b, _) = server.connect(&b).await;

    let res = post_conversation(token_a.clone(), json!({ "userId": b.id })).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let conversation_id = created["conversation"]["id"].as_i64().unwrap();

    let again: Value = post_conversation(token_b.clone(), json!({ "userId": a.id }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["conversation"]["id"], conversation_id);

    let messages_url = server.url(&format!("/api/chat/conversations/{conversation_id}/messages"));
    let res = client
        .post(&messages_url)
        .bearer_auth(&token_a)
        .json(&json!({ "content": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(&messages_url)
        .bearer_auth(&token_a)
        .json(&json!({ "content": "Bonjour" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // auto-joined on creation, so B sees the message live
    let live = next_event(&mut ws_b).await;
    assert_eq!(live["event"], "new_message");
    assert_eq!(live["data"]["content"], "Bonjour");
    assert_eq!(next_event(&mut ws_b).await["event"], "notification");

    let unread: Value = client
        .get(server.url("/api/chat/unread-count"))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unread["count"], 1);

    let listed: Value = client
        .get(server.url("/api/chat/conversations"))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["conversations"][0]["other_user_id"], a.id);
    assert_eq!(listed["conversations"][0]["last_message"], "Bonjour");
    assert_eq!(listed["conversations"][0]["unread_count"], 1);

    let res = client.get(&messages_url).bearer_auth(&token_c).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let history: Value = client
        .get(&messages_url)
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);
    assert_eq!(server.state.store.unread_message_count(b.id).await.unwrap(), 0);
    expect_silence(&mut ws_b).await;
}

#[tokio::test]
async fn history_fetch_sends_receipt_to_the_other_member_only() {
    let server = spawn(SessionMode::Single).await;
    let client = Client::new();
    let a = server.person("awa", Role::Student).await;
    let b = server.person("bakary", Role::Teacher).await;
    let (conversation, _) = server.state.store.get_or_create_conversation(a.id, b.id).await.unwrap();

    let (mut ws_a, _) = server.connect(&a).await;
    let (mut ws_b, _) = server.connect(&b).await;

    let res = client
        .get(server.url(&format!("/api/chat/conversations/{}/messages", conversation.id)))
        .bearer_auth(server.token(&b))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let receipt = next_event(&mut ws_a).await;
    assert_eq!(receipt["event"], "messages_read");
    assert_eq!(receipt["data"]["userId"], b.id);
    expect_silence(&mut ws_b).await;
}

#[tokio::test]
async fn notification_endpoints() {
    let server = spawn(SessionMode::Single).await;
    let client = Client::new();
    let student = server.person("awa", Role::Student).await;
    let teacher = server.person("bakary", Role::Teacher).await;
    let (token_s, token_t) = (server.token(&student), server.token(&teacher));

    announce::assignment_published(&server.state.notifier, 1, "Devoir 1").await.unwrap();
    let first = announce::comment_posted(&server.state.notifier, student.id, 2, "Devoir 1")
        .await
        .unwrap();

    let get = |path: &str, token: &str| client.get(server.url(path)).bearer_auth(token.to_owned()).send();

    let all: Value = get("/api/notifications", &token_s).await.unwrap().json().await.unwrap();
    assert_eq!(all["notifications"].as_array().unwrap().len(), 2);
    let count: Value = get("/api/notifications/unread-count", &token_s).await.unwrap().json().await.unwrap();
    assert_eq!(count["count"], 2);

    let read_url = server.url(&format!("/api/notifications/{}/read", first.id));
    let res = client.put(&read_url).bearer_auth(&token_t).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = client.put(&read_url).bearer_auth(&token_s).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let unread: Value = get("/api/notifications/unread", &token_s).await.unwrap().json().await.unwrap();
    assert_eq!(unread["notifications"].as_array().unwrap().len(), 1);

    let res = client
        .put(server.url("/api/notifications/mark-all-read"))
        .bearer_auth(&token_s)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let count: Value = get("/api/notifications/unread-count", &token_s).await.unwrap().json().await.unwrap();
    assert_eq!(count["count"], 0);

    let one_url = server.url(&format!("/api/notifications/{}", first.id));
    assert_eq!(
        client.delete(&one_url).bearer_auth(&token_t).send().await.unwrap().status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        client.delete(&one_url).bearer_auth(&token_s).send().await.unwrap().status(),
        StatusCode::OK
    );
    assert_eq!(
        client.delete(&one_url).bearer_auth(&token_s).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );

    let res = client
        .delete(server.url("/api/notifications"))
        .bearer_auth(&token_s)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let all: Value = get("/api/notifications", &token_s).await.unwrap().json().await.unwrap();
    assert!(all["notifications"].as_array().unwrap().is_empty());
}
