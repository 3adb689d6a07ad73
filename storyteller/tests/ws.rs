mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::serve;
use common::*;
use futures::{SinkExt, Stream, StreamExt};
use storyteller::{AppState, RequestDefaults, StoryEvent, Storyteller, app};
use tokio_tungstenite::tungstenite::Message;

async fn start(storyteller: Option<Arc<Storyteller>>) -> (String, tokio::task::JoinHandle<()>) {
    let state = AppState {
        storyteller,
        defaults: Arc::new(RequestDefaults::default()),
        static_dir: None,
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        serve(listener, app(state).into_make_service()).await.unwrap();
    });
    (format!("ws://{addr}/ws"), server)
}

/// Read until the suggestions event, returning text events and audio byte count.
async fn read_story<S>(socket: &mut S) -> (Vec<StoryEvent>, usize)
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut events = Vec::new();
    let mut audio = 0;
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match msg {
            Message::Text(text) => {
                let event: StoryEvent = serde_json::from_str(text.as_str()).unwrap();
                let done = matches!(event, StoryEvent::Suggestions { .. });
                events.push(event);
                if done {
                    return (events, audio);
                }
            }
            Message::Binary(bytes) => audio += bytes.len(),
            other => panic!("unexpected message {other:?}"),
        }
    }
}

#[tokio::test]
async fn websocket_streams_a_story() {
    let mut llm = ScriptedLlm::new(&["Title: The Fox\nThe fox ran. It hid."]);
    llm.image = ImageScript::Fail;
    let tts = Arc::new(ScriptedTts::default());
    let teller = Storyteller::new(Arc::new(llm), tts.clone(), models());
    let (url, server) = start(Some(Arc::new(teller))).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    socket
        .send(Message::Text(
            r#"{"topic":"a fox","voice":"Kore"}"#.to_string().into(),
        ))
        .await
        .unwrap();
    let (events, audio) = read_story(&mut socket).await;

    assert_eq!(
        events[..3],
        [
            StoryEvent::Title {
                content: "The Fox".into()
            },
            StoryEvent::Sentence {
                content: "The fox ran.".into()
            },
            StoryEvent::Sentence {
                content: "It hid.".into()
            },
        ]
    );
    assert!(matches!(events[3], StoryEvent::Context { .. }));
    assert_eq!(audio, "The fox ran.#0The fox ran.#1It hid.#0It hid.#1".len());
    let configs = tts.configs.lock().unwrap().clone();
    assert!(configs.iter().all(|c| c.voice == "Kore"));
    server.abort();
}

#[tokio::test]
async fn connection_serves_consecutive_requests() {
    let mut llm = ScriptedLlm::new(&["A."]);
    llm.image = ImageScript::Fail;
    let llm = Arc::new(llm);
    let teller = Storyteller::new(llm.clone(), Arc::new(ScriptedTts::default()), models());
    let (url, server) = start(Some(Arc::new(teller))).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    socket
        .send(Message::Text("a sleepy dragon".to_string().into()))
        .await
        .unwrap();
    read_story(&mut socket).await;
    socket
        .send(Message::Text(
            r#"{"topic":"the dragon wakes","context":"A dragon slept."}"#
                .to_string()
                .into(),
        ))
        .await
        .unwrap();
    read_story(&mut socket).await;

    let stories: Vec<String> = llm
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|(m, _)| m == "story")
        .map(|(_, p)| p.clone())
        .collect();
    assert_eq!(stories.len(), 2);
    assert!(stories[0].contains("Topic: a sleepy dragon"));
    assert!(stories[1].contains("Previous Story Context: A dragon slept."));
    server.abort();
}

#[tokio::test]
async fn disabled_generation_keeps_the_socket_open() {
    let (url, server) = start(None).await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    socket.send(Message::Text("a fox".to_string().into())).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    assert!(reply.is_err(), "no events expected without a generator");
    socket.send(Message::Text("still here".to_string().into())).await.unwrap();
    server.abort();
}
