//! End-to-end lifecycle tests over real sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use service_lifecycle::config::AppConfig;
use service_lifecycle::lifecycle::{Application, NotifySocket, ReadinessNotifier, RunningState, ShutdownReason};
use service_lifecycle::net::ListenerState;

mod common;

fn base_url(app: &Application) -> String {
    let addr = app.active_listeners()[0].local_addr().unwrap();
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_start_serves_traffic_and_health() {
    let (app, _terminator) = common::test_app(AppConfig {
        banner: Some("TestService/1.0".into()),
        ..AppConfig::default()
    });
    app.add_listener(common::loopback()).unwrap();

    let addresses = Arc::new(Mutex::new(Vec::new()));
    let seen = addresses.clone();
    app.on_listening(move |event| {
        let seen = seen.clone();
        async move {
            *seen.lock().unwrap() = event.payload.clone();
        }
    });

    assert_eq!(app.start().await.unwrap(), RunningState::Listening);
    assert_eq!(app.active_listeners().len(), 1);

    let url = base_url(&app);
    assert_eq!(*addresses.lock().unwrap(), vec![format!("{}/", url)]);

    let client = reqwest::Client::new();
    let res = client.get(format!("{}/anything", url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["server"], "TestService/1.0");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "Hello World");

    let res = client
        .get(format!("{}/anything", url))
        .header("user-agent", "GoogleHC/1.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["healthy"], true);
    assert_eq!(body["state"], "listening");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_failed_startup_never_listens() {
    let (app, _terminator) = common::test_app(AppConfig::default());
    let handle = app.add_listener(common::loopback()).unwrap();
    app.on_startup(|_| async { true });
    app.on_startup(|_| async { false });

    assert_eq!(app.start().await.unwrap(), RunningState::Starting);
    assert_eq!(handle.state(), ListenerState::Initialising);
    assert!(handle.local_addr().is_none());
}

#[tokio::test]
async fn test_bind_failure_leaves_ready() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let (app, _terminator) = common::test_app(AppConfig::default());
    let handle = app
        .add_listener(service_lifecycle::config::ListenerConfig::port(port).with_host("127.0.0.1"))
        .unwrap();

    assert_eq!(app.start().await.unwrap(), RunningState::Ready);
    assert_eq!(handle.state(), ListenerState::Error);
    assert!(app.active_listeners().is_empty());
}

#[tokio::test]
async fn test_one_good_listener_is_enough() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let (app, _terminator) = common::test_app(AppConfig::default());
    app.add_listener(service_lifecycle::config::ListenerConfig::port(port).with_host("127.0.0.1"))
        .unwrap();
    app.add_listener(common::loopback()).unwrap();

    assert_eq!(app.start().await.unwrap(), RunningState::Listening);
    assert_eq!(app.active_listeners().len(), 1);
}

#[tokio::test]
async fn test_state_change_messages() {
    let (app, _terminator) = common::test_app(AppConfig {
        banner: Some("Svc".into()),
        ..AppConfig::default()
    });
    let logs = Arc::new(Mutex::new(Vec::new()));
    let l = logs.clone();
    app.on_log(move |event| {
        let l = l.clone();
        async move {
            l.lock().unwrap().push(event.payload.clone());
        }
    });

    app.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let logs = logs.lock().unwrap();
    assert!(logs.contains(&"Svc is starting".to_string()));
    assert!(logs.contains(&"Svc is ready".to_string()));
}

#[tokio::test]
async fn test_shutdown_closes_listeners_and_exits() {
    let (app, terminator) = common::test_app(AppConfig::default());
    let handle = app.add_listener(common::loopback()).unwrap();
    app.on_shutdown(|event| async move {
        event.source.close_listeners().await;
        true
    });

    app.start().await.unwrap();
    let url = base_url(&app);

    assert_eq!(app.initiate_shutdown(ShutdownReason::Signal("SIGTERM")).await, Some(0));
    assert_eq!(handle.state(), ListenerState::Closed);
    assert_eq!(terminator.codes(), vec![0]);
    assert!(reqwest::get(url).await.is_err());
}

#[tokio::test]
async fn test_request_events() {
    let (app, _terminator) = common::test_app(AppConfig::default());
    app.add_listener(common::loopback()).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    app.on_request(move |event| {
        let c = c.clone();
        async move {
            if event.payload.path == "/hello" {
                c.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    app.start().await.unwrap();
    let res = reqwest::get(format!("{}/hello", base_url(&app))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[derive(Clone, Default)]
struct CountingNotifier(Arc<AtomicUsize>);

impl ReadinessNotifier for CountingNotifier {
    fn notify_ready(&self) -> std::io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_readiness_sent_once_on_listening() {
    let notifier = CountingNotifier::default();
    let app = Application::builder(AppConfig::default())
        .routes(common::hello_router())
        .terminator(common::RecordingTerminator::default())
        .readiness_notifier(notifier.clone())
        .build();
    app.add_listener(common::loopback()).unwrap();
    app.add_listener(common::loopback()).unwrap();

    app.start().await.unwrap();
    assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_readiness_without_listening() {
    let notifier = CountingNotifier::default();
    let app = Application::builder(AppConfig::default())
        .terminator(common::RecordingTerminator::default())
        .readiness_notifier(notifier.clone())
        .build();

    assert_eq!(app.start().await.unwrap(), RunningState::Ready);
    assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_notify_socket_datagram() {
    let dir = std::env::temp_dir().join(format!("svc-notify-{}", std::process::id()));
    let _ = std::fs::remove_file(&dir);
    let receiver = std::os::unix::net::UnixDatagram::bind(&dir).unwrap();

    let app = Application::builder(AppConfig::default())
        .routes(common::hello_router())
        .terminator(common::RecordingTerminator::default())
        .readiness_notifier(NotifySocket::new(&dir))
        .build();
    app.add_listener(common::loopback()).unwrap();
    app.start().await.unwrap();

    let mut buf = [0u8; 32];
    let n = receiver.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"READY=1");
    let _ = std::fs::remove_file(&dir);
}
