//! Gateway client integration tests
//!
//! Every test drives a real `GatewayClient` against an in-process mock
//! gateway; no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use integration_tests::*;
use kook_common::GatewaySettings;
use kook_gateway::error::{GatewayError, HandshakeError, ProcessorError, ResolveError};
use kook_gateway::events::{system_tags, EventType};
use kook_gateway::protocol::HelloCode;
use kook_gateway::{
    ClientState, EventRegistry, GatewayClient, GatewayResolver, HttpGatewayResolver,
};
use parking_lot::Mutex;
use serde_json::json;

const WAIT: Duration = Duration::from_secs(2);

/// Record the `sn` of every event reaching the processor chain
fn record_sns(client: &GatewayClient) -> Arc<Mutex<Vec<u64>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    client.register_processor(move |signal, _| {
        let sink = sink.clone();
        async move {
            sink.lock().push(signal.sn);
            Ok(())
        }
    });
    seen
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_success() {
    let gateway = MockGateway::start(vec![send_all([hello("abc")])]).await.unwrap();
    let client = test_client(&gateway, test_config());

    assert!(client.start().await.unwrap());
    assert_eq!(client.session_id().as_deref(), Some("abc"));
    assert_eq!(client.state(), ClientState::Active);
    assert!(client.is_started());
    assert!(client.is_connected());
    assert!(client.is_active());

    client.cancel(Some("test finished")).await;
    within(client.join()).await.unwrap();
    assert!(!client.is_active());
    assert_eq!(client.state(), ClientState::Closed);
    assert!(eventually(WAIT, || gateway.client_closes() == 1).await);
}

#[tokio::test]
async fn test_handshake_token_expired() {
    let gateway = MockGateway::start(vec![send_all([hello_failure(40103)])]).await.unwrap();
    let client = test_client(&gateway, test_config());

    let err = client.start().await.unwrap_err();
    match err {
        GatewayError::Handshake(ref handshake) => {
            assert_eq!(handshake.hello_code(), Some(HelloCode::TokenExpired));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("token expired"));
    assert_eq!(client.state(), ClientState::Idle);
    assert!(!client.is_started());
    assert_eq!(client.session_id(), None);
}

#[tokio::test]
async fn test_handshake_times_out_without_hello() {
    let gateway = MockGateway::start(vec![vec![Step::Sleep(Duration::from_secs(5))]])
        .await
        .unwrap();
    let mut config = test_config();
    config.connect_timeout = Duration::from_millis(200);
    let client = test_client(&gateway, config);

    let err = within(client.start()).await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Handshake(HandshakeError::Timeout(timeout)) if timeout == Duration::from_millis(200)
    ));
    assert_eq!(client.state(), ClientState::Idle);
}

#[tokio::test]
async fn test_handshake_skips_frames_before_hello() {
    let gateway = MockGateway::start(vec![send_all([pong(), message_event(1, "early"), hello("late")])])
        .await
        .unwrap();
    let client = test_client(&gateway, test_config());

    assert!(client.start().await.unwrap());
    assert_eq!(client.session_id().as_deref(), Some("late"));
    assert_eq!(client.current_sequence_number(), 0);
    client.cancel(None).await;
}

#[tokio::test]
async fn test_server_close_before_hello() {
    let gateway = MockGateway::start(vec![vec![Step::Close]]).await.unwrap();
    let client = test_client(&gateway, test_config());

    let err = client.start().await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Handshake(HandshakeError::TransportClosed(_))
    ));
}

// ============================================================================
// Event Dispatch Tests
// ============================================================================

#[tokio::test]
async fn test_sequence_number_tracks_max() {
    let gateway = MockGateway::start(vec![send_all([
        hello("abc"),
        message_event(1, "one"),
        message_event(2, "two"),
        message_event(5, "five"),
        message_event(3, "stale"),
        message_event(6, "six"),
    ])])
    .await
    .unwrap();
    let client = test_client(&gateway, test_config());
    let seen = record_sns(&client);

    client.start().await.unwrap();
    assert!(eventually(WAIT, || seen.lock().len() == 4).await);
    assert_eq!(*seen.lock(), vec![1, 2, 5, 6]);
    assert_eq!(client.current_sequence_number(), 6);

    client.cancel(None).await;
}

#[tokio::test]
async fn test_pong_and_control_signals_are_not_dispatched() {
    let gateway = MockGateway::start(vec![send_all([
        hello("abc"),
        pong(),
        resume_ack("abc"),
        hello("again"),
        message_event(1, "only event"),
    ])])
    .await
    .unwrap();
    let client = test_client(&gateway, test_config());

    let pre_calls = Arc::new(AtomicUsize::new(0));
    let counter = pre_calls.clone();
    client.register_pre_processor(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let seen = record_sns(&client);

    client.start().await.unwrap();
    assert!(eventually(WAIT, || seen.lock().len() == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pre_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock(), vec![1]);
    assert_eq!(client.session_id().as_deref(), Some("abc"));

    client.cancel(None).await;
}

#[tokio::test]
async fn test_failing_pre_processor_does_not_block_chain() {
    let gateway = MockGateway::start(vec![send_all([hello("abc"), message_event(1, "hi")])])
        .await
        .unwrap();
    let client = test_client(&gateway, test_config());

    let order = Arc::new(Mutex::new(Vec::new()));
    let seen = order.clone();
    client.register_pre_processor(move |_, _| {
        seen.lock().push("pre-1");
        Err(ProcessorError::failed("rejected"))
    });
    let seen = order.clone();
    client.register_pre_processor(move |_, _| {
        seen.lock().push("pre-2");
        panic!("pre-processor bug");
    });
    let seen = order.clone();
    client.register_pre_processor(move |_, _| {
        seen.lock().push("pre-3");
        Ok(())
    });
    let seen = order.clone();
    client.register_processor(move |_, _| {
        let seen = seen.clone();
        async move {
            seen.lock().push("processor");
            Ok(())
        }
    });

    client.start().await.unwrap();
    assert!(eventually(WAIT, || order.lock().len() == 4).await);
    assert_eq!(*order.lock(), vec!["pre-1", "pre-2", "pre-3", "processor"]);
    assert!(client.is_connected());

    client.cancel(None).await;
}

#[tokio::test]
async fn test_lazy_decode_runs_once_per_event() {
    let gateway = MockGateway::start(vec![send_all([
        hello("abc"),
        message_event(1, "first"),
        message_event(2, "second"),
    ])])
    .await
    .unwrap();

    let decodes = Arc::new(AtomicUsize::new(0));
    let counter = decodes.clone();
    let registry = EventRegistry::builder()
        .register(EventType::Text, EventType::Text, move |signal| {
            counter.fetch_add(1, Ordering::SeqCst);
            kook_gateway::events::decode_message(signal)
        })
        .build();
    let client = test_client_with_registry(&gateway, test_config(), registry);

    client.register_pre_processor(|_, lazy| {
        lazy.get().map_err(ProcessorError::from)?;
        Ok(())
    });
    client.register_pre_processor(|_, lazy| {
        lazy.get().map_err(ProcessorError::from)?;
        Ok(())
    });
    let contents = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..2 {
        let contents = contents.clone();
        client.register_processor(move |_, lazy| {
            let contents = contents.clone();
            async move {
                let payload = lazy.get().map_err(ProcessorError::from)?;
                let message = payload
                    .as_message()
                    .ok_or_else(|| ProcessorError::failed("not a message"))?;
                contents.lock().push(message.shell.content.clone());
                Ok(())
            }
        });
    }

    client.start().await.unwrap();
    assert!(eventually(WAIT, || contents.lock().len() == 4).await);
    assert_eq!(decodes.load(Ordering::SeqCst), 2);
    assert_eq!(*contents.lock(), vec!["first", "first", "second", "second"]);

    client.cancel(None).await;
}

#[tokio::test]
async fn test_unregistered_event_delivered_as_unsupported() {
    let gateway = MockGateway::start(vec![send_all([
        hello("abc"),
        system_event(1, "not_a_real_tag", json!({"x": 1})),
        system_event(2, system_tags::JOINED_GUILD, json!({"user_id": "9", "joined_at": 1})),
    ])])
    .await
    .unwrap();
    let client = test_client(&gateway, test_config());

    let kinds = Arc::new(Mutex::new(Vec::new()));
    let sink = kinds.clone();
    client.register_processor(move |_, lazy| {
        let sink = sink.clone();
        async move {
            let payload = lazy.get().map_err(ProcessorError::from)?;
            let kind = match payload.as_system() {
                Some(system) => system.extra.tag.clone(),
                None if payload.is_unsupported() => "unsupported".to_string(),
                None => "other".to_string(),
            };
            sink.lock().push(kind);
            Ok(())
        }
    });

    client.start().await.unwrap();
    assert!(eventually(WAIT, || kinds.lock().len() == 2).await);
    assert_eq!(
        *kinds.lock(),
        vec!["unsupported".to_string(), system_tags::JOINED_GUILD.to_string()]
    );

    client.cancel(None).await;
}

#[tokio::test]
async fn test_async_processing_delivers_every_event() {
    let gateway = MockGateway::start(vec![send_all(
        std::iter::once(hello("abc")).chain((1..=20).map(|sn| message_event(sn, "burst"))),
    )])
    .await
    .unwrap();
    let mut config = test_config();
    config.event_process_async = true;
    let client = test_client(&gateway, config);
    let seen = record_sns(&client);

    client.start().await.unwrap();
    assert!(eventually(WAIT, || seen.lock().len() == 20).await);
    let mut sns = seen.lock().clone();
    sns.sort_unstable();
    assert_eq!(sns, (1..=20).collect::<Vec<u64>>());
    assert_eq!(client.current_sequence_number(), 20);

    client.cancel(None).await;
}

#[tokio::test]
async fn test_compressed_frames_decode_like_text() {
    let gateway = MockGateway::start(vec![send_all([
        compressed(hello("zipped")),
        compressed(message_event(1, "compressed")),
        message_event(2, "plain"),
    ])])
    .await
    .unwrap();
    let mut config = test_config();
    config.compress = true;
    let client = test_client(&gateway, config);

    let contents = Arc::new(Mutex::new(Vec::new()));
    let sink = contents.clone();
    client.register_processor(move |_, lazy| {
        let sink = sink.clone();
        async move {
            let payload = lazy.get().map_err(ProcessorError::from)?;
            if let Some(message) = payload.as_message() {
                sink.lock().push(message.shell.content.clone());
            }
            Ok(())
        }
    });

    assert!(client.start().await.unwrap());
    assert_eq!(client.session_id().as_deref(), Some("zipped"));
    assert!(eventually(WAIT, || contents.lock().len() == 2).await);
    assert_eq!(*contents.lock(), vec!["compressed", "plain"]);

    client.cancel(None).await;
}

// ============================================================================
// Heartbeat Tests
// ============================================================================

#[tokio::test]
async fn test_heartbeat_sends_current_sn() {
    let gateway = MockGateway::start(vec![send_all([hello("abc"), message_event(7, "hi")])])
        .await
        .unwrap();
    let mut config = test_config();
    config.heartbeat.interval = Duration::from_millis(100);
    let client = test_client(&gateway, config);
    let seen = record_sns(&client);

    client.start().await.unwrap();
    assert!(eventually(WAIT, || seen.lock().len() == 1).await);
    assert!(
        eventually(WAIT, || gateway
            .client_frames()
            .iter()
            .any(|frame| frame == r#"{"s":2,"sn":7}"#))
        .await
    );

    client.cancel(None).await;
}

// ============================================================================
// Reconnect Tests
// ============================================================================

#[tokio::test]
async fn test_reconnect_signal_replaces_session_once() {
    let gateway = MockGateway::start(vec![
        vec![
            Step::Send(hello("first")),
            Step::Send(message_event(1, "a")),
            Step::Sleep(Duration::from_millis(200)),
            Step::Send(reconnect(40108)),
        ],
        send_all([hello("second"), message_event(1, "b")]),
    ])
    .await
    .unwrap();
    let mut config = test_config();
    config.heartbeat.interval = Duration::from_millis(50);
    let client = test_client(&gateway, config);
    let seen = record_sns(&client);

    client.start().await.unwrap();
    let first = client.session().unwrap();
    assert!(first.is_heartbeat_running());

    assert!(eventually(WAIT, || client.session_id().as_deref() == Some("second")).await);
    assert!(eventually(WAIT, || gateway.client_closes() == 1).await);
    assert!(eventually(WAIT, || seen.lock().len() == 2).await);

    // the replaced session's heartbeat is stopped
    assert!(first.is_cancelled());
    assert!(eventually(WAIT, || !first.is_heartbeat_running()).await);
    let second = client.session().unwrap();
    assert!(second.is_heartbeat_running());

    // pings keep flowing only on the new connection
    let pings_on = |index: usize| {
        gateway
            .client_frames_on(index)
            .iter()
            .filter(|frame| frame.starts_with(r#"{"s":2,"#))
            .count()
    };
    let first_pings = pings_on(0);
    assert!(first_pings > 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(pings_on(0), first_pings);
    assert!(pings_on(1) > 0);

    assert_eq!(gateway.connections(), 2);
    assert_eq!(gateway.client_closes(), 1);
    assert_eq!(client.state(), ClientState::Active);
    assert!(client.is_started());

    // fresh session, no resume parameters
    let uris = gateway.request_uris();
    assert_eq!(uris.len(), 2);
    assert!(!uris[1].contains("resume"));

    client.cancel(None).await;
    assert!(second.is_cancelled());
    assert!(eventually(WAIT, || gateway.client_closes() == 2).await);
}

#[tokio::test]
async fn test_disconnect_resumes_with_last_sn() {
    let gateway = MockGateway::start(vec![
        vec![
            Step::Send(hello("abc")),
            Step::Send(message_event(3, "x")),
            Step::Send(message_event(7, "y")),
            Step::Sleep(Duration::from_millis(50)),
            Step::Close,
        ],
        send_all([resume_ack("abc"), hello("abc"), message_event(8, "z")]),
    ])
    .await
    .unwrap();
    let client = test_client(&gateway, test_config());
    let seen = record_sns(&client);

    client.start().await.unwrap();
    assert!(eventually(WAIT, || seen.lock().len() == 3).await);
    assert_eq!(*seen.lock(), vec![3, 7, 8]);
    assert_eq!(gateway.connections(), 2);

    let uris = gateway.request_uris();
    assert!(!uris[0].contains("resume"));
    assert!(uris[1].ends_with("compress=0&resume=1&session_id=abc&sn=7"));
    assert_eq!(client.current_sequence_number(), 8);

    client.cancel(None).await;
}

#[tokio::test]
async fn test_disconnect_without_reconnect_goes_idle() {
    let gateway = MockGateway::start(vec![vec![Step::Send(hello("abc")), Step::Close]])
        .await
        .unwrap();
    let mut config = test_config();
    config.reconnect_on_disconnect = false;
    let client = test_client(&gateway, config);

    client.start().await.unwrap();
    assert!(eventually(WAIT, || client.state() == ClientState::Idle).await);
    assert_eq!(client.session_id(), None);
    assert!(!client.is_connected());
    assert!(client.is_started());
    assert!(client.is_active());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gateway.connections(), 1);
}

#[tokio::test]
async fn test_failed_resume_goes_idle() {
    let gateway = MockGateway::start(vec![
        vec![Step::Send(hello("abc")), Step::Close],
        send_all([hello_failure(40101)]),
    ])
    .await
    .unwrap();
    let client = test_client(&gateway, test_config());

    client.start().await.unwrap();
    assert!(eventually(WAIT, || gateway.connections() == 2).await);
    assert!(eventually(WAIT, || client.state() == ClientState::Idle).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gateway.connections(), 2);

    // an explicit start still dials the gateway
    assert!(client.start().await.is_err());
    assert_eq!(gateway.connections(), 3);
}

#[tokio::test]
async fn test_restart_replaces_current_session() {
    let gateway = MockGateway::start(vec![send_all([hello("one")]), send_all([hello("two")])])
        .await
        .unwrap();
    let client = test_client(&gateway, test_config());

    client.start().await.unwrap();
    client.start().await.unwrap();
    assert_eq!(client.session_id().as_deref(), Some("two"));
    assert!(eventually(WAIT, || gateway.client_closes() == 1).await);

    client.cancel(None).await;
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_start_after_cancel_fails() {
    let gateway = MockGateway::start(vec![send_all([hello("abc")])]).await.unwrap();
    let client = test_client(&gateway, test_config());

    client.start().await.unwrap();
    client.cancel(Some("done")).await;
    client.cancel(Some("twice")).await;

    assert!(matches!(client.start().await, Err(GatewayError::Closed)));
    assert_eq!(gateway.connections(), 1);
    assert!(!client.is_connected());
    assert_eq!(client.current_sequence_number(), 0);
}

#[tokio::test]
async fn test_join_returns_after_cancel_from_another_task() {
    let gateway = MockGateway::start(vec![send_all([hello("abc")])]).await.unwrap();
    let client = test_client(&gateway, test_config());
    client.start().await.unwrap();

    let canceller = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel(None).await;
    });

    within(client.join()).await.unwrap();
    assert_eq!(client.state(), ClientState::Closed);
}

// ============================================================================
// Gateway Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_http_resolver_connects_through_index() {
    let gateway = MockGateway::start(vec![send_all([hello("abc")])]).await.unwrap();
    let api = MockApi::pointing_at(&gateway.url()).await.unwrap();

    let mut settings = GatewaySettings::with_token("secret-token");
    settings.api_base_url = api.base_url();
    let resolver = HttpGatewayResolver::new(&settings).unwrap();

    let client = GatewayClient::new(
        test_config(),
        Arc::new(resolver),
        Arc::new(EventRegistry::standard()),
    );
    assert!(client.start().await.unwrap());
    assert_eq!(client.session_id().as_deref(), Some("abc"));

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0.as_deref(), Some("Bot secret-token"));
    assert_eq!(requests[0].1.as_deref(), Some("0"));

    client.cancel(None).await;
}

#[tokio::test]
async fn test_http_resolver_reports_api_error() {
    let api = MockApi::start(json!({"code": 401, "message": "你的token无效"}))
        .await
        .unwrap();
    let mut settings = GatewaySettings::with_token("bad");
    settings.api_base_url = format!("{}/", api.base_url());
    let resolver = HttpGatewayResolver::new(&settings).unwrap();

    let err = resolver.resolve(true).await.unwrap_err();
    assert!(matches!(err, ResolveError::Api { code: 401, .. }));
    assert_eq!(api.requests()[0].1.as_deref(), Some("1"));
}
