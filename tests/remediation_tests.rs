//! Wire-level tests against a mock API server.
//!
//! These pin the HTTP contract the recycler relies on: the shape of the
//! watch request, the mapping of watch frames into events, and the forced
//! delete with a zero grace period.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pod_recycler::classify::classify;
use pod_recycler::{
    Classification, ClusterClient, Error, KubeClusterClient, PodEvent, PodRef, Remediator,
    WatchSupervisor,
};
use serde_json::{json, Value};
use wiremock::http::Method;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn cluster_for(server: &MockServer) -> KubeClusterClient {
    let config = kube::Config::new(server.uri().parse().expect("mock server uri"));
    let client = kube::Client::try_from(config).expect("client from config");
    KubeClusterClient::new(client)
}

fn pod_object(namespace: &str, name: &str, waiting_reason: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "namespace": namespace, "name": name },
        "status": {
            "containerStatuses": [{
                "name": "app",
                "ready": false,
                "restartCount": 7,
                "image": "registry.local/app:1.4.2",
                "imageID": "registry.local/app@sha256:6f3c",
                "state": {
                    "waiting": {
                        "reason": waiting_reason,
                        "message": "back-off 5m0s restarting failed container"
                    }
                }
            }]
        }
    })
}

fn watch_line(event_type: &str, object: &Value) -> String {
    json!({ "type": event_type, "object": object }).to_string()
}

fn status_success() -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Success"
    })
}

fn status_not_found(name: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": format!("pods \"{name}\" not found"),
        "reason": "NotFound",
        "details": { "name": name, "kind": "pods" },
        "code": 404
    })
}

#[tokio::test]
async fn watch_stream_maps_lifecycle_frames() {
    let server = MockServer::start().await;

    let body = [
        watch_line("MODIFIED", &pod_object("ns", "app-1", "CrashLoopBackOff")),
        watch_line(
            "BOOKMARK",
            &json!({
                "kind": "Pod",
                "apiVersion": "v1",
                "metadata": { "resourceVersion": "12702" }
            }),
        ),
        watch_line("ADDED", &pod_object("ns", "app-2", "ContainerCreating")),
        r#"{"type":"MODIFIED","object":{"metadata":"#.to_string(),
        r#"{"type":"MODIFIED","object":123}"#.to_string(),
        watch_line("DELETED", &pod_object("ns", "app-3", "CrashLoopBackOff")),
    ]
    .join("\n")
        + "\n";

    Mock::given(method("GET"))
        .and(path("/api/v1/pods"))
        .and(query_param("watch", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).await;
    let events: Vec<PodEvent> = cluster
        .watch_pods()
        .await
        .expect("watch opens")
        .collect()
        .await;

    // The bookmark and the incomplete line are dropped before anything
    // surfaces; a complete line that does not decode as a pod event comes
    // through as Unrecognized.
    assert_eq!(events.len(), 4, "unexpected events: {events:?}");
    assert!(
        matches!(&events[0], PodEvent::Modified(pod) if pod.metadata.name.as_deref() == Some("app-1"))
    );
    assert!(
        matches!(&events[1], PodEvent::Added(pod) if pod.metadata.name.as_deref() == Some("app-2"))
    );
    assert!(matches!(&events[2], PodEvent::Unrecognized(_)));
    assert!(
        matches!(&events[3], PodEvent::Deleted(pod) if pod.metadata.name.as_deref() == Some("app-3"))
    );

    // The decoded modification carries everything classification needs.
    assert_eq!(
        classify(&events[0]),
        Classification::Remediate(PodRef::new("ns", "app-1"))
    );
}

#[tokio::test]
async fn watch_error_frame_surfaces_as_error_event() {
    let server = MockServer::start().await;

    let body = watch_line(
        "ERROR",
        &json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": "too old resource version: 1 (2)",
            "reason": "Expired",
            "code": 410
        }),
    ) + "\n";

    Mock::given(method("GET"))
        .and(path("/api/v1/pods"))
        .and(query_param("watch", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).await;
    let events: Vec<PodEvent> = cluster
        .watch_pods()
        .await
        .expect("watch opens")
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        PodEvent::Error(message) => assert!(message.contains("too old resource version")),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn force_delete_sends_zero_grace_period() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/namespaces/payments/pods/api-1"))
        .and(body_partial_json(json!({ "gracePeriodSeconds": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_success()))
        .expect(1)
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).await;
    cluster
        .delete_pod(&PodRef::new("payments", "api-1"))
        .await
        .expect("delete succeeds");
}

#[tokio::test]
async fn delete_of_missing_pod_is_a_uniform_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/namespaces/ns/pods/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(status_not_found("gone")))
        .mount(&server)
        .await;

    let cluster = Arc::new(cluster_for(&server).await);
    let remediator = Remediator::new(cluster);

    let err = remediator
        .remediate(&PodRef::new("ns", "gone"))
        .await
        .unwrap_err();

    match err {
        Error::DeleteFailed { pod, source } => {
            assert_eq!(pod, PodRef::new("ns", "gone"));
            match *source {
                Error::Kube(kube::Error::Api(ref response)) => assert_eq!(response.code, 404),
                ref other => panic!("expected API error, got {other:?}"),
            }
        }
        other => panic!("expected DeleteFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn supervisor_remediates_and_reconnects_against_api_server() {
    let server = MockServer::start().await;

    let body = watch_line("MODIFIED", &pod_object("ns", "app-1", "CrashLoopBackOff")) + "\n";
    Mock::given(method("GET"))
        .and(path("/api/v1/pods"))
        .and(query_param("watch", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/namespaces/ns/pods/app-1"))
        .and(body_partial_json(json!({ "gracePeriodSeconds": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_success()))
        .expect(1)
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).await;
    let supervisor = WatchSupervisor::new(Arc::new(cluster), Duration::from_millis(50));
    let handle = tokio::spawn(async move { supervisor.run().await });

    // Enough real time for the first stream to drain and several reconnects.
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.abort();

    let requests = server
        .received_requests()
        .await
        .expect("request recording enabled");

    let watch_opens = requests
        .iter()
        .filter(|r| r.method == Method::GET && r.url.path() == "/api/v1/pods")
        .count();
    assert!(
        watch_opens >= 2,
        "expected at least one reconnect, saw {watch_opens} watch requests"
    );

    let deletes: Vec<_> = requests
        .iter()
        .filter(|r| r.method == Method::DELETE)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].url.path(), "/api/v1/namespaces/ns/pods/app-1");
    let body: Value = serde_json::from_slice(&deletes[0].body).expect("delete body is JSON");
    assert_eq!(body["gracePeriodSeconds"], 0);
}
