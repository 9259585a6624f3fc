//! End-to-end tests: edge service → orchestrator → upstreams over real sockets

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use cep_weather::{
    AwesomeApiResolver, Location, LocationError, LocationResolver, RequestContext,
    ShutdownOutcome, Supervisor, Temperature, WeatherApiResolver, WeatherError, WeatherResolver,
    input::{self, InputState},
    orchestrator::{self, OrchestratorState},
};
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

struct FixedLocation {
    calls: AtomicUsize,
}

#[async_trait]
impl LocationResolver for FixedLocation {
    async fn resolve(&self, _ctx: &RequestContext, cep: &str) -> Result<Location, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match cep {
            "00000000" => Err(LocationError::NotFound),
            _ => Ok(Location::new("X", "SP", "-23.5", "-46.6", "fixed")),
        }
    }
}

struct FixedWeather;

#[async_trait]
impl WeatherResolver for FixedWeather {
    async fn resolve(
        &self,
        _ctx: &RequestContext,
        _latitude: &str,
        _longitude: &str,
    ) -> Result<Temperature, WeatherError> {
        Ok(Temperature::from_celsius(20.0, "fixed"))
    }
}

/// A service running under a [`Supervisor`] until `stop` is sent
struct Running {
    url: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<ShutdownOutcome, cep_weather::ServiceError>>,
}

impl Running {
    async fn start(name: &'static str, app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let supervisor = Supervisor::new(name, Duration::from_secs(2));
        let handle = tokio::spawn(async move {
            supervisor
                .run(listener, app, async {
                    let _ = stopped.await;
                })
                .await
        });
        Self {
            url: format!("http://{addr}"),
            stop,
            handle,
        }
    }

    async fn stop(self) -> ShutdownOutcome {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap()
    }
}

async fn post_cep(edge: &Running, body: &'static str) -> (reqwest::StatusCode, String) {
    let response = reqwest::Client::new()
        .post(format!("{}/api/weather", edge.url))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_edge_to_orchestrator_success() {
    let locations = Arc::new(FixedLocation {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Running::start(
        "orchestrator",
        orchestrator::router(OrchestratorState::new(locations.clone(), Arc::new(FixedWeather))),
    )
    .await;
    let edge = Running::start(
        "input",
        input::router(InputState::new(orchestrator.url.clone()).unwrap()),
    )
    .await;

    let (status, body) = post_cep(&edge, r#"{"cep":"01001000"}"#).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, r#"{"city":"X","temp_C":20,"temp_F":68,"temp_K":293}"#);

    let (status, again) = post_cep(&edge, r#"{"cep":"01001000"}"#).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(again, body);
    assert_eq!(locations.calls.load(Ordering::SeqCst), 2);

    assert_eq!(edge.stop().await, ShutdownOutcome::Drained);
    assert_eq!(orchestrator.stop().await, ShutdownOutcome::Drained);
}

#[tokio::test]
async fn test_orchestrator_errors_pass_through_edge() {
    let locations = Arc::new(FixedLocation {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Running::start(
        "orchestrator",
        orchestrator::router(OrchestratorState::new(locations.clone(), Arc::new(FixedWeather))),
    )
    .await;
    let edge = Running::start(
        "input",
        input::router(InputState::new(orchestrator.url.clone()).unwrap()),
    )
    .await;

    let (status, body) = post_cep(&edge, r#"{"cep":"00000000"}"#).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"can not find zipcode"}"#);

    let (status, body) = post_cep(&edge, r#"{"cep":"0100100"}"#).await;
    assert_eq!(status, reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, r#"{"message":"invalid zipcode"}"#);
    assert_eq!(locations.calls.load(Ordering::SeqCst), 1);

    edge.stop().await;
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_edge_reports_missing_orchestrator() {
    let orchestrator = Running::start("orchestrator", Router::new()).await;
    let url = orchestrator.url.clone();
    orchestrator.stop().await;

    let edge = Running::start("input", input::router(InputState::new(url).unwrap())).await;

    let (status, body) = post_cep(&edge, r#"{"cep":"01001000"}"#).await;
    assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
    assert_eq!(
        body,
        r#"{"message":"orchestrator service is unavailable, try again later"}"#
    );

    edge.stop().await;
}

/// AwesomeAPI and WeatherAPI stand-ins on one router
fn upstreams() -> Router {
    Router::new()
        .route(
            "/json/{cep}",
            get(|Path(cep): Path<String>| async move {
                if cep == "01001000" {
                    Json(json!({
                        "cep": "01001000",
                        "address": "Praça da Sé",
                        "district": "Sé",
                        "city": "São Paulo",
                        "state": "SP",
                        "lat": "-23.55",
                        "lng": "-46.63"
                    }))
                    .into_response()
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }),
        )
        .route(
            "/v1/current.json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("key").map(String::as_str) != Some("secret") {
                    return StatusCode::FORBIDDEN.into_response();
                }
                match params.get("q").map(String::as_str) {
                    Some("-23.55,-46.63") => {
                        Json(json!({"current": {"temp_c": 25.0}})).into_response()
                    }
                    _ => StatusCode::BAD_REQUEST.into_response(),
                }
            }),
        )
}

#[tokio::test]
async fn test_production_resolvers_against_stub_upstreams() {
    let upstream = Running::start("upstream", upstreams()).await;
    let state = OrchestratorState::new(
        Arc::new(AwesomeApiResolver::new(upstream.url.clone()).unwrap()),
        Arc::new(WeatherApiResolver::new(upstream.url.clone(), "secret").unwrap()),
    );
    let orchestrator = Running::start("orchestrator", orchestrator::router(state)).await;
    let edge = Running::start(
        "input",
        input::router(InputState::new(orchestrator.url.clone()).unwrap()),
    )
    .await;

    let (status, body) = post_cep(&edge, r#"{"cep":"01001000"}"#).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(
        body,
        r#"{"city":"São Paulo","temp_C":25,"temp_F":77,"temp_K":298}"#
    );

    let (status, _) = post_cep(&edge, r#"{"cep":"99999999"}"#).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

    edge.stop().await;
    orchestrator.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn test_ready_on_both_services() {
    let orchestrator = Running::start(
        "orchestrator",
        orchestrator::router(OrchestratorState::new(
            Arc::new(FixedLocation {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(FixedWeather),
        )),
    )
    .await;
    let edge = Running::start(
        "input",
        input::router(InputState::new(orchestrator.url.clone()).unwrap()),
    )
    .await;

    for url in [&edge.url, &orchestrator.url] {
        let response = reqwest::get(format!("{url}/ready")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().is_empty());
    }

    edge.stop().await;
    orchestrator.stop().await;
}

struct SlowWeather(Duration);

#[async_trait]
impl WeatherResolver for SlowWeather {
    async fn resolve(
        &self,
        _ctx: &RequestContext,
        _latitude: &str,
        _longitude: &str,
    ) -> Result<Temperature, WeatherError> {
        tokio::time::sleep(self.0).await;
        Ok(Temperature::from_celsius(20.0, "slow"))
    }
}

#[tokio::test]
async fn test_admitted_request_survives_orchestrator_shutdown() {
    let orchestrator = Running::start(
        "orchestrator",
        orchestrator::router(OrchestratorState::new(
            Arc::new(FixedLocation {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(SlowWeather(Duration::from_millis(400))),
        )),
    )
    .await;
    let orchestrator_addr = orchestrator.url.trim_start_matches("http://").to_string();
    let edge = Running::start(
        "input",
        input::router(InputState::new(orchestrator.url.clone()).unwrap()),
    )
    .await;
    let edge_url = edge.url.clone();

    let in_flight = tokio::spawn(async move {
        let response = reqwest::Client::new()
            .post(format!("{edge_url}/api/weather"))
            .body(r#"{"cep":"01001000"}"#)
            .send()
            .await
            .unwrap();
        (response.status(), response.text().await.unwrap())
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopping = tokio::spawn(orchestrator.stop());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(
        tokio::net::TcpStream::connect(&orchestrator_addr)
            .await
            .is_err(),
        "orchestrator still accepting after shutdown began"
    );

    let (status, body) = in_flight.await.unwrap();
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, r#"{"city":"X","temp_C":20,"temp_F":68,"temp_K":293}"#);
    assert_eq!(stopping.await.unwrap(), ShutdownOutcome::Drained);

    edge.stop().await;
}
