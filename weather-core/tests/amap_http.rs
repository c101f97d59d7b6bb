//! Drives `AmapProvider` and `QueryPipeline` over real HTTP against a local
//! stub that serves canned AMap payloads.

use amap_weather_core::{
    AmapProvider, ApiKey, Config, QueryError, QueryPipeline, WeatherProvider,
};
use chrono::NaiveDate;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

const KEY: &str = "TEST_KEY_123";

const GEOCODE_BEIJING: &str = r#"{"status":"1","info":"OK","infocode":"10000","count":"1","geocodes":[{"formatted_address":"北京市","country":"中国","province":"北京市","citycode":"010","city":"北京市","district":[],"adcode":"110000","location":"116.407387,39.904179","level":"省"}]}"#;
const GEOCODE_SHANGHAI: &str = r#"{"status":"1","info":"OK","infocode":"10000","count":"1","geocodes":[{"formatted_address":"上海市","province":"上海市","city":"上海市","district":[],"adcode":"310000","location":"121.473667,31.230525"}]}"#;
const GEOCODE_EMPTY: &str = r#"{"status":"1","info":"OK","infocode":"10000","count":"0","geocodes":[]}"#;
const INVALID_KEY: &str = r#"{"status":"0","info":"INVALID_USER_KEY","infocode":"10001"}"#;

const LIVE_BEIJING: &str = r#"{"status":"1","count":"1","info":"OK","infocode":"10000","lives":[{"province":"北京","city":"北京市","adcode":"110000","weather":"晴","temperature":"25","winddirection":"北","windpower":"≤3","humidity":"50","reporttime":"2026-10-19 12:00:00"}]}"#;
const LIVE_WITHOUT_TEMPERATURE: &str = r#"{"status":"1","lives":[{"weather":"晴","humidity":"50"}]}"#;
const FORECAST_SHANGHAI: &str = r#"{"status":"1","count":"1","info":"OK","infocode":"10000","forecasts":[{"city":"上海市","adcode":"310000","province":"上海","reporttime":"2026-10-19 11:00:00","casts":[
    {"date":"2026-10-19","week":"1","dayweather":"多云","nightweather":"多云","daytemp":"21","nighttemp":"14","daywind":"东","nightwind":"东","daypower":"1-3","nightpower":"1-3"},
    {"date":"2026-10-20","week":"2","dayweather":"晴","nightweather":"晴","daytemp":"23","nighttemp":"13","daywind":"北","nightwind":"北","daypower":"1-3","nightpower":"1-3"},
    {"date":"2026-10-21","week":"3","dayweather":"小雨","nightweather":"阴","daytemp":"17","nighttemp":"12","daywind":"东北","nightwind":"东北","daypower":"1-3","nightpower":"1-3"},
    {"date":"2026-10-22","week":"4","dayweather":"阴","nightweather":"阴","daytemp":"16","nighttemp":"11","daywind":"北","nightwind":"北","daypower":"1-3","nightpower":"1-3"}]}]}"#;

/// One canned reply, chosen by the first route whose path prefix and query
/// fragment both match the request line.
#[derive(Clone)]
struct Route {
    path: &'static str,
    query_contains: &'static str,
    status: u16,
    body: &'static str,
}

fn route(path: &'static str, query_contains: &'static str, status: u16, body: &'static str) -> Route {
    Route { path, query_contains, status, body }
}

struct Stub {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let routes = routes.clone();
                let seen = seen.clone();

                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }

                    let head = String::from_utf8_lossy(&buf).to_string();
                    let target = head.split_whitespace().nth(1).unwrap_or_default().to_string();
                    seen.lock().expect("request log").push(target.clone());

                    let (status, body) = routes
                        .iter()
                        .find(|r| target.starts_with(r.path) && target.contains(r.query_contains))
                        .map(|r| (r.status, r.body))
                        .unwrap_or((404, "{}"));

                    let reason = match status {
                        200 => "OK",
                        403 => "Forbidden",
                        404 => "Not Found",
                        _ => "Internal Server Error",
                    };
                    let response = format!(
                        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json;charset=UTF-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { base_url: format!("http://{addr}/v3"), requests }
    }

    fn config(&self, key: &str) -> Config {
        let mut cfg = Config { api_base_url: self.base_url.clone(), timeout_secs: 5, ..Config::default() };
        cfg.set_api_key(key);
        cfg
    }

    /// Pinned to the first day of the canned forecast.
    fn pipeline(&self) -> QueryPipeline {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        QueryPipeline::from_config(&self.config(KEY)).expect("pipeline builds").with_today(today)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }
}

fn weather_routes() -> Vec<Route> {
    vec![
        route("/v3/geocode/geo", "address=%E5%8C%97%E4%BA%AC", 200, GEOCODE_BEIJING),
        route("/v3/geocode/geo", "address=%E4%B8%8A%E6%B5%B7", 200, GEOCODE_SHANGHAI),
        route("/v3/geocode/geo", "", 200, GEOCODE_EMPTY),
        route("/v3/weather/weatherInfo", "extensions=base", 200, LIVE_BEIJING),
        route("/v3/weather/weatherInfo", "extensions=all", 200, FORECAST_SHANGHAI),
    ]
}

#[tokio::test]
async fn current_weather_end_to_end() {
    let stub = Stub::start(weather_routes()).await;

    let answer = stub.pipeline().answer("北京的天气").await;

    assert_eq!(answer, "北京市：晴，25°C，北风≤3级，湿度50%（10-19 12:00 发布）");

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains(&format!("key={KEY}")));
    assert!(requests[1].contains("city=110000"));
}

#[tokio::test]
async fn tomorrow_forecast_end_to_end() {
    let stub = Stub::start(weather_routes()).await;

    let answer = stub.pipeline().answer("上海明天天气怎么样").await;

    assert_eq!(answer, "上海市天气预报：\n2026-10-20（周二）：晴，13~23°C，北风1-3级");
    assert!(stub.requests()[1].contains("city=310000"));
}

#[tokio::test]
async fn default_forecast_lists_three_days() {
    let stub = Stub::start(weather_routes()).await;

    let answer = stub.pipeline().answer("上海天气预报").await;
    let lines: Vec<&str> = answer.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("2026-10-19"));
    assert!(lines[3].starts_with("2026-10-21（周三）：小雨转阴"));
}

#[tokio::test]
async fn nonexistent_place() {
    let stub = Stub::start(weather_routes()).await;

    let answer = stub.pipeline().answer("阿特兰蒂斯的天气").await;

    assert_eq!(answer, "未能找到该地点的天气信息");
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn weather_endpoint_http_500() {
    let stub = Stub::start(vec![
        route("/v3/geocode/geo", "", 200, GEOCODE_BEIJING),
        route("/v3/weather/weatherInfo", "", 500, r#"{"message":"boom"}"#),
    ])
    .await;

    let answer = stub.pipeline().answer("北京的天气").await;

    assert_eq!(answer, "天气服务暂时不可用，请稍后再试");
}

#[tokio::test]
async fn invalid_key_never_reaches_weather_endpoint() {
    let stub = Stub::start(vec![
        route("/v3/geocode/geo", "", 200, INVALID_KEY),
        route("/v3/weather/weatherInfo", "", 200, INVALID_KEY),
    ])
    .await;
    let pipeline = stub.pipeline();

    for question in ["北京的天气", "上海明天天气怎么样"] {
        assert_eq!(pipeline.answer(question).await, QueryError::InvalidCredential.user_message());
    }
    assert!(stub.requests().iter().all(|r| r.starts_with("/v3/geocode/geo")));
}

#[tokio::test]
async fn forbidden_status_is_a_credential_problem() {
    let stub = Stub::start(vec![route("/v3/geocode/geo", "", 403, "{}")]).await;
    let provider = AmapProvider::from_config(&stub.config(KEY)).expect("provider builds");

    assert_eq!(provider.geocode("北京").await.unwrap_err(), QueryError::InvalidCredential);
}

#[tokio::test]
async fn missing_temperature_is_named() {
    let stub = Stub::start(vec![
        route("/v3/geocode/geo", "", 200, GEOCODE_BEIJING),
        route("/v3/weather/weatherInfo", "", 200, LIVE_WITHOUT_TEMPERATURE),
    ])
    .await;
    let provider = AmapProvider::from_config(&stub.config(KEY)).expect("provider builds");

    let location = provider.geocode("北京").await.expect("geocoded").remove(0);
    let err = provider.current(&location).await.unwrap_err();

    assert_eq!(err, QueryError::malformed(["lives[0].temperature"]));
    assert_eq!(stub.pipeline().answer("北京的天气").await, err.user_message());
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let stub = Stub::start(vec![route("/v3/geocode/geo", "", 200, "<html>gateway</html>")]).await;
    let provider = AmapProvider::from_config(&stub.config(KEY)).expect("provider builds");

    let err = provider.geocode("北京").await.unwrap_err();

    assert!(matches!(err, QueryError::MalformedResponse { .. }));
}

#[tokio::test]
async fn unreachable_provider_is_unavailable_and_hides_key() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);

    let provider = AmapProvider::new(
        ApiKey::new(KEY),
        &format!("http://{addr}/v3"),
        Duration::from_secs(2),
    )
    .expect("provider builds");

    let err = provider.geocode("北京").await.unwrap_err();

    assert!(matches!(err, QueryError::ProviderUnavailable { .. }));
    assert!(!err.to_string().contains(KEY));
}

#[tokio::test]
async fn silent_provider_times_out_as_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let provider = AmapProvider::new(
        ApiKey::new(KEY),
        &format!("http://{addr}/v3"),
        Duration::from_secs(1),
    )
    .expect("provider builds");

    let err = tokio::time::timeout(Duration::from_secs(10), provider.geocode("北京"))
        .await
        .expect("request must give up on its own")
        .unwrap_err();

    assert!(matches!(err, QueryError::ProviderUnavailable { .. }));
    assert!(err.to_string().contains("timed out"));
    assert!(!err.to_string().contains(KEY));
}

#[tokio::test]
async fn concurrent_questions_share_one_pipeline() {
    let stub = Stub::start(weather_routes()).await;

    let answers = stub
        .pipeline()
        .answer_many(&["北京的天气", "上海明天天气怎么样", "阿特兰蒂斯的天气"])
        .await;

    assert!(answers[0].starts_with("北京市：晴"));
    assert!(answers[1].contains("2026-10-20"));
    assert_eq!(answers[2], "未能找到该地点的天气信息");
}
