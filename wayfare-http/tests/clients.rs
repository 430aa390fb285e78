use chrono::NaiveDate;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wayfare_game::{
    DiscoveryQuery, FlightSearch, Leaderboard, LeaderboardError, LeaderboardMetric, Place,
    SearchResponse, WinSubmission,
};
use wayfare_http::{ClientConfig, HttpFlightSearch, HttpLeaderboard};

/// Serve a single canned response and hand back the raw request.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = head
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn london() -> Place {
    serde_json::from_str(
        r#"{"entityId":"27544008","name":"London","coordinates":{"lat":51.5074,"lng":-0.1278},
            "parentId":"29475437","countryEntityId":"29475437"}"#,
    )
    .unwrap()
}

fn query() -> DiscoveryQuery {
    let anchor = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    DiscoveryQuery::new(Some(&london()), anchor, 3)
}

const QUOTES: &str = r#"{"quotes":[{
    "query":{
        "from":{"entityId":"27544008","name":"London","coordinates":{"lat":51.5074,"lng":-0.1278}},
        "to":{"entityId":"27539733","name":"Paris","coordinates":{"lat":48.8566,"lng":2.3522}},
        "depart":"2025-03-04"},
    "price":{"raw":80.0,"display":"$80"}}]}"#;

#[tokio::test]
async fn search_posts_the_indicative_query() {
    let (base, server) = serve_once("200 OK", QUOTES).await;
    let search = HttpFlightSearch::new(&ClientConfig::new("http://unused", base));

    let response = search.search(&query()).await.unwrap();
    let SearchResponse::Quotes { quotes } = response else {
        panic!("expected quotes");
    };
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].destination().name, "Paris");
    assert_eq!(quotes[0].price.amount(), 80.0);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /search/indicative "));
    assert!(request.contains(r#""from":"27544008""#));
    assert!(request.contains(r#""to":"anywhere""#));
    assert!(request.contains(r#""tripType":"single""#));
    assert!(request.contains(r#""endMonth":6"#));
}

#[tokio::test]
async fn search_error_payload_is_not_a_transport_failure() {
    let (base, server) = serve_once("400 Bad Request", r#"{"error":"unknown origin"}"#).await;
    let search = HttpFlightSearch::new(&ClientConfig::new("http://unused", base));
    let response = search.search(&query()).await.unwrap();
    assert_eq!(
        response,
        SearchResponse::Error {
            error: "unknown origin".to_string()
        }
    );
    server.await.unwrap();
}

#[tokio::test]
async fn search_server_error_becomes_provider_error() {
    let (base, server) = serve_once("502 Bad Gateway", "upstream timeout").await;
    let search = HttpFlightSearch::new(&ClientConfig::new("http://unused", base));
    let err = search.search(&query()).await.unwrap_err();
    assert!(err.to_string().contains("502"));
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_search_is_a_provider_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let search = HttpFlightSearch::new(&ClientConfig::new("http://unused", format!("http://{addr}")));
    assert!(search.search(&query()).await.is_err());
}

#[tokio::test]
async fn win_is_posted_with_joined_stops() {
    let (base, server) = serve_once("201 Created", "{}").await;
    let board = HttpLeaderboard::new(ClientConfig::new(base, "http://unused"));
    let submission = WinSubmission {
        name: "Ada".to_string(),
        stops: "27544008,27539733,27544008".to_string(),
    };
    board.submit_win(&submission).await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /game/won "));
    assert!(request.contains(r#""stops":"27544008,27539733,27544008""#));
}

#[tokio::test]
async fn rejected_win_maps_to_api_error() {
    let (base, server) = serve_once("503 Service Unavailable", "maintenance").await;
    let board = HttpLeaderboard::new(ClientConfig::new(base, "http://unused"));
    let submission = WinSubmission {
        name: "Ada".to_string(),
        stops: "27544008".to_string(),
    };
    let err = board.submit_win(&submission).await.unwrap_err();
    assert_eq!(
        err,
        LeaderboardError::Api {
            status: 503,
            message: "maintenance".to_string()
        }
    );
    server.await.unwrap();
}

#[tokio::test]
async fn top_lists_are_fetched_per_metric() {
    let rows = r#"[{"name":"Ada","award":"gold","amount":42.0,
        "created_at":"2025-03-01T10:00:00Z","updated_at":"2025-03-01T10:00:00Z"}]"#;
    let (base, server) = serve_once("200 OK", rows).await;
    let board = HttpLeaderboard::new(ClientConfig::new(base, "http://unused"));
    let entries = board
        .fetch_top(LeaderboardMetric::ClosestToLimit)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Ada");

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /game/top/price-close "));
}
