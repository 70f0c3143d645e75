use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct RecordResponse {
    id: String,
    date: String,
    rating: u8,
}

#[derive(Debug, Deserialize)]
struct Summary {
    total: usize,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct Cell {
    date: String,
    count: usize,
    level: u8,
}

#[derive(Debug, Deserialize)]
struct MonthLabel {
    week_index: usize,
}

#[derive(Debug, Deserialize)]
struct HeatmapResponse {
    year: i32,
    weeks: Vec<Vec<Cell>>,
    months: Vec<MonthLabel>,
}

#[derive(Debug, Deserialize)]
struct Narrative {
    band: String,
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    total_records: usize,
    narrative: Narrative,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct PageLayout {
    pages: Vec<serde_json::Value>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("moment_log_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/stats")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_moment_log"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("APP_UTC_OFFSET", "+00:00")
        .env("REFRESH_INTERVAL_SECS", "1")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn stats(client: &Client, base_url: &str) -> StatsResponse {
    client
        .get(format!("{base_url}/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_create_update_delete_moment() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let before = stats(&client, &server.base_url).await;

    let response = client
        .post(format!("{}/api/records", server.base_url))
        .json(&serde_json::json!({ "rating": 4, "date": "2023-06-15T21:00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: RecordResponse = response.json().await.unwrap();
    assert_eq!(created.rating, 4);
    assert!(created.date.starts_with("2023-06-15T21:00"));

    let after = stats(&client, &server.base_url).await;
    assert_eq!(after.summary.total, before.summary.total + 1);

    let response = client
        .put(format!("{}/api/records/{}", server.base_url, created.id))
        .json(&serde_json::json!({ "rating": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let records: Vec<RecordResponse> = client
        .get(format!("{}/api/records", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let updated = records.iter().find(|r| r.id == created.id).unwrap();
    assert_eq!(updated.rating, 2);

    let response = client
        .delete(format!("{}/api/records/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .delete(format!("{}/api/records/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let last = stats(&client, &server.base_url).await;
    assert_eq!(last.summary.total, before.summary.total);
}

#[tokio::test]
async fn http_rejects_out_of_range_rating() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/records", server.base_url))
        .json(&serde_json::json!({ "rating": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_heatmap_for_year() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let created: RecordResponse = client
        .post(format!("{}/api/records", server.base_url))
        .json(&serde_json::json!({ "rating": 5, "date": "2020-02-29T08:00:00" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let heatmap: HeatmapResponse = client
        .get(format!("{}/api/heatmap?year=2020", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(heatmap.year, 2020);
    assert_eq!(heatmap.months.len(), 12);
    assert!(heatmap.months.iter().all(|m| m.week_index < heatmap.weeks.len()));
    let cells: Vec<&Cell> = heatmap.weeks.iter().flatten().collect();
    assert_eq!(cells.len(), 366);
    let leap_day = cells.iter().find(|c| c.date == "2020-02-29").unwrap();
    assert_eq!(leap_day.count, 1);
    assert_eq!(leap_day.level, 1);

    client
        .delete(format!("{}/api/records/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
}

#[tokio::test]
async fn http_custom_report_requires_both_dates() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/report?period=custom&start=2024-01-01", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(format!(
            "{}/api/report?period=custom&start=2024-02-01&end=2024-01-01",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_custom_report_counts_range() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let mut ids = Vec::new();
    let moments = [
        ("2019-05-01T10:00", 5),
        ("2019-05-01T22:00", 4),
        ("2019-05-31T23:59", 5),
    ];
    for (date, rating) in moments {
        let created: RecordResponse = client
            .post(format!("{}/api/records", server.base_url))
            .json(&serde_json::json!({ "rating": rating, "date": date }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(created.id);
    }

    let report: ReportResponse = client
        .get(format!(
            "{}/api/report?period=custom&start=2019-05-01&end=2019-05-31",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report.total_records, 3);
    assert_eq!(report.narrative.band, "positive");
    assert!(report.file_name.starts_with("MomentReport_Custom_"));

    let page = client
        .get(format!(
            "{}/report?period=custom&start=2019-05-01&end=2019-05-31",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert!(page.status().is_success());
    assert!(page.text().await.unwrap().contains("Daily breakdown"));

    for id in ids {
        client
            .delete(format!("{}/api/records/{id}", server.base_url))
            .send()
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn http_export_pages_splits_tall_captures() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let layout: PageLayout = client
        .post(format!("{}/api/export/pages", server.base_url))
        .json(&serde_json::json!({ "capture_width": 600.0, "capture_height": 2000.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(layout.pages.len(), 3);

    let response = client
        .post(format!("{}/api/export/pages", server.base_url))
        .json(&serde_json::json!({ "capture_width": 0.0, "capture_height": 2000.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn http_export_rejects_captures_beyond_page_limit() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    for height in [1e9, 1e300] {
        let response = client
            .post(format!("{}/api/export/pages", server.base_url))
            .json(&serde_json::json!({ "capture_width": 1.0, "capture_height": height }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // The server is still up after the rejected exports.
    stats(&client, &server.base_url).await;
}

#[tokio::test]
async fn http_heatmap_handles_extreme_years() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/heatmap?year=262142", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/api/heatmap?year=300000", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    stats(&client, &server.base_url).await;
}

#[tokio::test]
async fn http_accepts_offset_timestamps() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let created: RecordResponse = client
        .post(format!("{}/api/records", server.base_url))
        .json(&serde_json::json!({ "rating": 3, "date": "2018-07-01T23:30:00+02:00" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Server runs at +00:00.
    assert!(created.date.starts_with("2018-07-01T21:30"));

    client
        .delete(format!("{}/api/records/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
}
