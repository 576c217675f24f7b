use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

#[derive(Debug, Deserialize)]
struct Summary {
    total_days: usize,
    clean_days: usize,
    saved_money: u64,
}

#[derive(Debug, Deserialize)]
struct ToggleResponse {
    date: String,
    checked: bool,
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct DayCell {
    date: String,
    day: u32,
    weekday: u32,
    checked: bool,
}

#[derive(Debug, Deserialize)]
struct MonthResponse {
    month: String,
    prev: String,
    next: String,
    leading_blanks: u32,
    days: Vec<DayCell>,
    summary: Summary,
}

struct TestServer {
    base_url: String,
    data_path: PathBuf,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static LOCAL_SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static DATABASE_SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Mutex;
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for pid in pids.iter().copied().filter(|pid| *pid > 0) {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
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

fn unique_data_path(extension: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "smoke_free_http_{}_{}.{extension}",
        std::process::id(),
        nanos
    ));
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/summary")).send().await {
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

async fn spawn_server(backend: &str) -> TestServer {
    let port = pick_free_port();
    let (path_var, data_path) = match backend {
        "database" => ("APP_DB_PATH", unique_data_path("sqlite3")),
        _ => ("APP_DATA_PATH", unique_data_path("json")),
    };
    let child = Command::new(env!("CARGO_BIN_EXE_smoke_free"))
        .env("PORT", port.to_string())
        .env("APP_BACKEND", backend)
        .env(path_var, &data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_path,
        child,
    }
}

async fn shared_server(
    slot: &'static Lazy<Mutex<Option<Arc<TestServer>>>>,
    backend: &str,
) -> Arc<TestServer> {
    let mut guard = slot.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(backend).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn local_server() -> Arc<TestServer> {
    shared_server(&LOCAL_SERVER, "local").await
}

async fn database_server() -> Arc<TestServer> {
    shared_server(&DATABASE_SERVER, "database").await
}

async fn checked_map(client: &Client, base_url: &str) -> BTreeMap<String, bool> {
    client
        .get(format!("{base_url}/api/checked"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn toggle(client: &Client, base_url: &str, date: &str) -> ToggleResponse {
    let response = client
        .post(format!("{base_url}/api/toggle"))
        .json(&serde_json::json!({ "date": date }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

async fn month(client: &Client, base_url: &str, month: &str) -> MonthResponse {
    client
        .get(format!("{base_url}/api/month?month={month}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_toggle_twice_restores_day() {
    let _guard = TEST_LOCK.lock().await;
    let server = local_server().await;
    let client = Client::new();

    let before = checked_map(&client, &server.base_url).await;
    let was_checked = before.get("2025-05-20").copied().unwrap_or(false);

    let first = toggle(&client, &server.base_url, "2025-05-20").await;
    assert_eq!(first.date, "2025-05-20");
    assert_eq!(first.checked, !was_checked);

    let second = toggle(&client, &server.base_url, "2025-05-20").await;
    assert_eq!(second.checked, was_checked);

    let after = checked_map(&client, &server.base_url).await;
    assert_eq!(after.get("2025-05-20").copied().unwrap_or(false), was_checked);
}

#[tokio::test]
async fn http_clean_days_ignore_displayed_month() {
    let _guard = TEST_LOCK.lock().await;
    let server = local_server().await;
    let client = Client::new();

    let before = month(&client, &server.base_url, "2025-06").await;
    let toggled = toggle(&client, &server.base_url, "2025-05-15").await;
    let after = month(&client, &server.base_url, "2025-06").await;

    let expected = if toggled.checked {
        before.summary.clean_days + 1
    } else {
        before.summary.clean_days - 1
    };
    assert_eq!(after.summary.clean_days, expected);
    assert_eq!(after.summary.saved_money, expected as u64 * 5_000);
    assert_eq!(toggled.summary.clean_days, expected);
    assert!(after.summary.total_days >= 1);
}

#[tokio::test]
async fn http_month_grid_layout() {
    let _guard = TEST_LOCK.lock().await;
    let server = local_server().await;
    let client = Client::new();

    let june = month(&client, &server.base_url, "2025-06").await;
    assert_eq!(june.month, "2025-06");
    assert_eq!(june.prev, "2025-05");
    assert_eq!(june.next, "2025-07");
    assert_eq!(june.leading_blanks, 0);
    assert_eq!(june.days.len(), 30);
    assert_eq!(june.days[0].date, "2025-06-01");
    assert_eq!(june.days[0].weekday, 0);
    assert!(june.days.windows(2).all(|pair| pair[1].day == pair[0].day + 1));

    let november = month(&client, &server.base_url, "2025-11").await;
    assert_eq!(november.leading_blanks, 6);

    let february = month(&client, &server.base_url, "2024-02").await;
    assert_eq!(february.days.len(), 29);
}

#[tokio::test]
async fn http_rejects_bad_dates_and_months() {
    let _guard = TEST_LOCK.lock().await;
    let server = local_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/toggle", server.base_url))
        .json(&serde_json::json!({ "date": "tomorrow" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(format!("{}/api/month?month=2025-13", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_local_backend_writes_slot_and_has_no_feed() {
    let _guard = TEST_LOCK.lock().await;
    let server = local_server().await;
    let client = Client::new();

    let toggled = toggle(&client, &server.base_url, "2025-08-08").await;

    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let on_disk: BTreeMap<String, bool> = std::fs::read(&server.data_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        if on_disk.get("2025-08-08") == Some(&toggled.checked) {
            break;
        }
        if Instant::now() > deadline {
            panic!("slot never caught up with the toggle");
        }
        sleep(Duration::from_millis(50)).await;
    }

    let response = client
        .get(format!("{}/api/events", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_index_renders_calendar() {
    let _guard = TEST_LOCK.lock().await;
    let server = local_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/?month=2025-06", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("2025-06 smoke-free calendar"));
    assert!(body.contains(r#"data-date="2025-06-30""#));
}

#[tokio::test]
async fn http_form_toggle_redirects_to_month() {
    let _guard = TEST_LOCK.lock().await;
    let server = local_server().await;
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let before = checked_map(&client, &server.base_url).await;
    let was_checked = before.get("2025-09-09").copied().unwrap_or(false);

    let response = client
        .post(format!("{}/toggle/2025-09-09?month=2025-09", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/?month=2025-09"
    );

    let after = checked_map(&client, &server.base_url).await;
    assert_eq!(after.get("2025-09-09").copied(), Some(!was_checked));
}

#[tokio::test]
async fn http_database_backend_pushes_changes() {
    let _guard = TEST_LOCK.lock().await;
    let server = database_server().await;
    let client = Client::new();

    let mut feed = client
        .get(format!("{}/api/events", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(feed.status().is_success());

    let toggled = toggle(&client, &server.base_url, "2025-07-01").await;
    let expected = format!(r#"{{"date":"2025-07-01","checked":{}}}"#, toggled.checked);

    let received = timeout(Duration::from_secs(3), async {
        let mut seen = String::new();
        while let Some(chunk) = feed.chunk().await.unwrap() {
            seen.push_str(&String::from_utf8_lossy(&chunk));
            if seen.contains(&expected) {
                return seen;
            }
        }
        seen
    })
    .await
    .expect("no change event within 3s");

    assert!(received.contains("event: change"));
    assert!(received.contains(&expected));

    let after = checked_map(&client, &server.base_url).await;
    assert_eq!(after.get("2025-07-01").copied(), Some(toggled.checked));
}
