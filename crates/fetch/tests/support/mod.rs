use async_std::task;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Files served by the fixture server plus request counters.
#[derive(Clone, Default)]
pub struct Fixture {
    files: Arc<HashMap<String, Vec<u8>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    flaky_failures: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn new(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: Arc::new(
                files
                    .iter()
                    .map(|(name, body)| (name.to_string(), body.to_vec()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// `/flaky/*` answers 500 this many times before serving.
    pub fn failing_first(self, n: usize) -> Self {
        self.flaky_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(route)
            .copied()
            .unwrap_or_default()
    }

    fn count(&self, route: String) {
        *self.hits.lock().unwrap().entry(route).or_default() += 1;
    }
}

async fn serve(req: tide::Request<Fixture>) -> tide::Result {
    let name = req.param("name")?.to_string();
    let fixture = req.state();
    fixture.count(format!("/files/{}", name));
    match fixture.files.get(&name) {
        Some(body) => Ok(tide::Response::builder(200)
            .body(tide::Body::from_bytes(body.clone()))
            .build()),
        None => Ok(tide::Response::new(404)),
    }
}

async fn flaky(req: tide::Request<Fixture>) -> tide::Result {
    let name = req.param("name")?.to_string();
    let fixture = req.state();
    fixture.count(format!("/flaky/{}", name));
    let remaining = fixture.flaky_failures.load(Ordering::SeqCst);
    if remaining > 0 {
        fixture.flaky_failures.store(remaining - 1, Ordering::SeqCst);
        return Ok(tide::Response::new(500));
    }
    match fixture.files.get(&name) {
        Some(body) => Ok(tide::Response::builder(200)
            .body(tide::Body::from_bytes(body.clone()))
            .build()),
        None => Ok(tide::Response::new(404)),
    }
}

async fn moved(req: tide::Request<Fixture>) -> tide::Result {
    let name = req.param("name")?.to_string();
    Ok(tide::Redirect::temporary(format!("/files/{}", name)).into())
}

/// `/hops/:n/:name` redirects `n` more times through itself before
/// landing on `/files/:name`, so it takes `n + 1` redirects in total.
async fn hops(req: tide::Request<Fixture>) -> tide::Result {
    let name = req.param("name")?.to_string();
    let remaining: usize = req.param("n")?.parse()?;
    let target = match remaining {
        0 => format!("/files/{}", name),
        n => format!("/hops/{}/{}", n - 1, name),
    };
    Ok(tide::Redirect::temporary(target).into())
}

/// Starts a tide server on a free local port and returns its base URL.
pub async fn start_server(fixture: Fixture) -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("no free port")
        .port();
    let addr = format!("127.0.0.1:{}", port);

    let mut app = tide::with_state(fixture);
    app.at("/files/:name").get(serve);
    app.at("/flaky/:name").get(flaky);
    app.at("/moved/:name").get(moved);
    app.at("/hops/:n/:name").get(hops);

    let listen_addr = addr.clone();
    task::spawn(async move {
        let _ = app.listen(listen_addr).await;
    });

    for _ in 0..50 {
        task::sleep(Duration::from_millis(20)).await;
        if async_std::net::TcpStream::connect(&addr).await.is_ok() {
            return format!("http://{}", addr);
        }
    }
    panic!("fixture server failed to start on {}", addr);
}
