use async_std::task;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// CDN stand-in: serves `/cdn/:name` from memory and counts requests.
#[derive(Clone, Default)]
pub struct Cdn {
    files: Arc<HashMap<String, Vec<u8>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl Cdn {
    /// Every file's body is its own name, so every file hashes differently.
    pub fn with_files(names: &[&str]) -> Self {
        Self {
            files: Arc::new(
                names
                    .iter()
                    .map(|n| (n.to_string(), format!("content of {}", n).into_bytes()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

async fn serve(req: tide::Request<Cdn>) -> tide::Result {
    let name = req.param("name")?.to_string();
    let cdn = req.state();
    *cdn.hits.lock().unwrap().entry(name.clone()).or_default() += 1;
    match cdn.files.get(&name) {
        Some(body) => Ok(tide::Response::builder(200)
            .body(tide::Body::from_bytes(body.clone()))
            .build()),
        None => Ok(tide::Response::new(404)),
    }
}

/// Starts the CDN on a free local port and returns its base URL.
pub async fn start_cdn(cdn: Cdn) -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("no free port")
        .port();
    let addr = format!("127.0.0.1:{}", port);

    let mut app = tide::with_state(cdn);
    app.at("/cdn/:name").get(serve);

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
    panic!("cdn failed to start on {}", addr);
}
