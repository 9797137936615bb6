//! A local stand-in for the upstream feed.

use std::{
  net::SocketAddr,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use axum::{Router, http::StatusCode, routing::get};
use tokio::net::TcpListener;

pub struct FeedServer {
  pub hits:    Arc<AtomicUsize>,
  /// When set, every request answers 500.
  pub failing: Arc<AtomicBool>,
  addr:        SocketAddr,
}

impl FeedServer {
  /// Serve `body` at `/feed.json`, waiting `delay` before each response.
  pub async fn start(body: &'static str, delay: Duration) -> Self {
    let hits = Arc::new(AtomicUsize::new(0));
    let failing = Arc::new(AtomicBool::new(false));

    let handler = {
      let hits = hits.clone();
      let failing = failing.clone();
      move || {
        let hits = hits.clone();
        let failing = failing.clone();
        async move {
          hits.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(delay).await;
          if failing.load(Ordering::SeqCst) {
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
          } else {
            (StatusCode::OK, body.to_string())
          }
        }
      }
    };

    let app = Router::new().route("/feed.json", get(handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    Self { hits, failing, addr }
  }

  pub fn url(&self) -> String { format!("http://{}/feed.json", self.addr) }
}
