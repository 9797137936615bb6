//! [`BoundaryCache`] owns the current [`FeatureSet`] and refreshes it from
//! an ordered list of sources.
//!
//! Readers clone an `Arc` of the current set and work against it; a refresh
//! builds a complete new set off to the side and swaps the pointer. A lookup
//! in flight during a refresh therefore sees exactly one set. A failed
//! refresh leaves the previous set in place.

use std::{
  sync::{Arc, PoisonError, RwLock},
  time::Duration,
};

use crate::{
  Error, Result, feature::parse_feature_collection, matcher::FeatureSet,
  source::BoundarySource,
};

pub struct BoundaryCache {
  sources: Vec<BoundarySource>,
  timeout: Duration,
  client:  reqwest::Client,
  current: RwLock<Arc<FeatureSet>>,
  /// Serialises loads so concurrent refresh triggers fetch once.
  loading: tokio::sync::Mutex<()>,
}

impl BoundaryCache {
  /// A cache with no features loaded yet. `timeout` bounds each source
  /// attempt independently.
  pub fn new(sources: Vec<BoundarySource>, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("skyreplay/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      sources,
      timeout,
      client,
      current: RwLock::new(Arc::new(FeatureSet::empty())),
      loading: tokio::sync::Mutex::new(()),
    })
  }

  /// A cache pre-populated with `set` and no sources; it never refreshes.
  pub fn with_features(set: FeatureSet) -> Result<Self> {
    let cache = Self::new(Vec::new(), Duration::from_secs(1))?;
    cache.replace(set);
    Ok(cache)
  }

  /// Snapshot of the current set.
  pub fn current(&self) -> Arc<FeatureSet> {
    self
      .current
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Airspace label for a point, resolved against the current set.
  pub fn lookup(&self, lat: f64, lon: f64) -> Option<String> {
    self.current().lookup(lat, lon).map(str::to_owned)
  }

  fn replace(&self, set: FeatureSet) {
    *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(set);
  }

  /// Try each source in order; the first that yields a usable feature
  /// collection replaces the current set. Results are never merged across
  /// sources. Returns the number of features loaded.
  pub async fn load(&self) -> Result<usize> {
    let _guard = self.loading.lock().await;
    self.load_locked().await
  }

  async fn load_locked(&self) -> Result<usize> {
    if self.sources.is_empty() {
      return Err(Error::NoSources);
    }

    for source in &self.sources {
      let text = match tokio::time::timeout(self.timeout, source.fetch(&self.client)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
          tracing::warn!(%source, error = %e, "boundary fetch failed");
          continue;
        }
        Err(_) => {
          tracing::warn!(%source, timeout = ?self.timeout, "boundary fetch timed out");
          continue;
        }
      };

      match parse_feature_collection(&text) {
        Ok(features) if !features.is_empty() => {
          let count = features.len();
          self.replace(FeatureSet::new(features, source.to_string()));
          tracing::info!(%source, count, "loaded airspace boundaries");
          return Ok(count);
        }
        Ok(_) => {
          tracing::warn!(%source, error = %Error::NoUsableFeatures, "boundary document rejected");
        }
        Err(e) => {
          tracing::warn!(%source, error = %e, "boundary document rejected");
        }
      }
    }

    Err(Error::AllSourcesFailed { attempted: self.sources.len() })
  }

  /// Reload if the current set is empty or older than `max_age`. Returns
  /// whether a reload happened.
  pub async fn ensure_fresh(&self, max_age: Duration) -> Result<bool> {
    if !self.is_stale(max_age) {
      return Ok(false);
    }
    let _guard = self.loading.lock().await;
    // Another task may have refreshed while we waited for the lock.
    if !self.is_stale(max_age) {
      return Ok(false);
    }
    self.load_locked().await.map(|_| true)
  }

  fn is_stale(&self, max_age: Duration) -> bool {
    let set = self.current();
    set.is_empty() || set.age().is_none_or(|age| age > max_age)
  }
}

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, time::Instant};

  use super::*;

  const LONDON: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","id":"EGTT",
     "geometry":{"type":"Polygon","coordinates":[[[-6,49],[2,49],[2,55],[-6,55],[-6,49]]]}}
  ]}"#;

  const PARIS: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"name":"LFFF"},
     "geometry":{"type":"Polygon","coordinates":[[[-5,42],[8,42],[8,51],[-5,51],[-5,42]]]}}
  ]}"#;

  fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
      "skyreplay-geo-{}-{name}.geojson",
      std::process::id()
    ));
    std::fs::write(&path, contents).unwrap();
    path
  }

  fn missing(name: &str) -> BoundarySource {
    BoundarySource::File {
      path: std::env::temp_dir().join(format!("skyreplay-geo-missing-{name}.geojson")),
    }
  }

  /// An HTTP source that accepts connections and never answers.
  async fn silent_source() -> BoundarySource {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let mut held = Vec::new();
      while let Ok((socket, _)) = listener.accept().await {
        held.push(socket);
      }
    });
    BoundarySource::Http { url: format!("http://{addr}/boundaries.geojson") }
  }

  fn cache(sources: Vec<BoundarySource>) -> BoundaryCache {
    BoundaryCache::new(sources, Duration::from_secs(5)).unwrap()
  }

  #[tokio::test]
  async fn first_good_source_wins() {
    let london = write_temp("first-london", LONDON);
    let paris = write_temp("first-paris", PARIS);
    let c = cache(vec![
      missing("first"),
      BoundarySource::File { path: london.clone() },
      BoundarySource::File { path: paris },
    ]);

    assert_eq!(c.load().await.unwrap(), 1);
    let set = c.current();
    assert_eq!(set.features()[0].label, "EGTT");
    assert_eq!(set.source(), Some(format!("file://{}", london.display()).as_str()));
    // Never merged with the later source.
    assert_eq!(c.lookup(45.0, 2.0), None);
    assert_eq!(c.lookup(53.0, -3.0).as_deref(), Some("EGTT"));
  }

  #[tokio::test]
  async fn malformed_and_empty_documents_fall_through() {
    let garbage = write_temp("fall-garbage", "{ not geojson");
    let empty = write_temp("fall-empty", r#"{"type":"FeatureCollection","features":[]}"#);
    let paris = write_temp("fall-paris", PARIS);
    let c = cache(vec![
      BoundarySource::File { path: garbage },
      BoundarySource::File { path: empty },
      BoundarySource::File { path: paris },
    ]);

    c.load().await.unwrap();
    assert_eq!(c.lookup(45.0, 2.0).as_deref(), Some("LFFF"));
  }

  #[tokio::test]
  async fn failed_refresh_keeps_previous_set() {
    let london = write_temp("keep-london", LONDON);
    let c = cache(vec![BoundarySource::File { path: london.clone() }]);
    c.load().await.unwrap();
    let before = c.current();

    std::fs::remove_file(&london).unwrap();
    let err = c.load().await.unwrap_err();
    assert!(matches!(err, Error::AllSourcesFailed { attempted: 1 }));

    let after = c.current();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(c.lookup(53.0, -3.0).as_deref(), Some("EGTT"));
  }

  #[tokio::test]
  async fn readers_keep_their_snapshot_across_a_swap() {
    let london = write_temp("swap-london", LONDON);
    let paris = write_temp("swap-paris", PARIS);
    let c = cache(vec![BoundarySource::File { path: london.clone() }]);
    c.load().await.unwrap();
    let held = c.current();

    // Point the same path at a different dataset and reload.
    std::fs::copy(&paris, &london).unwrap();
    c.load().await.unwrap();

    assert_eq!(held.lookup(53.0, -3.0), Some("EGTT"));
    assert_eq!(c.lookup(45.0, 2.0).as_deref(), Some("LFFF"));
  }

  #[tokio::test]
  async fn ensure_fresh_only_reloads_when_needed() {
    let london = write_temp("fresh-london", LONDON);
    let c = cache(vec![BoundarySource::File { path: london }]);

    assert!(c.ensure_fresh(Duration::from_secs(3600)).await.unwrap());
    assert!(!c.ensure_fresh(Duration::from_secs(3600)).await.unwrap());
    assert!(c.ensure_fresh(Duration::ZERO).await.unwrap());
  }

  #[tokio::test]
  async fn slow_source_times_out_and_falls_through() {
    let london = write_temp("slow-london", LONDON);
    let c = BoundaryCache::new(
      vec![silent_source().await, BoundarySource::File { path: london }],
      Duration::from_millis(200),
    )
    .unwrap();

    let started = Instant::now();
    assert_eq!(c.load().await.unwrap(), 1);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
    assert_eq!(c.lookup(53.0, -3.0).as_deref(), Some("EGTT"));
  }

  #[tokio::test]
  async fn slow_only_source_keeps_previous_set() {
    let c = BoundaryCache::new(vec![silent_source().await], Duration::from_millis(200)).unwrap();
    c.replace(FeatureSet::new(parse_feature_collection(LONDON).unwrap(), "inline"));
    let before = c.current();

    let err = c.load().await.unwrap_err();
    assert!(matches!(err, Error::AllSourcesFailed { attempted: 1 }));
    assert!(Arc::ptr_eq(&before, &c.current()));
    assert_eq!(c.lookup(53.0, -3.0).as_deref(), Some("EGTT"));
  }

  #[tokio::test]
  async fn no_sources_is_an_error() {
    let c = cache(vec![]);
    assert!(matches!(c.load().await.unwrap_err(), Error::NoSources));
  }

  #[tokio::test]
  async fn prepopulated_cache_answers_lookups() {
    let features = parse_feature_collection(LONDON).unwrap();
    let c = BoundaryCache::with_features(FeatureSet::new(features, "inline")).unwrap();
    assert_eq!(c.lookup(53.0, -3.0).as_deref(), Some("EGTT"));
  }
}
