use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::error::LoadError;
use crate::models::{ComponentRef, LoadedView};
use crate::table::RouteTable;

// 1. ViewLoader Contract
/// ViewLoader
///
/// Fetches the code chunk behind a lazily loaded view and returns the asset
/// location it was served from. Swappable so tests can count or delay loads.
#[async_trait]
pub trait ViewLoader: Send + Sync {
    async fn load_chunk(&self, chunk: &str) -> Result<String, LoadError>;
}

pub type LoaderState = Arc<dyn ViewLoader>;

// 2. The Manifest Implementation
/// ChunkManifest
///
/// Maps each lazy chunk declared in the route table to its asset URL under
/// the configured base URL (`{base}js/{chunk}.js`).
#[derive(Debug, Clone, Default)]
pub struct ChunkManifest {
    assets: HashMap<String, String>,
}

impl ChunkManifest {
    pub fn from_table(table: &RouteTable, base_url: &str) -> Self {
        let assets = table
            .routes()
            .filter_map(|route| match &route.component {
                ComponentRef::Lazy { chunk, .. } => {
                    Some((chunk.clone(), format!("{}js/{}.js", base_url, chunk)))
                }
                ComponentRef::Eager { .. } => None,
            })
            .collect();
        Self { assets }
    }

    pub fn asset(&self, chunk: &str) -> Option<&str> {
        self.assets.get(chunk).map(String::as_str)
    }
}

#[async_trait]
impl ViewLoader for ChunkManifest {
    async fn load_chunk(&self, chunk: &str) -> Result<String, LoadError> {
        self.asset(chunk)
            .map(str::to_string)
            .ok_or_else(|| LoadError::UnknownChunk(chunk.to_string()))
    }
}

// 3. Memoizing front
/// LazyViews
///
/// Materializes component references. Eager views resolve immediately; each
/// lazy chunk is loaded on first use and cached for every later navigation.
/// A failed load is not cached, so the next navigation retries it.
pub struct LazyViews {
    loader: LoaderState,
    chunks: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl LazyViews {
    pub fn new(loader: LoaderState) -> Self {
        Self {
            loader,
            chunks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn materialize(&self, component: &ComponentRef) -> Result<LoadedView, LoadError> {
        match component {
            ComponentRef::Eager { view } => Ok(LoadedView {
                view: view.clone(),
                chunk: None,
                asset: None,
            }),
            ComponentRef::Lazy { view, chunk } => {
                let cell = {
                    let mut chunks = self.chunks.lock().await;
                    chunks.entry(chunk.clone()).or_default().clone()
                };
                let asset = cell
                    .get_or_try_init(|| async {
                        tracing::debug!(chunk, "loading view chunk");
                        self.loader.load_chunk(chunk).await
                    })
                    .await?;
                Ok(LoadedView {
                    view: view.clone(),
                    chunk: Some(chunk.clone()),
                    asset: Some(asset.clone()),
                })
            }
        }
    }
}
