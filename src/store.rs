//! Backing-store collaborators: annotations and uploaded assets.
//!
//! The batch pipeline talks to persistence through two narrow traits so the
//! core stays free of any concrete database or object-storage dependency:
//!
//! * [`AnnotationStore`] — work-item selection and annotation documents
//! * [`AssetStore`] — uploading captured images, returning a retrievable URL
//!
//! Shipped drivers: a JSON-file collection ([`JsonPoiStore`]) for local
//! batch runs, a directory-backed asset store ([`DirAssetStore`]), and an
//! HTTP multipart uploader ([`HttpAssetStore`]) for remote object storage.
//! A real document database is just another impl of the same traits.

use crate::error::CaptureError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Annotation kind for capture results (success and failure alike).
pub const SCREENSHOT_KIND: &str = "screenshot";
/// Annotation kind holding a work item's source address.
pub const ADDRESS_KIND: &str = "address";

/// One point of interest selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
}

/// Work-item selection and annotation reads/writes.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Items in the given city with no screenshot annotation yet, up to
    /// `limit`, in store order.
    ///
    /// "Not yet processed" is the stored sentinel `annotations.screenshot
    /// == 0` — a numeric zero, matched exactly as the backing schema uses it.
    async fn find_unprocessed(
        &self,
        city: &str,
        limit: usize,
    ) -> Result<Vec<WorkItem>, CaptureError>;

    /// Fetch the requested annotation kinds for one item. Absent kinds are
    /// simply missing from the returned map.
    async fn get_annotations(
        &self,
        item_id: &str,
        kinds: &[&str],
    ) -> Result<HashMap<String, Value>, CaptureError>;

    /// Write one annotation, replacing any previous value of that kind.
    async fn add_annotation(
        &self,
        item_id: &str,
        kind: &str,
        data: Value,
    ) -> Result<(), CaptureError>;
}

/// A stored asset, addressable by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
}

/// Upload collaborator for captured images.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload_file(
        &self,
        namespace: &str,
        item_id: &str,
        kind: &str,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<UploadedAsset, CaptureError>;
}

// ── JSON-file annotation store ───────────────────────────────────────────

/// A document collection persisted as one JSON file:
/// `{ "pois": [ { "id": …, "city": …, "annotations": { … } }, … ] }`.
///
/// Writes are whole-file and atomic (temp file + rename) so a crashed run
/// never leaves a half-written collection behind. One process at a time:
/// concurrent runs against the same file are not safe against duplicate
/// processing, matching the batch pipeline's stated model.
pub struct JsonPoiStore {
    path: PathBuf,
    collection: String,
    // Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonPoiStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            collection: "pois".to_string(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Value, CaptureError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CaptureError::Store {
                detail: format!("cannot read '{}': {e}", self.path.display()),
            })?;
        serde_json::from_str(&raw).map_err(|e| CaptureError::Store {
            detail: format!("invalid JSON in '{}': {e}", self.path.display()),
        })
    }

    async fn save(&self, root: &Value) -> Result<(), CaptureError> {
        let tmp = self.path.with_extension("json.tmp");
        let pretty = serde_json::to_string_pretty(root)
            .map_err(|e| CaptureError::Internal(e.to_string()))?;
        tokio::fs::write(&tmp, pretty)
            .await
            .map_err(|e| CaptureError::Store {
                detail: format!("cannot write '{}': {e}", tmp.display()),
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CaptureError::Store {
                detail: format!("cannot replace '{}': {e}", self.path.display()),
            })
    }

    fn docs(root: &Value, collection: &str) -> Vec<Value> {
        root.get(collection)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnnotationStore for JsonPoiStore {
    async fn find_unprocessed(
        &self,
        city: &str,
        limit: usize,
    ) -> Result<Vec<WorkItem>, CaptureError> {
        let root = self.load().await?;
        let mut items = Vec::new();

        for doc in Self::docs(&root, &self.collection) {
            if items.len() >= limit {
                break;
            }
            if doc.get("city").and_then(Value::as_str) != Some(city) {
                continue;
            }
            // The backing schema marks "not yet processed" with a literal
            // numeric 0, not false or absence. Matched exactly.
            let pending = doc
                .get("annotations")
                .and_then(|a| a.get(SCREENSHOT_KIND))
                .is_some_and(|v| v == &Value::from(0));
            if !pending {
                continue;
            }
            match doc.get("id").and_then(Value::as_str) {
                Some(id) => items.push(WorkItem { id: id.to_string() }),
                None => warn!("Skipping document without a string id: {doc}"),
            }
        }

        debug!("Selected {} unprocessed item(s) for city '{city}'", items.len());
        Ok(items)
    }

    async fn get_annotations(
        &self,
        item_id: &str,
        kinds: &[&str],
    ) -> Result<HashMap<String, Value>, CaptureError> {
        let root = self.load().await?;
        let mut found = HashMap::new();

        for doc in Self::docs(&root, &self.collection) {
            if doc.get("id").and_then(Value::as_str) != Some(item_id) {
                continue;
            }
            if let Some(annotations) = doc.get("annotations") {
                for &kind in kinds {
                    if let Some(v) = annotations.get(kind) {
                        found.insert(kind.to_string(), v.clone());
                    }
                }
            }
            break;
        }
        Ok(found)
    }

    async fn add_annotation(
        &self,
        item_id: &str,
        kind: &str,
        data: Value,
    ) -> Result<(), CaptureError> {
        let _guard = self.write_lock.lock().await;

        let mut root = self.load().await?;
        let docs = root
            .get_mut(self.collection.as_str())
            .and_then(Value::as_array_mut)
            .ok_or_else(|| CaptureError::Store {
                detail: format!("collection '{}' not found", self.collection),
            })?;

        let doc = docs
            .iter_mut()
            .find(|d| d.get("id").and_then(Value::as_str) == Some(item_id))
            .ok_or_else(|| CaptureError::Store {
                detail: format!("item '{item_id}' not found"),
            })?;

        match doc.get_mut("annotations") {
            Some(Value::Object(map)) => {
                map.insert(kind.to_string(), data);
            }
            _ => {
                let mut map = serde_json::Map::new();
                map.insert(kind.to_string(), data);
                doc["annotations"] = Value::Object(map);
            }
        }

        self.save(&root).await
    }
}

// ── Directory asset store ────────────────────────────────────────────────

/// Filesystem asset store for local runs: assets land under
/// `<root>/<namespace>/<item_id>/<filename>` and the returned URL is a
/// `file://` URL to the written path.
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetStore for DirAssetStore {
    async fn upload_file(
        &self,
        namespace: &str,
        item_id: &str,
        _kind: &str,
        bytes: &[u8],
        filename: &str,
        _content_type: &str,
    ) -> Result<UploadedAsset, CaptureError> {
        let dir = self.root.join(namespace).join(item_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CaptureError::Upload {
                detail: format!("cannot create '{}': {e}", dir.display()),
            })?;

        let path = dir.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CaptureError::Upload {
                detail: format!("cannot write '{}': {e}", path.display()),
            })?;

        let absolute = tokio::fs::canonicalize(&path)
            .await
            .unwrap_or_else(|_| path.clone());
        Ok(UploadedAsset {
            url: format!("file://{}", absolute.display()),
        })
    }
}

// ── HTTP asset store ─────────────────────────────────────────────────────

/// Remote object storage behind a multipart upload endpoint.
///
/// POSTs `namespace`, `item`, and `kind` form fields plus the file part and
/// expects a JSON `{ "url": … }` response.
pub struct HttpAssetStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAssetStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(serde::Deserialize)]
struct UploadResponse {
    url: String,
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload_file(
        &self,
        namespace: &str,
        item_id: &str,
        kind: &str,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<UploadedAsset, CaptureError> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| CaptureError::Upload {
                detail: format!("bad content type '{content_type}': {e}"),
            })?;

        let form = reqwest::multipart::Form::new()
            .text("namespace", namespace.to_string())
            .text("item", item_id.to_string())
            .text("kind", kind.to_string())
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CaptureError::Upload {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CaptureError::Upload {
                detail: format!("HTTP {}", response.status()),
            });
        }

        let body: UploadResponse = response.json().await.map_err(|e| CaptureError::Upload {
            detail: format!("invalid upload response: {e}"),
        })?;
        Ok(UploadedAsset { url: body.url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(docs: Value) -> (tempfile::TempDir, JsonPoiStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pois.json");
        std::fs::write(&path, serde_json::to_string(&json!({ "pois": docs })).unwrap()).unwrap();
        (dir, JsonPoiStore::new(path))
    }

    fn poi(id: &str, city: &str, screenshot: Value) -> Value {
        json!({
            "id": id,
            "city": city,
            "annotations": { "address": format!("{id} street 1"), "screenshot": screenshot }
        })
    }

    #[tokio::test]
    async fn selection_honours_sentinel_city_and_limit() {
        let (_dir, store) = store_with(json!([
            poi("a", "denhaag", json!(0)),
            poi("b", "denhaag", json!({"screenshotUrl": "done"})),
            poi("c", "amsterdam", json!(0)),
            poi("d", "denhaag", json!(0)),
            poi("e", "denhaag", json!(0)),
        ]));

        let items = store.find_unprocessed("denhaag", 2).await.unwrap();
        assert_eq!(
            items,
            vec![WorkItem { id: "a".into() }, WorkItem { id: "d".into() }]
        );
    }

    #[tokio::test]
    async fn sentinel_must_be_numeric_zero() {
        // false and absence do not mean "unprocessed" in the backing schema.
        let (_dir, store) = store_with(json!([
            poi("a", "x", json!(false)),
            json!({ "id": "b", "city": "x", "annotations": {} }),
            poi("c", "x", json!(0)),
        ]));

        let items = store.find_unprocessed("x", 10).await.unwrap();
        assert_eq!(items, vec![WorkItem { id: "c".into() }]);
    }

    #[tokio::test]
    async fn get_annotations_returns_requested_kinds() {
        let (_dir, store) = store_with(json!([poi("a", "x", json!(0))]));

        let anns = store
            .get_annotations("a", &[ADDRESS_KIND, "missing"])
            .await
            .unwrap();
        assert_eq!(anns.get(ADDRESS_KIND), Some(&json!("a street 1")));
        assert!(!anns.contains_key("missing"));

        let none = store.get_annotations("ghost", &[ADDRESS_KIND]).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn add_annotation_replaces_and_persists() {
        let (_dir, store) = store_with(json!([poi("a", "x", json!(0))]));

        store
            .add_annotation("a", SCREENSHOT_KIND, json!({"screenshotUrl": "u"}))
            .await
            .unwrap();

        // Re-read through a fresh store instance: the write must be durable.
        let reread = JsonPoiStore::new(store.path.clone());
        let anns = reread.get_annotations("a", &[SCREENSHOT_KIND]).await.unwrap();
        assert_eq!(anns[SCREENSHOT_KIND], json!({"screenshotUrl": "u"}));

        // And the item no longer selects as unprocessed.
        let items = reread.find_unprocessed("x", 10).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn add_annotation_unknown_item_is_a_store_error() {
        let (_dir, store) = store_with(json!([poi("a", "x", json!(0))]));
        let err = store.add_annotation("ghost", SCREENSHOT_KIND, json!(1)).await;
        assert!(matches!(err, Err(CaptureError::Store { .. })));
    }

    #[tokio::test]
    async fn dir_asset_store_writes_and_returns_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirAssetStore::new(dir.path());

        let asset = store
            .upload_file("denhaag", "a", SCREENSHOT_KIND, b"jpegbytes", "a.jpg", "image/jpeg")
            .await
            .unwrap();

        assert!(asset.url.starts_with("file://"), "got: {}", asset.url);
        let written = dir.path().join("denhaag").join("a").join("a.jpg");
        assert_eq!(std::fs::read(written).unwrap(), b"jpegbytes");
    }
}
