//! Test helpers: in-memory database and record service

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::{Identity, RecordItem},
    repository::Repository,
    services::{
        Collaborators, MockCampusOnlineClient, MockFileDownloader, MockMoodleClient,
        MockPureClient, MockRegistryService, RecordService, Services,
    },
};

/// Single-connection in-memory database with the migrations applied
pub async fn memory_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// Collaborators of one test: fake record services plus mocks that
/// panic on any call without an expectation
pub struct Fixture {
    pub marc21: Arc<FakeRecordService>,
    pub lom: Arc<FakeRecordService>,
    pub registry: MockRegistryService,
    pub campusonline: MockCampusOnlineClient,
    pub pure: MockPureClient,
    pub moodle: MockMoodleClient,
    pub downloader: MockFileDownloader,
}

pub struct Harness {
    pub services: Services,
    pub repository: Repository,
    pub marc21: Arc<FakeRecordService>,
    pub lom: Arc<FakeRecordService>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            marc21: Arc::new(FakeRecordService::new()),
            lom: Arc::new(FakeRecordService::new()),
            registry: MockRegistryService::new(),
            campusonline: MockCampusOnlineClient::new(),
            pure: MockPureClient::new(),
            moodle: MockMoodleClient::new(),
            downloader: MockFileDownloader::new(),
        }
    }

    pub async fn build(self) -> Harness {
        let repository = Repository::new(memory_pool().await);
        let services = Services::new(
            repository.clone(),
            Collaborators {
                marc21: self.marc21.clone(),
                lom: self.lom.clone(),
                registry: Arc::new(self.registry),
                campusonline: Arc::new(self.campusonline),
                pure: Arc::new(self.pure),
                moodle: Arc::new(self.moodle),
                downloader: Arc::new(self.downloader),
            },
        );
        Harness {
            services,
            repository,
            marc21: self.marc21,
            lom: self.lom,
        }
    }
}

#[derive(Default)]
struct Store {
    next_id: u32,
    drafts: BTreeMap<String, Value>,
    records: BTreeMap<String, Value>,
    files: HashMap<String, Vec<PathBuf>>,
    calls: Vec<String>,
    fail_validation: bool,
    stale: bool,
}

impl Store {
    fn all(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.drafts.iter().chain(self.records.iter())
    }
}

/// Record service keeping drafts and published records in memory
#[derive(Default)]
pub struct FakeRecordService {
    store: Mutex<Store>,
}

impl FakeRecordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a published record
    pub fn insert_record(&self, id: &str, data: Value) {
        let mut store = self.store.lock().unwrap();
        store.records.insert(id.to_string(), with_links(id, data));
    }

    /// Seed a draft
    pub fn insert_draft(&self, id: &str, data: Value) {
        let mut store = self.store.lock().unwrap();
        store.drafts.insert(id.to_string(), with_links(id, data));
    }

    pub fn draft(&self, id: &str) -> Option<Value> {
        self.store.lock().unwrap().drafts.get(id).cloned()
    }

    pub fn record(&self, id: &str) -> Option<Value> {
        self.store.lock().unwrap().records.get(id).cloned()
    }

    pub fn files(&self, id: &str) -> Vec<PathBuf> {
        self.store.lock().unwrap().files.get(id).cloned().unwrap_or_default()
    }

    /// Method names in call order
    pub fn calls(&self) -> Vec<String> {
        self.store.lock().unwrap().calls.clone()
    }

    pub fn is_empty(&self) -> bool {
        let store = self.store.lock().unwrap();
        store.drafts.is_empty() && store.records.is_empty()
    }

    pub fn fail_validation(&self) {
        self.store.lock().unwrap().fail_validation = true;
    }

    pub fn fail_updates_as_stale(&self) {
        self.store.lock().unwrap().stale = true;
    }
}

fn with_links(id: &str, mut data: Value) -> Value {
    data["id"] = json!(id);
    data["links"] = json!({"self_html": format!("https://repo.test/records/{}", id)});
    data
}

/// `tag.subfields.code` for MARC records, a LOM identifier catalog otherwise
fn carries_identifier(data: &Value, value: &str, category: &str) -> bool {
    let parts: Vec<&str> = category.split('.').collect();
    if let [tag, "subfields", code] = parts.as_slice() {
        return data
            .pointer(&format!("/metadata/fields/{}", tag))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|field| field.pointer(&format!("/subfields/{}", code)))
            .filter_map(Value::as_array)
            .flatten()
            .any(|v| v == value);
    }

    data.pointer("/metadata/general/identifier")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|identifier| {
            identifier.get("catalog").and_then(Value::as_str) == Some(category)
                && identifier.pointer("/entry/langstring/#text").and_then(Value::as_str) == Some(value)
        })
}

fn registered_pid(data: &Value, pid_type: &str) -> Option<String> {
    let pid = data.get("pids")?.get(pid_type)?;
    pid.get("identifier")
        .or(Some(pid))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl RecordService for FakeRecordService {
    async fn create(
        &self,
        _: &Identity,
        data: Value,
        files: Vec<PathBuf>,
        publish: bool,
    ) -> AppResult<RecordItem> {
        let id = {
            let mut store = self.store.lock().unwrap();
            store.next_id += 1;
            let id = format!("rec-{}", store.next_id);
            store.calls.push("create".into());
            store.drafts.insert(id.clone(), with_links(&id, data));
            store.files.insert(id.clone(), files);
            id
        };

        if publish {
            return self.publish(&Identity::system(), &id).await;
        }
        let data = self.draft(&id).unwrap_or_default();
        Ok(RecordItem::new(id, data))
    }

    async fn edit(&self, _: &Identity, id: &str) -> AppResult<RecordItem> {
        let mut store = self.store.lock().unwrap();
        store.calls.push("edit".into());
        if let Some(draft) = store.drafts.get(id) {
            return Ok(RecordItem::new(id, draft.clone()));
        }
        let record = store
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        store.drafts.insert(id.to_string(), record.clone());
        Ok(RecordItem::new(id, record))
    }

    async fn read(&self, _: &Identity, id: &str) -> AppResult<Option<RecordItem>> {
        Ok(self.record(id).map(|data| RecordItem::new(id, data)))
    }

    async fn read_draft(&self, _: &Identity, id: &str) -> AppResult<Option<RecordItem>> {
        Ok(self.draft(id).map(|data| RecordItem::new(id, data)))
    }

    async fn update_draft(&self, _: &Identity, id: &str, data: Value) -> AppResult<RecordItem> {
        let mut store = self.store.lock().unwrap();
        store.calls.push("update_draft".into());
        if store.stale {
            return Err(AppError::StaleWrite(id.to_string()));
        }
        if !store.drafts.contains_key(id) {
            return Err(AppError::NotFound(id.to_string()));
        }
        let data = with_links(id, data);
        store.drafts.insert(id.to_string(), data.clone());
        Ok(RecordItem::new(id, data))
    }

    async fn publish(&self, identity: &Identity, id: &str) -> AppResult<RecordItem> {
        self.validate_draft(identity, id).await?;
        let mut store = self.store.lock().unwrap();
        store.calls.push("publish".into());
        let draft = store
            .drafts
            .remove(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        store.records.insert(id.to_string(), draft.clone());
        Ok(RecordItem::new(id, draft))
    }

    async fn validate_draft(&self, _: &Identity, id: &str) -> AppResult<()> {
        let store = self.store.lock().unwrap();
        if store.fail_validation {
            return Err(AppError::Validation {
                id: id.to_string(),
                message: "metadata.general.title: missing".into(),
            });
        }
        Ok(())
    }

    async fn delete_draft(&self, _: &Identity, id: &str) -> AppResult<()> {
        let mut store = self.store.lock().unwrap();
        store.calls.push("delete_draft".into());
        store.drafts.remove(id);
        Ok(())
    }

    async fn find_by_identifier(&self, value: &str, category: &str) -> AppResult<Option<RecordItem>> {
        let store = self.store.lock().unwrap();
        let found = store
            .all()
            .find(|(_, data)| carries_identifier(data, value, category))
            .map(|(id, data)| RecordItem::new(id.clone(), data.clone()));
        Ok(found)
    }

    async fn resolve_pid(&self, pid_type: &str, value: &str) -> AppResult<Option<String>> {
        let store = self.store.lock().unwrap();
        let found = store
            .all()
            .find(|(_, data)| registered_pid(data, pid_type).as_deref() == Some(value))
            .map(|(id, _)| id.clone());
        Ok(found)
    }
}

/// Campus thesis document; `locked` adds the 2023-03-03 to 2025-03-03 lock period
pub fn thesis_xml(cms_id: &str, volltext: &str, locked: bool) -> String {
    let lock = if locked {
        r#"<bas:attr key="SPVON">2023-03-03 00:00:00</bas:attr>
  <bas:attr key="SPBIS">2025-03-03 00:00:00</bas:attr>"#
    } else {
        ""
    };
    format!(
        r#"<bas:thesis xmlns:bas="http://www.campusonline.at/thesisservice/basetypes">
  <bas:attr key="ID">{cms_id}</bas:attr>
  <bas:attr key="TYPKB">MA</bas:attr>
  <bas:attr key="TYP">Masterarbeit</bas:attr>
  <bas:attr key="EJAHR">2024</bas:attr>
  <bas:attr key="OLANG">DE</bas:attr>
  <bas:attr key="VOLLTEXT">{volltext}</bas:attr>
  {lock}
  <bas:metaclass>
    <bas:name>AUTHOR</bas:name>
    <bas:metaobj>
      <bas:attr key="FN">Jane</bas:attr>
      <bas:attr key="LN">Doe</bas:attr>
    </bas:metaobj>
  </bas:metaclass>
  <bas:metaclass>
    <bas:name>TEXT</bas:name>
    <bas:metaobj>
      <bas:attr key="LANG">DE</bas:attr>
      <bas:attr key="TIT">Graphersetzung</bas:attr>
    </bas:metaobj>
  </bas:metaclass>
</bas:thesis>"#
    )
}
