//! Local store of the user's entry models and their cached guides.
//!
//! State lives in memory and is written through a [`PersistenceAdapter`] after
//! every mutation, one JSON document per storage key.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::PathBuf,
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;

use super::model_builder::{EntryModelDraft, ModelGuide, VideoSource};

pub const MODELS_KEY: &str = "trading-coach.entry-models";
pub const GUIDES_KEY: &str = "trading-coach.model-guides";

const ID_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry model not found: {0}")]
    NotFound(String),
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Key/value persistence for the store.
pub trait PersistenceAdapter {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Keeps everything in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, e.g. to simulate previously stored state.
    pub fn with_entry(self, key: &str, value: impl Into<String>) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.into());
        self
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per storage key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileAdapter {
    dir: PathBuf,
}

impl FileAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PersistenceAdapter for FileAdapter {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct EntryModel {
    pub id: String,
    #[serde(flatten)]
    pub draft: EntryModelDraft,
    #[serde(default)]
    pub source: Option<VideoSource>,
    pub created_at: DateTime<Utc>,
}

/// A built-in starting point for a new model.
#[derive(Debug, Clone)]
pub struct EntryModelTemplate {
    pub id: &'static str,
    pub draft: EntryModelDraft,
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn templates() -> Vec<EntryModelTemplate> {
    vec![
        EntryModelTemplate {
            id: "breakout-retest",
            draft: EntryModelDraft {
                name: "Breakout and retest".into(),
                style: "Day trading".into(),
                timeframe: "M15".into(),
                instrument: "EURUSD".into(),
                session: "London".into(),
                risk_percent: 1.0,
                description: "Trade the first retest of a level broken with momentum.".into(),
                rules: [
                    "Mark the Asian session range",
                    "Wait for a candle to close beyond the range",
                    "Enter on the first retest of the broken level",
                    "Stop beyond the retest wick, target 2R",
                ]
                .join("\n"),
                checklist: lines(&[
                    "Range marked before London open",
                    "Breakout candle closed with momentum",
                    "Retest holds the level",
                ]),
                tags: lines(&["breakout", "template"]),
            },
        },
        EntryModelTemplate {
            id: "trend-pullback",
            draft: EntryModelDraft {
                name: "Trend pullback".into(),
                style: "Swing".into(),
                timeframe: "H4".into(),
                instrument: "GBPUSD".into(),
                session: "Any".into(),
                risk_percent: 1.0,
                description: "Join an established trend after a pullback into value.".into(),
                rules: [
                    "Daily chart makes higher highs and higher lows",
                    "Price pulls back to the 50% retracement or prior structure",
                    "Enter on a bullish engulfing close",
                    "Stop below the pullback low, target the previous high",
                ]
                .join("\n"),
                checklist: lines(&[
                    "Daily trend confirmed",
                    "Pullback reached value area",
                    "Confirmation candle closed",
                ]),
                tags: lines(&["trend", "template"]),
            },
        },
        EntryModelTemplate {
            id: "range-reversal",
            draft: EntryModelDraft {
                name: "Range reversal".into(),
                style: "Scalping".into(),
                timeframe: "M5".into(),
                instrument: "XAUUSD".into(),
                session: "New York".into(),
                risk_percent: 0.5,
                description: "Fade the edges of a well-defined intraday range.".into(),
                rules: [
                    "Range has at least two touches on each side",
                    "Price sweeps a range edge and closes back inside",
                    "Enter on the close back inside the range",
                    "Stop beyond the sweep, target the range midpoint",
                ]
                .join("\n"),
                checklist: lines(&[
                    "Two touches on each side",
                    "Sweep and close back inside",
                    "No high-impact news within 30 minutes",
                ]),
                tags: lines(&["range", "template"]),
            },
        },
    ]
}

/// `<unix millis in base 36>-<6 random lowercase alphanumerics>`
pub fn generate_id(now: DateTime<Utc>) -> String {
    let mut millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let mut digits = Vec::new();
    loop {
        digits.push(char::from(BASE36[(millis % 36) as usize]));
        millis /= 36;
        if millis == 0 {
            break;
        }
    }
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    format!("{}-{suffix}", digits.iter().rev().collect::<String>())
}

fn read_key<A, T>(adapter: &A, key: &str) -> T
where
    A: PersistenceAdapter,
    T: DeserializeOwned + Default,
{
    match adapter.load(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "Discarding corrupt stored state");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "Could not read stored state");
            T::default()
        }
    }
}

/// The user's entry models, newest first, plus guides cached by model id.
#[derive(Debug)]
pub struct EntryModelStore<A: PersistenceAdapter> {
    adapter: A,
    models: Vec<EntryModel>,
    guides: BTreeMap<String, ModelGuide>,
}

impl<A: PersistenceAdapter> EntryModelStore<A> {
    /// Read stored state. Missing or unreadable state starts an empty store.
    pub fn load(adapter: A) -> Self {
        let models: Vec<EntryModel> = read_key(&adapter, MODELS_KEY);
        let guides = read_key(&adapter, GUIDES_KEY);
        debug!(model_count = models.len(), "Loaded entry models");
        Self {
            adapter,
            models,
            guides,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn list(&self) -> &[EntryModel] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&EntryModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn create_from_template(&mut self, template_id: &str) -> Result<&EntryModel, StoreError> {
        let template = templates()
            .into_iter()
            .find(|t| t.id == template_id)
            .ok_or_else(|| StoreError::UnknownTemplate(template_id.to_string()))?;
        self.insert(template.draft, None)
    }

    /// Add a model produced by the suggestion or video endpoints.
    pub fn add_generated(
        &mut self,
        draft: EntryModelDraft,
        source: Option<VideoSource>,
    ) -> Result<&EntryModel, StoreError> {
        self.insert(draft.normalized(), source)
    }

    pub fn duplicate(&mut self, id: &str) -> Result<&EntryModel, StoreError> {
        let original = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut draft = original.draft.clone();
        draft.name = format!("{} (copy)", draft.name);
        let source = original.source.clone();
        self.insert(draft, source)
    }

    pub fn update<F>(&mut self, id: &str, patch: F) -> Result<&EntryModel, StoreError>
    where
        F: FnOnce(&mut EntryModelDraft),
    {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch(&mut self.models[index].draft);
        self.persist_models()?;
        Ok(&self.models[index])
    }

    /// Remove a model and its cached guide. Returns false if the id is unknown.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.models.remove(index);
        self.persist_models()?;
        if self.guides.remove(id).is_some() {
            self.persist_guides()?;
        }
        Ok(true)
    }

    pub fn guide(&self, id: &str) -> Option<&ModelGuide> {
        self.guides.get(id)
    }

    pub fn save_guide(&mut self, id: &str, guide: ModelGuide) -> Result<(), StoreError> {
        if self.position(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.guides.insert(id.to_string(), guide);
        self.persist_guides()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.models.iter().position(|m| m.id == id)
    }

    fn insert(
        &mut self,
        draft: EntryModelDraft,
        source: Option<VideoSource>,
    ) -> Result<&EntryModel, StoreError> {
        let now = Utc::now();
        let model = EntryModel {
            id: generate_id(now),
            draft,
            source,
            created_at: now,
        };
        debug!(id = %model.id, name = %model.draft.name, "Adding entry model");
        self.models.insert(0, model);
        self.persist_models()?;
        Ok(&self.models[0])
    }

    fn persist_models(&self) -> Result<(), StoreError> {
        self.adapter
            .save(MODELS_KEY, &serde_json::to_string(&self.models)?)
    }

    fn persist_guides(&self) -> Result<(), StoreError> {
        self.adapter
            .save(GUIDES_KEY, &serde_json::to_string(&self.guides)?)
    }
}
