use cutoff_finder::admissions::{
    AdmissionYear, BaseCategory, EligibilityEngine, GenderPool, InstituteScope, LoadError,
    RecordStore,
};
use cutoff_finder::config::{AppConfig, DataConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loaded cutoff tables plus the engine that queries them.
///
/// Handlers take a snapshot of the current store per request; a reload swaps the whole
/// store, so in-flight queries keep reading the tables they started with.
#[derive(Clone)]
pub(crate) struct CutoffState {
    store: Arc<RwLock<Arc<RecordStore>>>,
    engine: Arc<EligibilityEngine>,
    data: Arc<DataConfig>,
}

impl CutoffState {
    pub(crate) fn new(store: RecordStore, engine: EligibilityEngine, data: DataConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(Arc::new(store))),
            engine: Arc::new(engine),
            data: Arc::new(data),
        }
    }

    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, LoadError> {
        let store = load_store(&config.data.dir, &config.data.years)?;
        let engine = EligibilityEngine::new(config.views.catalog(), config.data.years.clone());
        Ok(Self::new(store, engine, config.data.clone()))
    }

    pub(crate) fn snapshot(&self) -> Arc<RecordStore> {
        let guard = self.store.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub(crate) fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    /// Re-reads every table from disk and swaps it in only if loading succeeds.
    pub(crate) fn reload(&self) -> Result<Arc<RecordStore>, LoadError> {
        let fresh = Arc::new(load_store(&self.data.dir, &self.data.years)?);
        let mut guard = self.store.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&fresh);
        Ok(fresh)
    }
}

pub(crate) fn load_store(dir: &Path, years: &[AdmissionYear]) -> Result<RecordStore, LoadError> {
    let store = RecordStore::load_dir(dir, years)?;
    info!(
        dir = %dir.display(),
        datasets = store.datasets().len(),
        "cutoff tables loaded"
    );
    Ok(store)
}

pub(crate) fn parse_category(raw: &str) -> Result<BaseCategory, String> {
    BaseCategory::parse(raw)
        .ok_or_else(|| format!("unknown category '{raw}' (expected OPEN, EWS, OBC-NCL, SC or ST)"))
}

pub(crate) fn parse_gender(raw: &str) -> Result<GenderPool, String> {
    GenderPool::parse(raw)
        .ok_or_else(|| format!("unknown gender pool '{raw}' (expected Gender-Neutral or Female-only)"))
}

pub(crate) fn parse_scope(raw: &str) -> Result<InstituteScope, String> {
    InstituteScope::parse(raw).ok_or_else(|| {
        format!("unknown institute scope '{raw}' (expected iit, nit, iiit, gfti or all-except-iit)")
    })
}
