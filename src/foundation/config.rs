use crate::foundation::error::{DrawError, DrawResult};

/// Environment variable overriding the prerender worker count.
pub const ENV_NUM_THREADS: &str = "DRAWTREE_NUM_THREADS";
/// Environment variable overriding the cache byte budget.
pub const ENV_CACHE_BUDGET: &str = "DRAWTREE_CACHE_BUDGET";
/// Environment variable overriding the minimum cache score.
pub const ENV_CACHE_SCORE_THRESHOLD: &str = "DRAWTREE_CACHE_SCORE_THRESHOLD";
/// Environment variable selecting the worker wait strategy (`spin`, `yield`, `block`).
pub const ENV_WORKER_WAIT: &str = "DRAWTREE_WORKER_WAIT";

/// Upper bound on the configurable prerender worker count.
pub const MAX_THREADS: i64 = 256;

/// Rendering quality ladder shared by blur and filter knobs.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Cheapest rendering.
    Worst,
    /// Reduced quality.
    Worse,
    /// Balanced.
    #[default]
    Normal,
    /// Increased quality.
    Better,
    /// Exact rendering.
    Best,
}

/// How a caller waits for a prerender batch to complete.
///
/// `Spin` and `Yield` keep the waiting thread on a core for the lowest latency. `Block`
/// sleeps on a condition variable until the last share of the batch is done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Busy-poll with a CPU pause hint.
    Spin,
    /// Busy-poll, yielding the time slice between polls.
    #[default]
    Yield,
    /// Sleep on a condition variable until the batch completes.
    Block,
}

impl WaitStrategy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "spin" => Some(Self::Spin),
            "yield" => Some(Self::Yield),
            "block" => Some(Self::Block),
            _ => None,
        }
    }
}

/// Knobs the drawing reads from its surroundings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// Preferred prerender worker count; `None` means hardware concurrency.
    pub num_threads: Option<i64>,
    /// Maximum bytes of per-item cache surfaces alive at once.
    pub cache_budget_bytes: usize,
    /// Items scoring below this never become cache candidates.
    pub cache_score_threshold: f64,
    /// How waiting for a prerender batch polls.
    pub worker_wait: WaitStrategy,
    /// Blur quality used in normal render mode.
    pub blur_quality: Quality,
    /// Filter quality used in normal render mode.
    pub filter_quality: Quality,
    /// Straight-alpha RGBA colour of outline-mode strokes.
    pub outline_color: [u8; 4],
    /// Opacity of the outline pass in outline-overlay mode.
    pub outline_overlay_opacity: f32,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            cache_budget_bytes: 64 * 1024 * 1024,
            cache_score_threshold: 50_000.0,
            worker_wait: WaitStrategy::default(),
            blur_quality: Quality::Best,
            filter_quality: Quality::Normal,
            outline_color: [0, 0, 0, 255],
            outline_overlay_opacity: 0.5,
        }
    }
}

impl DrawingConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> DrawResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| DrawError::config(format!("invalid drawing config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the drawing cannot honour.
    pub fn validate(&self) -> DrawResult<()> {
        if !self.cache_score_threshold.is_finite() {
            return Err(DrawError::config("cache_score_threshold must be finite"));
        }
        if !(0.0..=1.0).contains(&self.outline_overlay_opacity) {
            return Err(DrawError::config(
                "outline_overlay_opacity must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Source of configuration values, consulted lazily (on demand) by the drawing.
pub trait ConfigSource: Send + Sync {
    /// Preferred prerender worker count, `None` for hardware concurrency.
    fn thread_count(&self) -> Option<i64>;
    /// Cache byte budget, consulted on every eviction pass.
    fn cache_budget(&self) -> usize;
    /// Minimum cache score for candidates.
    fn cache_score_threshold(&self) -> f64;
    /// Worker wait strategy.
    fn worker_wait(&self) -> WaitStrategy;
}

impl ConfigSource for DrawingConfig {
    fn thread_count(&self) -> Option<i64> {
        self.num_threads
    }

    fn cache_budget(&self) -> usize {
        self.cache_budget_bytes
    }

    fn cache_score_threshold(&self) -> f64 {
        self.cache_score_threshold
    }

    fn worker_wait(&self) -> WaitStrategy {
        self.worker_wait
    }
}

/// Reads `DRAWTREE_*` environment variables on every query, falling back to a base config.
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    base: DrawingConfig,
}

impl EnvConfig {
    /// Use `base` for every value the environment does not override.
    pub fn new(base: DrawingConfig) -> Self {
        Self { base }
    }

    fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
        std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
    }
}

impl ConfigSource for EnvConfig {
    fn thread_count(&self) -> Option<i64> {
        Self::var::<i64>(ENV_NUM_THREADS).or(self.base.num_threads)
    }

    fn cache_budget(&self) -> usize {
        Self::var::<usize>(ENV_CACHE_BUDGET).unwrap_or(self.base.cache_budget_bytes)
    }

    fn cache_score_threshold(&self) -> f64 {
        Self::var::<f64>(ENV_CACHE_SCORE_THRESHOLD)
            .filter(|v| v.is_finite())
            .unwrap_or(self.base.cache_score_threshold)
    }

    fn worker_wait(&self) -> WaitStrategy {
        std::env::var(ENV_WORKER_WAIT)
            .ok()
            .and_then(|v| WaitStrategy::parse(&v))
            .unwrap_or(self.base.worker_wait)
    }
}

/// Effective prerender worker count: the preference clamped to `[1, 256]`, never above
/// `hardware`.
pub fn resolve_thread_count(preference: Option<i64>, hardware: usize) -> usize {
    let hardware = hardware.max(1);
    let pref = preference
        .unwrap_or(hardware as i64)
        .clamp(1, MAX_THREADS) as usize;
    pref.min(hardware)
}

/// Hardware concurrency as reported by the OS, at least 1.
pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
