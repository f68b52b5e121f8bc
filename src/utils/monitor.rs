#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct StreamStats {
    pub chunks: usize,
    pub time_to_first_chunk: Option<Duration>,
    pub elapsed_time: Duration,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

#[cfg(feature = "cli")]
#[derive(Debug, Default)]
struct Counters {
    chunks: usize,
    first_chunk_at: Option<Duration>,
    peak_memory_mb: u64,
}

/// 串流期間的資源與延遲監控
#[cfg(feature = "cli")]
pub struct StreamMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    counters: Mutex<Counters>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl StreamMonitor {
    pub fn new(enabled: bool) -> Self {
        let system = System::new_with_specifics(RefreshKind::nothing());
        let pid = sysinfo::get_current_pid().ok();

        Self {
            system: Mutex::new(system),
            pid,
            start_time: Instant::now(),
            counters: Mutex::new(Counters::default()),
            enabled,
        }
    }

    fn sample_memory_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map(|p| p.memory() / 1024 / 1024)
    }

    /// 每收到一個 chunk 呼叫一次
    pub fn record_chunk(&self) {
        if !self.enabled {
            return;
        }

        let first = {
            let Ok(mut counters) = self.counters.lock() else {
                return;
            };
            counters.chunks += 1;
            if counters.first_chunk_at.is_none() {
                counters.first_chunk_at = Some(self.start_time.elapsed());
                true
            } else {
                false
            }
        };

        if first {
            self.log_stats("first chunk");
        }
    }

    pub fn get_stats(&self) -> Option<StreamStats> {
        if !self.enabled {
            return None;
        }

        let memory_mb = self.sample_memory_mb().unwrap_or(0);
        let mut counters = self.counters.lock().ok()?;
        if memory_mb > counters.peak_memory_mb {
            counters.peak_memory_mb = memory_mb;
        }

        Some(StreamStats {
            chunks: counters.chunks,
            time_to_first_chunk: counters.first_chunk_at,
            elapsed_time: self.start_time.elapsed(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: counters.peak_memory_mb,
        })
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 {} - chunks: {}, memory: {}MB, peak: {}MB, time: {:?}",
                phase,
                stats.chunks,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 Final Stats - chunks: {}, first chunk after: {:?}, total time: {:?}, peak memory: {}MB",
                stats.chunks,
                stats.time_to_first_chunk,
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for StreamMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 環境的空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct StreamMonitor;

#[cfg(not(feature = "cli"))]
impl StreamMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn record_chunk(&self) {}

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
