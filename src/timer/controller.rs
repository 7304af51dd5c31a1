use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::{CountdownSnapshot, CountdownState, CountdownStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy)]
pub struct CountdownSettings {
    pub tick_interval: Duration,
    pub warning_threshold: Duration,
    /// Only every n-th tick is reported through `on_tick`.
    pub report_every_ticks: u32,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            warning_threshold: Duration::from_secs(30),
            report_every_ticks: 10,
        }
    }
}

const RUNNING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// One-shot latch shared by the tick task and the owning handle. Whichever
/// side moves it out of `RUNNING` first decides the countdown's fate.
#[derive(Debug)]
struct Latch(AtomicU8);

impl Latch {
    fn new() -> Self {
        Self(AtomicU8::new(RUNNING))
    }

    fn try_fire(&self) -> bool {
        self.transition(FIRED)
    }

    fn try_cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(RUNNING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn status(&self) -> CountdownStatus {
        match self.0.load(Ordering::Acquire) {
            RUNNING => CountdownStatus::Running,
            FIRED => CountdownStatus::Fired,
            _ => CountdownStatus::Cancelled,
        }
    }
}

/// A running countdown. Completion fires exactly once; cancelling (or
/// dropping the handle) before that guarantees it never fires.
#[derive(Debug)]
pub struct CountdownTimer {
    state: CountdownState,
    latch: Arc<Latch>,
    ticker: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// Starts counting down from `duration`.
    ///
    /// A zero duration completes synchronously inside this call and spawns
    /// nothing. Otherwise a tick task is spawned on the current tokio runtime.
    pub fn start<T, C>(
        duration: Duration,
        settings: CountdownSettings,
        on_tick: T,
        on_complete: C,
    ) -> Self
    where
        T: Fn(CountdownSnapshot) + Send + Sync + 'static,
        C: FnOnce() + Send + 'static,
    {
        let state = CountdownState::new(Instant::now(), duration, settings.warning_threshold);
        let latch = Arc::new(Latch::new());

        if duration.is_zero() {
            latch.try_fire();
            log_info!("countdown of zero length completed immediately");
            on_complete();
            return Self {
                state,
                latch,
                ticker: None,
            };
        }

        log_info!("countdown started for {}ms", duration.as_millis());
        let ticker = tokio::spawn(countdown_loop(
            state,
            settings,
            latch.clone(),
            on_tick,
            on_complete,
        ));

        Self {
            state,
            latch,
            ticker: Some(ticker),
        }
    }

    /// Returns `true` if this call stopped a still-running countdown.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.latch.try_cancel();
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        if cancelled {
            log_info!(
                "countdown cancelled with {}ms left",
                self.state.remaining_ms(Instant::now())
            );
        }
        cancelled
    }

    pub fn status(&self) -> CountdownStatus {
        self.latch.status()
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        self.state.snapshot(Instant::now(), self.latch.status())
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn countdown_loop<T, C>(
    state: CountdownState,
    settings: CountdownSettings,
    latch: Arc<Latch>,
    on_tick: T,
    on_complete: C,
) where
    T: Fn(CountdownSnapshot) + Send + Sync + 'static,
    C: FnOnce() + Send + 'static,
{
    let mut ticker = time::interval(settings.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let report_every = settings.report_every_ticks.max(1);
    let mut on_complete = Some(on_complete);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = time::sleep_until(state.deadline()) => {}
        }

        if latch.status() != CountdownStatus::Running {
            break;
        }

        let now = Instant::now();
        if state.is_expired(now) {
            if latch.try_fire() {
                log_info!("countdown expired");
                on_tick(state.snapshot(now, CountdownStatus::Fired));
                if let Some(complete) = on_complete.take() {
                    complete();
                }
            }
            break;
        }

        if ticks % report_every == 0 {
            let snapshot = state.snapshot(now, CountdownStatus::Running);
            log_debug!("countdown tick: {}ms left", snapshot.remaining_ms);
            on_tick(snapshot);
        }
        ticks = ticks.wrapping_add(1);
    }
}
