//! Render loop driver
//!
//! The driver holds no audio state: each tick asks the engine to advance its
//! graph by one quantum. Cadence comes from an injected [`FrameClock`] so tests
//! can run hundreds of ticks without real-time waits.

use crate::engine::SoundEngine;
use crate::error::Result;
use crate::lifecycle::EngineHandle;
use cwae_common::events::HostEvent;
use std::future::Future;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Source of render cadence
pub trait FrameClock {
    /// Resolves when the next frame is due
    fn next_frame(&mut self) -> impl Future<Output = ()> + Send;
}

/// Fixed-period clock backed by a tokio interval
///
/// The first frame is due one period after creation. Late frames are delayed
/// rather than bunched up.
pub struct IntervalClock {
    interval: Interval,
}

impl IntervalClock {
    /// Must be called from within a tokio runtime
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl FrameClock for IntervalClock {
    async fn next_frame(&mut self) {
        self.interval.tick().await;
    }
}

/// Clock that never waits
#[derive(Debug, Default)]
pub struct ImmediateClock {
    frames: u64,
}

impl ImmediateClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames handed out so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameClock for ImmediateClock {
    async fn next_frame(&mut self) {
        self.frames += 1;
        tokio::task::yield_now().await;
    }
}

/// Outcome of a render loop run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub ticks: u64,
    /// True when the shutdown future stopped the loop early
    pub interrupted: bool,
}

/// Drives `tick()` until a frame limit or shutdown
#[derive(Debug, Clone, Copy)]
pub struct RenderLoop {
    frame_limit: u64,
}

impl RenderLoop {
    pub fn new(frame_limit: u64) -> Self {
        Self { frame_limit }
    }

    pub fn frame_limit(&self) -> u64 {
        self.frame_limit
    }

    /// Tick `handle` once per frame of `clock`
    ///
    /// Stops after `frame_limit` ticks, when `shutdown` resolves, or on the
    /// first tick error (which is returned).
    pub async fn run<E, C, S>(
        &self,
        handle: &mut EngineHandle<E>,
        clock: &mut C,
        shutdown: S,
    ) -> Result<RenderSummary>
    where
        E: SoundEngine,
        C: FrameClock,
        S: Future<Output = ()>,
    {
        handle.ensure_ready()?;
        info!("Render loop starting ({} frames)", self.frame_limit);

        tokio::pin!(shutdown);
        let mut summary = RenderSummary {
            ticks: 0,
            interrupted: false,
        };

        while summary.ticks < self.frame_limit {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Render loop interrupted after {} ticks", summary.ticks);
                    summary.interrupted = true;
                    break;
                }
                _ = clock.next_frame() => {}
            }

            handle.tick()?;
            summary.ticks += 1;
        }

        debug!("Render loop finished: {:?}", summary);
        handle.broadcast_event(HostEvent::RenderLoopFinished {
            ticks: summary.ticks,
            interrupted: summary.interrupted,
            timestamp: chrono::Utc::now(),
        });
        Ok(summary)
    }
}

impl<E: SoundEngine> EngineHandle<E> {
    /// Advance the engine by one render quantum
    pub fn tick(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.engine.render_audio()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;
    use crate::error::Error;
    use cwae_common::HostConfig;

    fn ready_handle() -> EngineHandle<SimulatedEngine> {
        let mut handle = EngineHandle::new(SimulatedEngine::new(), HostConfig::default());
        handle.initialize().unwrap();
        handle
    }

    #[tokio::test]
    async fn test_runs_to_frame_limit() {
        let mut handle = ready_handle();
        let mut clock = ImmediateClock::new();

        let summary = RenderLoop::new(300)
            .run(&mut handle, &mut clock, std::future::pending())
            .await
            .unwrap();

        assert_eq!(summary, RenderSummary { ticks: 300, interrupted: false });
        assert_eq!(clock.frames(), 300);
        assert_eq!(handle.engine().stats().renders, 300);
        handle.terminate().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let mut handle = ready_handle();
        let mut clock = ImmediateClock::new();

        let summary = RenderLoop::new(1_000)
            .run(&mut handle, &mut clock, std::future::ready(()))
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.ticks, 0);
        assert_eq!(handle.engine().stats().renders, 0);
    }

    #[tokio::test]
    async fn test_tick_requires_initialize() {
        let mut handle = EngineHandle::new(SimulatedEngine::new(), HostConfig::default());
        assert!(matches!(handle.tick(), Err(Error::NotInitialized)));

        let mut clock = ImmediateClock::new();
        let result = RenderLoop::new(3)
            .run(&mut handle, &mut clock, std::future::pending())
            .await;
        assert!(matches!(result, Err(Error::NotInitialized)));
        assert_eq!(clock.frames(), 0);
    }

    #[tokio::test]
    async fn test_tick_error_ends_run_without_summary() {
        let mut handle = EngineHandle::new(
            SimulatedEngine::new().with_render_failure_after(3),
            HostConfig::default(),
        );
        handle.initialize().unwrap();
        let mut rx = handle.subscribe_events();
        let mut clock = ImmediateClock::new();

        let result = RenderLoop::new(10)
            .run(&mut handle, &mut clock, std::future::pending())
            .await;

        assert!(matches!(result, Err(Error::Engine(_))));
        assert_eq!(handle.engine().stats().renders, 3);
        assert!(rx.try_recv().is_err());
        handle.terminate().unwrap();
    }

    #[tokio::test]
    async fn test_interval_clock_paces_frames() {
        let mut clock = IntervalClock::new(Duration::from_millis(5));
        assert_eq!(clock.period(), Duration::from_millis(5));

        let start = Instant::now();
        for _ in 0..3 {
            clock.next_frame().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
