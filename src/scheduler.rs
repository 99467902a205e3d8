// =============================================================================
// Poll Scheduler — fixed-interval pipeline driver
// =============================================================================
//
// Runs `Pipeline::run_cycle` once per tick and publishes each result on a
// watch channel.  Consumers (the HTTP state sink, tests) only ever see the
// latest cycle; a slow consumer skips stale cycles instead of queueing them.
//
// Shutdown is a `watch::Receiver<bool>`.  It is observed both while waiting
// for the next tick and while a cycle is in flight, so Ctrl-C never waits
// out a stalled upstream request.  A dropped sender counts as shutdown.
//
// Ticks missed during a long cycle are delayed, not burst.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::market_data::MarketFeed;
use crate::pipeline::{CycleOutput, Pipeline};

/// Publishing side of the cycle channel.  `None` until the first cycle.
pub type CyclePublisher = watch::Sender<Option<Arc<CycleOutput>>>;
pub type CycleReceiver = watch::Receiver<Option<Arc<CycleOutput>>>;

pub fn cycle_channel() -> (CyclePublisher, CycleReceiver) {
    watch::channel(None)
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Drive the pipeline until shutdown.  Returns the number of cycles
/// published.
pub async fn run_poll_loop<F: MarketFeed>(
    pipeline: Pipeline<F>,
    period: Duration,
    publisher: CyclePublisher,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        pair = %pipeline.params().pair,
        mode = %pipeline.params().mode,
        interval_secs = period.as_secs(),
        "poll loop started"
    );

    let mut published: u64 = 0;
    let mut cycle: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        cycle += 1;
        let output = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                debug!(cycle, "shutdown during cycle, result discarded");
                break;
            }
            output = pipeline.run_cycle(cycle) => output,
        };

        publisher.send_replace(Some(Arc::new(output)));
        published += 1;
    }

    info!(cycles = published, "poll loop stopped");
    published
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{Candle, FetchWarnings, TickerRow, Trade};
    use crate::pipeline::tests::{params, StubFeed};
    use crate::signals::TradeSignal;
    use crate::types::TrackerMode;

    /// Feed whose trade request never completes.
    struct StalledFeed;

    impl MarketFeed for StalledFeed {
        async fn trades(&self, _pair: &str, _limit: u32, _w: &mut FetchWarnings) -> Vec<Trade> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Vec::new()
        }

        async fn candles(&self, _p: &str, _i: &str, _l: u32, _w: &mut FetchWarnings) -> Vec<Candle> {
            Vec::new()
        }

        async fn ticker(&self, _w: &mut FetchWarnings) -> Vec<TickerRow> {
            Vec::new()
        }

        async fn trade_pairs(&self, _w: &mut FetchWarnings) -> Vec<String> {
            Vec::new()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_each_cycle_until_shutdown() {
        let pipeline = Pipeline::new(Arc::new(StubFeed::default()), params(TrackerMode::Tracker));
        let (publisher, mut rx) = cycle_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run_poll_loop(pipeline, Duration::from_secs(10), publisher, stop_rx));

        rx.changed().await.unwrap();
        let first = rx.borrow_and_update().clone().unwrap();
        assert_eq!(first.snapshot.cycle, 1);

        rx.changed().await.unwrap();
        let second = rx.borrow_and_update().clone().unwrap();
        assert_eq!(second.snapshot.cycle, 2);

        stop_tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_first_tick_runs_nothing() {
        let pipeline = Pipeline::new(Arc::new(StubFeed::default()), params(TrackerMode::Tracker));
        let (publisher, rx) = cycle_channel();
        let (_stop_tx, stop_rx) = watch::channel(true);

        let published = run_poll_loop(pipeline, Duration::from_secs(5), publisher, stop_rx).await;
        assert_eq!(published, 0);
        assert!(rx.borrow().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_feed_keeps_loop_alive() {
        let feed = Arc::new(StubFeed {
            fail: true,
            ..Default::default()
        });
        let pipeline = Pipeline::new(feed, params(TrackerMode::Scanner));
        let (publisher, mut rx) = cycle_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run_poll_loop(pipeline, Duration::from_secs(5), publisher, stop_rx));

        for expected in 1..=3u64 {
            rx.changed().await.unwrap();
            let out = rx.borrow_and_update().clone().unwrap();
            assert_eq!(out.snapshot.cycle, expected);
            assert_eq!(out.snapshot.signal.signal, TradeSignal::NoActivity);
            assert!(!out.snapshot.warnings.is_empty());
        }

        stop_tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_stalled_cycle() {
        let pipeline = Pipeline::new(Arc::new(StalledFeed), params(TrackerMode::Tracker));
        let (publisher, rx) = cycle_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run_poll_loop(pipeline, Duration::from_secs(5), publisher, stop_rx));

        // Let the first cycle start and block on the stalled request.
        tokio::time::sleep(Duration::from_secs(30)).await;
        stop_tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), 0);
        assert!(rx.borrow().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_shutdown_sender_stops_loop() {
        let pipeline = Pipeline::new(Arc::new(StubFeed::default()), params(TrackerMode::Tracker));
        let (publisher, mut rx) = cycle_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run_poll_loop(pipeline, Duration::from_secs(5), publisher, stop_rx));
        rx.changed().await.unwrap();
        drop(stop_tx);

        assert_eq!(handle.await.unwrap(), 1);
    }
}
