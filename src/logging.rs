//! Tracing setup for the binary and the tests.
//!
//! [`DispatchBuilder`] is used to construct a stack of tracing `Layer`s. At the
//! top is an [`EnvFilter`] layer that filters events using the `RUST_LOG`
//! environment variable, unless fixed directives are given with
//! [`DispatchBuilder::filter`]. For example, `RUST_LOG="typed_z3=trace" cargo test`
//! will run tests with all events of this crate, including every frame push
//! and pop. More information can be found in the [`EnvFilter`] documentation.
//!
//! A logging layer is supported in tests and to standard error, either as
//! human-readable text or as JSON.
//!
//! Finally, the [`TimingLayer`] can be enabled in the [`DispatchBuilder`]. It
//! sums up the active time of spans by name, e.g. the `solver_check` span
//! around every [`crate::Solver::check`]. Totals can be retrieved via
//! [`TimingLayer::read_active`].
//!
//! [`EnvFilter`]: https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Once,
    },
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tracing::{Dispatch, Subscriber};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
    EnvFilter,
};

static INIT: Once = Once::new();

/// Initialize the global tracing dispatcher with the one built by the provided
/// builder. Only the first call has an effect.
pub fn init_tracing(builder: DispatchBuilder) {
    INIT.call_once(|| {
        if let Err(err) = tracing::dispatcher::set_global_default(builder.finish()) {
            eprintln!("could not install tracing subscriber: {}", err);
        }
    });
}

/// A builder to construct the stack of layers we use to process tracing events
/// and spans.
#[derive(Debug, Default)]
pub struct DispatchBuilder {
    timing: bool,
    json: bool,
    filter: Option<String>,
}

impl DispatchBuilder {
    /// Enable or disable timing.
    pub fn timing(mut self, timing: bool) -> Self {
        self.timing = timing;
        self
    }

    /// Enable or disable json output.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Use the given filter directives, e.g. `"typed_z3=debug"`, instead of
    /// reading them from `RUST_LOG`.
    pub fn filter(mut self, directives: &str) -> Self {
        self.filter = Some(directives.to_owned());
        self
    }

    /// Create a new `Dispatch`.
    pub fn finish(self) -> Dispatch {
        // The layer combinations are statically typed, so every combination of
        // options is spelled out. Tests need `with_test_writer()` so that the
        // output is captured per test.

        macro_rules! build_logging_layer {
            () => {{
                let logging_layer;
                cfg_if::cfg_if! {
                    if #[cfg(not(test))] {
                        logging_layer = tracing_subscriber::fmt::layer()
                            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
                            .with_writer(std::io::stderr);
                    } else {
                        use tracing_subscriber::fmt::format::*;
                        logging_layer = tracing_subscriber::fmt::layer()
                            .with_span_events(FmtSpan::CLOSE)
                            .with_test_writer();
                    }
                }
                let logging_layer2;
                cfg_if::cfg_if! {
                    if #[cfg(not(feature = "log-print-timeless"))] {
                        logging_layer2 = logging_layer;
                    } else {
                        logging_layer2 = logging_layer.without_time();
                    }
                }
                logging_layer2
            }};
        }

        let filter = match &self.filter {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::from_default_env(),
        };

        match (self.timing, self.json) {
            (true, true) => Dispatch::new(filter.with_subscriber(
                build_logging_layer!().json().with_subscriber(
                    TimingLayer::new().with_subscriber(tracing_subscriber::registry()),
                ),
            )),
            (true, false) => Dispatch::new(filter.with_subscriber(
                build_logging_layer!().with_subscriber(
                    TimingLayer::new().with_subscriber(tracing_subscriber::registry()),
                ),
            )),
            (false, true) => Dispatch::new(
                filter.with_subscriber(
                    build_logging_layer!()
                        .json()
                        .with_subscriber(tracing_subscriber::registry()),
                ),
            ),
            (false, false) => Dispatch::new(filter.with_subscriber(
                build_logging_layer!().with_subscriber(tracing_subscriber::registry()),
            )),
        }
    }
}

/// A tracing `Layer` that sums up the active time of spans by span name.
pub struct TimingLayer {
    /// Accumulated active time and start of the current activation per open
    /// span.
    span_times: DashMap<tracing::span::Id, (Duration, Option<Instant>)>,
    totals: DashMap<&'static str, AtomicDuration>,
}

impl TimingLayer {
    fn new() -> Self {
        TimingLayer {
            span_times: DashMap::new(),
            totals: DashMap::new(),
        }
    }

    /// Totals of the [`TimingLayer`] of the current dispatcher, if it has one.
    pub fn read_active() -> Option<HashMap<&'static str, Duration>> {
        tracing::dispatcher::get_default(|dispatch: &Dispatch| {
            let timing_layer: &TimingLayer = dispatch.downcast_ref()?;
            Some(timing_layer.totals())
        })
    }

    fn totals(&self) -> HashMap<&'static str, Duration> {
        self.totals
            .iter()
            .map(|entry| (*entry.key(), entry.value().total()))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for TimingLayer
where
    S: for<'lookup> LookupSpan<'lookup>,
{
    fn on_enter(&self, id: &tracing::span::Id, _ctx: Context<'_, S>) {
        let mut entry = self
            .span_times
            .entry(id.clone())
            .or_insert_with(|| (Duration::ZERO, None));
        entry.1 = Some(Instant::now());
    }

    fn on_exit(&self, id: &tracing::span::Id, _ctx: Context<'_, S>) {
        let end = Instant::now();
        if let Some(mut span_time) = self.span_times.get_mut(id) {
            if let Some(start) = span_time.1.take() {
                span_time.0 += end.duration_since(start);
            }
        }
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        let Some((_, (span_duration, _))) = self.span_times.remove(&id) else {
            return;
        };
        let Some(metadata) = ctx.metadata(&id) else {
            return;
        };
        self.totals
            .entry(metadata.name())
            .or_insert_with(AtomicDuration::new)
            .record(span_duration);
    }
}

struct AtomicDuration {
    nanos: AtomicU64,
}

impl AtomicDuration {
    fn new() -> Self {
        AtomicDuration {
            nanos: AtomicU64::new(0),
        }
    }

    /// Record a single duration.
    fn record(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Retrieve the total duration.
    fn total(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}
