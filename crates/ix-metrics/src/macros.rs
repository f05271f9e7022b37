/// Registers a process-wide counter against [`crate::REGISTRY`] and stores it
/// in a `static`.
#[macro_export]
macro_rules! register_counter {
    ($name:ident, $help:literal) => {
        static $name: ::std::sync::LazyLock<::prometheus::IntCounter> =
            ::std::sync::LazyLock::new(|| {
                let counter = ::prometheus::IntCounter::new(stringify!($name), $help)
                    .expect("metric initialization failed");
                $crate::REGISTRY
                    .register(Box::new(counter.clone()))
                    .expect("metric registration failed");
                counter
            });
    };
}

/// Registers a labeled counter vector.
#[macro_export]
macro_rules! register_counter_vec {
    ($name:ident, $help:literal, $labels:expr) => {
        static $name: ::std::sync::LazyLock<::prometheus::IntCounterVec> =
            ::std::sync::LazyLock::new(|| {
                let opts = ::prometheus::Opts::new(stringify!($name), $help);
                let counter =
                    ::prometheus::IntCounterVec::new(opts, $labels).expect("metric init failed");
                $crate::REGISTRY
                    .register(Box::new(counter.clone()))
                    .expect("metric registration failed");
                counter
            });
    };
}

/// Registers a histogram with default buckets.
#[macro_export]
macro_rules! register_histogram {
    ($name:ident, $help:literal) => {
        static $name: ::std::sync::LazyLock<::prometheus::Histogram> =
            ::std::sync::LazyLock::new(|| {
                let opts = ::prometheus::HistogramOpts::new(stringify!($name), $help);
                let histogram = ::prometheus::Histogram::with_opts(opts)
                    .expect("metric initialization failed");
                $crate::REGISTRY
                    .register(Box::new(histogram.clone()))
                    .expect("metric registration failed");
                histogram
            });
    };
}

/// Registers a gauge.
#[macro_export]
macro_rules! register_gauge {
    ($name:ident, $help:literal) => {
        static $name: ::std::sync::LazyLock<::prometheus::IntGauge> =
            ::std::sync::LazyLock::new(|| {
                let gauge = ::prometheus::IntGauge::new(stringify!($name), $help)
                    .expect("metric initialization failed");
                $crate::REGISTRY
                    .register(Box::new(gauge.clone()))
                    .expect("metric registration failed");
                gauge
            });
    };
}
