use shared::metrics_defs::{MetricDef, MetricType};

pub const CACHE_HIT: MetricDef = MetricDef {
    name: "gateway.cache.hit",
    metric_type: MetricType::Counter,
    description: "Cached response found and decoded. Tagged by backend.",
};

pub const CACHE_MISS: MetricDef = MetricDef {
    name: "gateway.cache.miss",
    metric_type: MetricType::Counter,
    description: "No cached response for the key. Tagged by backend.",
};

pub const CACHE_ERROR: MetricDef = MetricDef {
    name: "gateway.cache.error",
    metric_type: MetricType::Counter,
    description: "Cache operation failed and was treated as a miss. Tagged by backend and operation.",
};

pub const UPSTREAM_REQUEST_DURATION: MetricDef = MetricDef {
    name: "gateway.upstream.request.duration",
    metric_type: MetricType::Histogram,
    description: "Duration of requests to the procurement API in seconds. Tagged by outcome.",
};

pub const STATS_FALLBACK: MetricDef = MetricDef {
    name: "gateway.stats.fallback",
    metric_type: MetricType::Counter,
    description: "Placeholder statistics served because the upstream failed. Tagged by category.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    CACHE_HIT,
    CACHE_MISS,
    CACHE_ERROR,
    UPSTREAM_REQUEST_DURATION,
    STATS_FALLBACK,
];
