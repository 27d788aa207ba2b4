use shared::metrics_defs::{MetricDef, MetricType};

pub const POLL_CYCLES: MetricDef = MetricDef {
    name: "poll.cycles",
    metric_type: MetricType::Counter,
    description: "Receive polls issued against the queue",
};

pub const POLL_EMPTY: MetricDef = MetricDef {
    name: "poll.empty",
    metric_type: MetricType::Counter,
    description: "Polls that returned no messages",
};

pub const RECEIVE_ERRORS: MetricDef = MetricDef {
    name: "queue.receive_errors",
    metric_type: MetricType::Counter,
    description: "Transient receive failures; the loop sleeps and retries",
};

pub const DELETE_FAILURES: MetricDef = MetricDef {
    name: "queue.delete_failures",
    metric_type: MetricType::Counter,
    description: "Messages archived but not removed from the queue; each will be redelivered",
};

pub const MESSAGES_ARCHIVED: MetricDef = MetricDef {
    name: "messages.archived",
    metric_type: MetricType::Counter,
    description: "Messages durably written to the object store",
};

pub const MESSAGES_FAILED: MetricDef = MetricDef {
    name: "messages.failed",
    metric_type: MetricType::Counter,
    description: "Messages whose archive write failed; each stays queued",
};

pub const DISPATCH_DURATION: MetricDef = MetricDef {
    name: "dispatch.duration",
    metric_type: MetricType::Histogram,
    description: "Wall time in seconds to process one full batch",
};

pub const ALL_METRICS: &[MetricDef] = &[
    POLL_CYCLES,
    POLL_EMPTY,
    RECEIVE_ERRORS,
    DELETE_FAILURES,
    MESSAGES_ARCHIVED,
    MESSAGES_FAILED,
    DISPATCH_DURATION,
];
