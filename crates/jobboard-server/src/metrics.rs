use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Histogram, HistogramVec, IntCounterVec, IntGaugeVec,
};

pub static OPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("jobboard_ops_total", "Requests by operation", &["op"]).unwrap()
});

pub static LISTING_DURATION_SEC: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "listing_duration_seconds",
        "Job listing latency (translate, count, fetch)",
        &["style"]
    )
    .unwrap()
});

pub static LISTING_PAGE_SIZE: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "listing_page_size",
        "Records returned per listing page",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .unwrap()
});

pub static STORAGE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("storage_errors_total", "Storage failures by operation", &["op"])
        .unwrap()
});

pub static COLLECTION_RECORDS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!("collection_records", "Records held per collection", &["collection"])
        .unwrap()
});
