use travel_assist::{ApiStatus, QueryHistory, QueryRecord};

pub fn footer(record: &QueryRecord) -> String {
    match record.processing_time {
        Some(seconds) => format!("[{} | {:.2}s | id {}]", record.timestamp, seconds, record.id),
        None => format!("[{} | id {}]", record.timestamp, record.id),
    }
}

pub fn history(page: &QueryHistory) -> String {
    if page.queries.is_empty() {
        return "No questions yet.\n".to_string();
    }
    let mut out = format!(
        "Showing {} of {} questions\n",
        page.queries.len(),
        page.total_count
    );
    for record in &page.queries {
        out.push('\n');
        out.push_str(&format!("Q: {}\n", record.question));
        out.push_str(&format!("A: {}\n", record.answer.trim_end()));
        out.push_str(&footer(record));
        out.push('\n');
    }
    out
}

pub fn api_status(status: ApiStatus) -> &'static str {
    match status {
        ApiStatus::Online => "API is online and ready",
        ApiStatus::Offline => "API is offline. Please ensure the backend server is running",
    }
}
