pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short id used to tie together the log lines of one operation.
pub fn new_correlation_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
