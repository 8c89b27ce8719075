use anyhow::Result;

/// Everything in timekeep runs cooperatively on one thread, so the store never needs a lock.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
