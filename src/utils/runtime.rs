use anyhow::Result;

/// The whole run is sequential, so a current thread runtime is all that's needed.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
