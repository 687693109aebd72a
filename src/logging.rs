/// Install the global `tracing` subscriber.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}
