use crate::error;
use std::{panic, process, thread};

/// Installs a panic hook that logs the panic, then exits the process with code 1
pub fn configure_panic() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let thread = thread::current();
        let location = info.location().map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())).unwrap_or_else(|| "<unknown>".to_string());
        let payload = info.payload();
        let message =
            payload.downcast_ref::<&str>().copied().or_else(|| payload.downcast_ref::<String>().map(String::as_str)).unwrap_or("Box<dyn Any>");
        error!("thread '{}' panicked at {}: {}", thread.name().unwrap_or("<unnamed>"), location, message);
        default_hook(info);
        println!("Exiting...");
        process::exit(1);
    }));
}
