//! Sink for text the driver prints verbatim, outside of structured logs.

/// Destination for verbatim output (test logs, push output).
pub trait Console: Send + Sync {
    fn emit(&self, text: &str);
}

/// Writes to the process's stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn emit(&self, text: &str) {
        println!("{text}");
    }
}
