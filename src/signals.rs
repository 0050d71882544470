use std::io;

use tokio::{
    select,
    signal::unix::{Signal, SignalKind, signal},
};

// Termination requests, listened to from the moment they are installed
pub struct ShutdownSignals {
    sigint: Signal,
    sigterm: Signal,
}

impl ShutdownSignals {
    // Register the handlers, from now on SIGINT and SIGTERM no longer
    // kill the process and are queued until `recv` is called
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    // Wait for the next termination request and return its name
    pub async fn recv(&mut self) -> &'static str {
        select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }
}
