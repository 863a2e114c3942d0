//! Fixed-interval control loop driving `someipd`.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use control_channel::{ClientError, CommandId, ControlClient, Request};

use crate::shutdown::ShutdownToken;

const HEARTBEAT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::heartbeat");

/// Outcome of a heartbeat run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSummary {
    /// Round trips attempted.
    pub ticks: u64,
    /// Round trips that failed.
    pub failures: u64,
}

/// Sends one control request per interval until shut down.
#[derive(Debug)]
pub struct Heartbeat<C> {
    client: C,
    interval: Duration,
    command: CommandId,
}

impl<C: ControlClient> Heartbeat<C> {
    /// Builds a heartbeat sending [`CommandId::Foo`] through a started client.
    #[must_use]
    pub const fn new(client: C, interval: Duration) -> Self {
        Self {
            client,
            interval,
            command: CommandId::Foo,
        }
    }

    /// Selects the command sent on every tick.
    #[must_use]
    pub const fn with_command(mut self, command: CommandId) -> Self {
        self.command = command;
        self
    }

    /// Performs one round trip.
    ///
    /// # Errors
    ///
    /// Returns the client's error unchanged.
    pub fn tick(&mut self) -> Result<Vec<u8>, ClientError> {
        let request = Request::for_id(self.command).encode();
        self.client.send_wait_reply(&request)
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// The token is checked before every round trip, so once it is cancelled
    /// the round trip in flight completes and no new one starts. Failures are
    /// logged and counted; they never end the loop.
    pub fn run(&mut self, shutdown: &ShutdownToken) -> HeartbeatSummary {
        let mut summary = HeartbeatSummary::default();
        while !shutdown.is_cancelled() {
            summary.ticks += 1;
            match self.tick() {
                Ok(reply) => {
                    debug!(
                        target: HEARTBEAT_TARGET,
                        command = %self.command,
                        reply_len = reply.len(),
                        "control request acknowledged"
                    );
                }
                Err(error) => {
                    summary.failures += 1;
                    warn!(
                        target: HEARTBEAT_TARGET,
                        command = %self.command,
                        %error,
                        "error sending control message"
                    );
                }
            }
            if shutdown.is_cancelled() {
                break;
            }
            thread::sleep(self.interval);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use control_channel::{ErrorCode, REQUEST_SIZE};
    use mockall::mock;

    use super::*;

    mock! {
        Client {}
        impl ControlClient for Client {
            fn start(&mut self) -> Result<(), ClientError>;
            fn send_wait_reply(&mut self, message: &[u8]) -> Result<Vec<u8>, ClientError>;
        }
    }

    #[test]
    fn tick_sends_the_encoded_foo_request() {
        let mut client = MockClient::new();
        client
            .expect_send_wait_reply()
            .withf(|message| message == [0x00_u8; REQUEST_SIZE].as_slice())
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let mut heartbeat = Heartbeat::new(client, Duration::ZERO);
        assert_eq!(heartbeat.tick().expect("reply"), Vec::<u8>::new());
    }

    #[test]
    fn cancelled_token_starts_no_round_trip() {
        let mut client = MockClient::new();
        client.expect_send_wait_reply().never();
        let token = ShutdownToken::new();
        token.cancel();
        let summary = Heartbeat::new(client, Duration::ZERO).run(&token);
        assert_eq!(summary, HeartbeatSummary::default());
    }

    #[test]
    fn cancellation_during_a_round_trip_lets_it_finish_and_stops_the_loop() {
        let token = ShutdownToken::new();
        let canceller = token.clone();
        let mut client = MockClient::new();
        client.expect_send_wait_reply().times(1).returning(move |_| {
            canceller.cancel();
            Ok(Vec::new())
        });
        let summary = Heartbeat::new(client, Duration::from_secs(60)).run(&token);
        assert_eq!(summary, HeartbeatSummary { ticks: 1, failures: 0 });
    }

    #[test]
    fn failures_are_counted_and_do_not_stop_the_loop() {
        let token = ShutdownToken::new();
        let canceller = token.clone();
        let calls = Arc::new(Mutex::new(0_u32));
        let seen = Arc::clone(&calls);
        let mut client = MockClient::new();
        client.expect_send_wait_reply().times(3).returning(move |_| {
            let mut count = seen.lock().expect("counter lock");
            *count += 1;
            if *count == 3 {
                canceller.cancel();
            }
            if *count == 1 {
                Err(ClientError::Rejected {
                    code: ErrorCode::HandlerFailed,
                })
            } else {
                Ok(Vec::new())
            }
        });
        let summary = Heartbeat::new(client, Duration::ZERO).run(&token);
        assert_eq!(summary, HeartbeatSummary { ticks: 3, failures: 1 });
        assert_eq!(*calls.lock().expect("counter lock"), 3);
    }

    #[test]
    fn configured_command_is_sent() {
        let mut client = MockClient::new();
        client
            .expect_send_wait_reply()
            .withf(|message| message == [0x01_u8].as_slice())
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let mut heartbeat = Heartbeat::new(client, Duration::ZERO).with_command(CommandId::Bar);
        heartbeat.tick().expect("reply");
    }
}
