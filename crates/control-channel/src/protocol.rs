//! Wire contract of the control channel.
//!
//! A request is one fixed-size frame: the command discriminant in byte 0,
//! followed by a payload region sized for the largest command payload. The
//! discriminant is always validated before the payload it selects is read.
//!
//! Command ordinals are part of the contract between independently built
//! daemons. New commands are appended; released ordinals never move.

use std::fmt;

use thiserror::Error;

/// Fixed-size payload carried in the union region of a [`Request`].
pub trait CommandPayload: Sized {
    /// Number of bytes the payload occupies at the start of the union region.
    const ENCODED_LEN: usize;

    /// Writes the payload into the union region. `region` is at least
    /// [`Self::ENCODED_LEN`] bytes long.
    fn encode_into(&self, region: &mut [u8]);

    /// Reads the payload from the union region.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Payload`] when the bytes do not form a valid
    /// payload.
    fn decode_from(region: &[u8]) -> Result<Self, DecodeError>;
}

/// Payload of [`CommandId::Foo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FooCommand;

impl CommandPayload for FooCommand {
    const ENCODED_LEN: usize = 0;

    fn encode_into(&self, _region: &mut [u8]) {}

    fn decode_from(_region: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self)
    }
}

/// Payload of [`CommandId::Bar`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarCommand;

impl CommandPayload for BarCommand {
    const ENCODED_LEN: usize = 0;

    fn encode_into(&self, _region: &mut [u8]) {}

    fn decode_from(_region: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self)
    }
}

const fn max_len(left: usize, right: usize) -> usize {
    if left > right { left } else { right }
}

/// Size of the union region following the discriminant.
pub const PAYLOAD_SIZE: usize = max_len(FooCommand::ENCODED_LEN, BarCommand::ENCODED_LEN);

/// Exact size of an encoded [`Request`].
pub const REQUEST_SIZE: usize = 1 + PAYLOAD_SIZE;

/// Largest message either side of the control channel may send.
pub const MAX_SEND_SIZE: usize = REQUEST_SIZE;

const _: () = assert!(MAX_SEND_SIZE >= REQUEST_SIZE);
const _: () = assert!(MAX_SEND_SIZE <= u16::MAX as usize);

/// Identity and sizing of an IPC service protocol.
#[derive(Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Name both peers use to find the shared transport endpoint.
    pub identifier: &'static str,
    /// Largest single message either side may send.
    pub max_send_size: usize,
}

/// The control channel between `gatewayd` and `someipd`.
pub static PROTOCOL_CONFIG: ProtocolConfig = ProtocolConfig {
    identifier: "score_someipd_control_channel",
    max_send_size: MAX_SEND_SIZE,
};

/// Semantic operation requested by a control message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    /// Foo command, ordinal 0.
    Foo = 0,
    /// Bar command, ordinal 1.
    Bar = 1,
}

impl CommandId {
    /// Wire value of the command.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Canonical lower-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Foo => "foo",
            Self::Bar => "bar",
        }
    }
}

impl TryFrom<u8> for CommandId {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Foo),
            1 => Ok(Self::Bar),
            _ => Err(DecodeError::UnknownCommand { value }),
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Decoded command: the discriminant together with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// See [`FooCommand`].
    Foo(FooCommand),
    /// See [`BarCommand`].
    Bar(BarCommand),
}

impl Command {
    /// Discriminant of the command.
    #[must_use]
    pub const fn id(&self) -> CommandId {
        match self {
            Self::Foo(_) => CommandId::Foo,
            Self::Bar(_) => CommandId::Bar,
        }
    }
}

/// Control-channel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    command: Command,
}

impl Request {
    /// Wraps a command into a request.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self { command }
    }

    /// Builds the request for a command whose payload carries no data.
    #[must_use]
    pub const fn for_id(id: CommandId) -> Self {
        match id {
            CommandId::Foo => Self::new(Command::Foo(FooCommand)),
            CommandId::Bar => Self::new(Command::Bar(BarCommand)),
        }
    }

    /// Discriminant of the carried command.
    #[must_use]
    pub const fn command_id(&self) -> CommandId {
        self.command.id()
    }

    /// The carried command.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// Serialises the request into its fixed-size frame. Bytes of the union
    /// region not used by the active payload are zero.
    #[must_use]
    pub fn encode(&self) -> [u8; REQUEST_SIZE] {
        let mut frame = [0_u8; REQUEST_SIZE];
        let (discriminant, region) = frame.split_at_mut(1);
        if let Some(byte) = discriminant.first_mut() {
            *byte = self.command_id().as_u8();
        }
        match &self.command {
            Command::Foo(payload) => payload.encode_into(region),
            Command::Bar(payload) => payload.encode_into(region),
        }
        frame
    }

    /// Decodes an untrusted message.
    ///
    /// The length is checked first, then the discriminant, and only then the
    /// payload selected by the discriminant.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Size`] for any length other than
    /// [`REQUEST_SIZE`], [`DecodeError::UnknownCommand`] for discriminants this
    /// build does not know, and the payload's own error otherwise.
    pub fn decode(message: &[u8]) -> Result<Self, DecodeError> {
        if message.len() != REQUEST_SIZE {
            return Err(DecodeError::Size {
                expected: REQUEST_SIZE,
                actual: message.len(),
            });
        }
        let Some((&discriminant, region)) = message.split_first() else {
            return Err(DecodeError::Size {
                expected: REQUEST_SIZE,
                actual: 0,
            });
        };
        let command = match CommandId::try_from(discriminant)? {
            CommandId::Foo => Command::Foo(FooCommand::decode_from(region)?),
            CommandId::Bar => Command::Bar(BarCommand::decode_from(region)?),
        };
        Ok(Self::new(command))
    }
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

/// Errors raised while decoding a control message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The message length does not match the request layout.
    #[error("message of {actual} bytes does not match the {expected}-byte request layout")]
    Size {
        /// Required length.
        expected: usize,
        /// Received length.
        actual: usize,
    },
    /// The discriminant names no command known to this build.
    #[error("unknown command id {value}")]
    UnknownCommand {
        /// Received discriminant.
        value: u8,
    },
    /// The payload bytes are invalid for the selected command.
    #[error("invalid {command} payload: {reason}")]
    Payload {
        /// Command whose payload failed to decode.
        command: CommandId,
        /// Description of the defect.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CommandId::Foo, [0x00])]
    #[case(CommandId::Bar, [0x01])]
    fn encodes_discriminant_in_first_byte(
        #[case] id: CommandId,
        #[case] expected: [u8; REQUEST_SIZE],
    ) {
        assert_eq!(Request::for_id(id).encode(), expected);
    }

    #[rstest]
    #[case(&[0x00], CommandId::Foo)]
    #[case(&[0x01], CommandId::Bar)]
    fn decodes_known_commands(#[case] frame: &[u8], #[case] expected: CommandId) {
        let request = Request::decode(frame).expect("frame should decode");
        assert_eq!(request.command_id(), expected);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x00, 0x00])]
    #[case(&[0x01, 0x02, 0x03, 0x04])]
    fn rejects_wrong_lengths_before_reading_discriminant(#[case] frame: &[u8]) {
        let error = Request::decode(frame).expect_err("length mismatch must fail");
        assert_eq!(
            error,
            DecodeError::Size {
                expected: REQUEST_SIZE,
                actual: frame.len(),
            }
        );
    }

    #[rstest]
    #[case(0x02)]
    #[case(0x7F)]
    #[case(0xFF)]
    fn rejects_unknown_discriminants(#[case] value: u8) {
        let error = Request::decode(&[value]).expect_err("unknown command must fail");
        assert_eq!(error, DecodeError::UnknownCommand { value });
    }

    #[test]
    fn ordinals_are_stable() {
        assert_eq!(CommandId::Foo.as_u8(), 0);
        assert_eq!(CommandId::Bar.as_u8(), 1);
    }

    #[test]
    fn protocol_config_fits_largest_request() {
        assert_eq!(PROTOCOL_CONFIG.identifier, "score_someipd_control_channel");
        assert!(PROTOCOL_CONFIG.max_send_size >= REQUEST_SIZE);
    }
}
