use std::str::Utf8Error;

use thiserror::Error;

pub mod difficulty;
pub mod game_state;
pub mod peer_msg;

/// the port a host listens on when none is given.
pub const DEFAULT_PORT: u16 = 41043;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq))]
pub enum DeserializeMessageError {
    #[error("empty message")]
    EmptyMessage,
    #[error("invalid amount of bytes")]
    InvalidByteCount,
    #[error("invalid ball position")]
    InvalidBallPosition,
    #[error("invalid ball velocity")]
    InvalidBallVelocity,
    #[error("invalid difficulty")]
    InvalidDifficulty,
    #[error("invalid paddle position")]
    InvalidPaddlePosition,
    #[error("invalid round count")]
    InvalidRoundCount,
    #[error("invalid score")]
    InvalidScore,
    #[error("missing payload")]
    MissingPayload,
    #[error("unexpected payload")]
    UnexpectedPayload,
    #[error("unrecognised message")]
    UnrecognisedMessageVariant,
    #[error(transparent)]
    Utf8Error(#[from] Utf8Error),
}

fn validate_byte_count(slice: &[u8], exp_len: usize) -> Result<(), DeserializeMessageError> {
    if slice.len() != exp_len {
        Err(DeserializeMessageError::InvalidByteCount)
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[macro_export]
macro_rules! assert_serialize {
    ($message:expr, $expected:expr $(,)?) => {
        assert_eq!(Vec::<u8>::from($message), $expected)
    };
}

#[cfg(test)]
#[macro_export]
macro_rules! assert_deserialize {
    ($type:tt, $bytes:expr, $expected:expr $(,)?) => {
        assert_eq!($type::try_from($bytes.as_slice()), $expected)
    };
}

#[cfg(test)]
#[macro_export]
macro_rules! assert_serialize_and_back {
    ($message:expr $(,)?) => {
        assert_eq!(
            Vec::<u8>::from($message.clone()).as_slice().try_into(),
            Ok($message)
        )
    };
}
