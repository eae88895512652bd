use crate::{
    difficulty::Difficulty,
    game_state::{
        Ball, GameState, GAME_HEIGHT, GAME_WIDTH, PADDLE_MAX_Y, PADDLE_MIN_Y, WINNING_SCORE,
    },
    validate_byte_count, DeserializeMessageError,
};

/// the largest number of bytes a serialized peer message could take up, rounded up.
/// [`PeerMessage::StateUpdate`] is the largest message when serialized (tag + separator + snapshot).
pub const MAX_PEER_MESSAGE_SIZE: usize = 64;

/// the number of integer fields in a serialized [`GameState`].
pub const SNAPSHOT_FIELDS: usize = 9;
pub const SNAPSHOT_SIZE: usize = SNAPSHOT_FIELDS * 4;

/// separates the ascii tag from the payload. tags never contain this byte.
pub const TAG_SEPARATOR: u8 = 0;

const HELLO_TAG: &str = "hello";
const ACK_TAG: &str = "ack";
const STATE_UPDATE_TAG: &str = "game_state";
const ROUND_RESET_TAG: &str = "reset";
const CLOSE_TAG: &str = "close";

const _CHECKS: () = {
    assert!(
        STATE_UPDATE_TAG.len() + 1 + SNAPSHOT_SIZE <= MAX_PEER_MESSAGE_SIZE,
        "a serialized state update does not fit in a single receive buffer"
    );
};

/// every message travels as one datagram: the tag, then the separator and payload for the
/// variants that carry data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerMessage {
    Hello,
    Ack {
        difficulty: Difficulty,
        round_limit: u32,
    },
    StateUpdate {
        snapshot: GameState,
    },
    RoundReset {
        snapshot: GameState,
    },
    Close,
}

impl PeerMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            PeerMessage::Hello => HELLO_TAG,
            PeerMessage::Ack { .. } => ACK_TAG,
            PeerMessage::StateUpdate { .. } => STATE_UPDATE_TAG,
            PeerMessage::RoundReset { .. } => ROUND_RESET_TAG,
            PeerMessage::Close => CLOSE_TAG,
        }
    }
}

impl From<PeerMessage> for Vec<u8> {
    fn from(value: PeerMessage) -> Self {
        let tag = value.tag().as_bytes();
        match value {
            PeerMessage::Hello | PeerMessage::Close => tag.to_vec(),
            PeerMessage::Ack {
                difficulty,
                round_limit,
            } => [
                tag,
                &[TAG_SEPARATOR],
                &round_limit.to_be_bytes(),
                difficulty.label().as_bytes(),
            ]
            .concat(),
            PeerMessage::StateUpdate { snapshot } | PeerMessage::RoundReset { snapshot } => {
                [tag, &[TAG_SEPARATOR], &serialize_snapshot(&snapshot)].concat()
            }
        }
    }
}

impl TryFrom<&[u8]> for PeerMessage {
    type Error = DeserializeMessageError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(DeserializeMessageError::EmptyMessage);
        }
        let (tag, payload) = match value.iter().position(|&byte| byte == TAG_SEPARATOR) {
            Some(idx) => (&value[..idx], Some(&value[idx + 1..])),
            None => (value, None),
        };
        match std::str::from_utf8(tag) {
            Ok(HELLO_TAG) => {
                no_payload(payload)?;
                Ok(PeerMessage::Hello)
            }
            Ok(CLOSE_TAG) => {
                no_payload(payload)?;
                Ok(PeerMessage::Close)
            }
            Ok(ACK_TAG) => {
                let payload = payload.ok_or(DeserializeMessageError::MissingPayload)?;
                if payload.len() < 4 {
                    return Err(DeserializeMessageError::InvalidByteCount);
                }
                let (round_limit, label) = payload.split_at(4);
                let round_limit = u32::from_be_bytes([
                    round_limit[0],
                    round_limit[1],
                    round_limit[2],
                    round_limit[3],
                ]);
                let difficulty = std::str::from_utf8(label)?
                    .parse()
                    .map_err(|_| DeserializeMessageError::InvalidDifficulty)?;
                Ok(PeerMessage::Ack {
                    difficulty,
                    round_limit,
                })
            }
            Ok(STATE_UPDATE_TAG) => Ok(PeerMessage::StateUpdate {
                snapshot: deserialize_snapshot(payload)?,
            }),
            Ok(ROUND_RESET_TAG) => Ok(PeerMessage::RoundReset {
                snapshot: deserialize_snapshot(payload)?,
            }),
            _ => Err(DeserializeMessageError::UnrecognisedMessageVariant),
        }
    }
}

fn no_payload(payload: Option<&[u8]>) -> Result<(), DeserializeMessageError> {
    match payload {
        Some(_) => Err(DeserializeMessageError::UnexpectedPayload),
        None => Ok(()),
    }
}

fn serialize_snapshot(snapshot: &GameState) -> Vec<u8> {
    [
        snapshot.ball.x,
        snapshot.ball.y,
        snapshot.ball.dx,
        snapshot.ball.dy,
        snapshot.left_paddle,
        snapshot.right_paddle,
        snapshot.left_score,
        snapshot.right_score,
        snapshot.rounds_played,
    ]
    .iter()
    .flat_map(|field| field.to_be_bytes())
    .collect()
}

fn deserialize_snapshot(payload: Option<&[u8]>) -> Result<GameState, DeserializeMessageError> {
    let payload = payload.ok_or(DeserializeMessageError::MissingPayload)?;
    validate_byte_count(payload, SNAPSHOT_SIZE)?;
    let mut fields = [0; SNAPSHOT_FIELDS];
    for (field, bytes) in fields.iter_mut().zip(payload.chunks_exact(4)) {
        *field = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    let [x, y, dx, dy, left_paddle, right_paddle, left_score, right_score, rounds_played] = fields;
    if !(dx == -1 || dx == 1) || !(-1..=1).contains(&dy) {
        return Err(DeserializeMessageError::InvalidBallVelocity);
    }
    // a peer keeps moving the ball past the goal it does not own until the other side's reset
    // arrives, so x gets one field width of slack either way.
    if !(-GAME_WIDTH..2 * GAME_WIDTH).contains(&x) || !(1..=GAME_HEIGHT - 2).contains(&y) {
        return Err(DeserializeMessageError::InvalidBallPosition);
    }
    if ![left_paddle, right_paddle]
        .iter()
        .all(|paddle| (PADDLE_MIN_Y..=PADDLE_MAX_Y).contains(paddle))
    {
        return Err(DeserializeMessageError::InvalidPaddlePosition);
    }
    if ![left_score, right_score]
        .iter()
        .all(|score| (0..WINNING_SCORE).contains(score))
    {
        return Err(DeserializeMessageError::InvalidScore);
    }
    if rounds_played < 0 {
        return Err(DeserializeMessageError::InvalidRoundCount);
    }
    Ok(GameState {
        ball: Ball { x, y, dx, dy },
        left_paddle,
        right_paddle,
        left_score,
        right_score,
        rounds_played,
    })
}
