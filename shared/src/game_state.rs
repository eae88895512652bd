use rand::Rng;

pub const GAME_WIDTH: i32 = 43;
pub const GAME_HEIGHT: i32 = 21;
pub const LEFT_PADDLE_X: i32 = 1;
pub const RIGHT_PADDLE_X: i32 = GAME_WIDTH - 2;
pub const MIDLINE_X: i32 = GAME_WIDTH / 2;
/// how many rows above or below its center a paddle still deflects the ball.
pub const PADDLE_REACH: i32 = 2;
pub const PADDLE_MIN_Y: i32 = 1 + PADDLE_REACH;
pub const PADDLE_MAX_Y: i32 = GAME_HEIGHT - 2 - PADDLE_REACH;
/// reaching this score wins the round.
pub const WINNING_SCORE: i32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// which end of the handshake a peer sat on. fixed for the whole session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// waits for a `Hello`, picks the difficulty and round limit. plays the right paddle.
    Host,
    /// sends the `Hello` and adopts the host's settings. plays the left paddle.
    Guest,
}

impl Role {
    /// the paddle driven by this peer's player. it is also the side this peer scores for.
    pub fn local_side(self) -> Side {
        match self {
            Role::Host => Side::Right,
            Role::Guest => Side::Left,
        }
    }

    pub fn remote_side(self) -> Side {
        self.local_side().opponent()
    }

    /// a peer runs its own ball physics while the ball travels towards the opponent's goal and
    /// adopts the remote ball while it travels towards its own. the midline column belongs to
    /// neither peer.
    pub fn defers_ball_at(self, x: i32) -> bool {
        match self {
            Role::Host => x > MIDLINE_X,
            Role::Guest => x < MIDLINE_X,
        }
    }

    /// true when a ball at `x` has left the field through the goal this peer is authoritative for.
    fn detects_goal_at(self, x: i32) -> bool {
        match self {
            Role::Host => x <= LEFT_PADDLE_X,
            Role::Guest => x >= RIGHT_PADDLE_X,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaddleMove {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ball {
    pub x: i32,
    pub y: i32,
    /// always -1 or 1.
    pub dx: i32,
    /// -1, 0 or 1.
    pub dy: i32,
}

impl Ball {
    pub fn serve(dx: i32) -> Self {
        Self {
            x: GAME_WIDTH / 2,
            y: GAME_HEIGHT / 2,
            dx,
            dy: 0,
        }
    }

    pub fn in_field(&self) -> bool {
        (0..GAME_WIDTH).contains(&self.x) && (1..GAME_HEIGHT - 1).contains(&self.y)
    }
}

/// the record both peers read and partially write. it doubles as the snapshot carried by
/// `game_state` and `reset` messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GameState {
    pub ball: Ball,
    pub left_paddle: i32,
    pub right_paddle: i32,
    pub left_score: i32,
    pub right_score: i32,
    pub rounds_played: i32,
}

impl GameState {
    pub fn score(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.left_score,
            Side::Right => self.right_score,
        }
    }

    fn score_mut(&mut self, side: Side) -> &mut i32 {
        match side {
            Side::Left => &mut self.left_score,
            Side::Right => &mut self.right_score,
        }
    }

    pub fn paddle(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.left_paddle,
            Side::Right => self.right_paddle,
        }
    }

    fn paddle_mut(&mut self, side: Side) -> &mut i32 {
        match side {
            Side::Left => &mut self.left_paddle,
            Side::Right => &mut self.right_paddle,
        }
    }

    pub fn rounds_reached(&self, round_limit: u32) -> bool {
        u32::try_from(self.rounds_played).map_or(false, |rounds| rounds >= round_limit)
    }

    /// returns ball and paddles to the center and serves in a random horizontal direction.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let dx = if rng.gen_bool(0.5) { 1 } else { -1 };
        self.ball = Ball::serve(dx);
        self.recenter_paddles();
    }

    pub fn recenter_paddles(&mut self) {
        self.left_paddle = GAME_HEIGHT / 2;
        self.right_paddle = GAME_HEIGHT / 2;
    }

    pub fn move_paddle(&mut self, side: Side, paddle_move: PaddleMove) {
        let paddle = self.paddle_mut(side);
        *paddle = match paddle_move {
            PaddleMove::Up => *paddle - 1,
            PaddleMove::Down => *paddle + 1,
        }
        .clamp(PADDLE_MIN_Y, PADDLE_MAX_Y);
    }

    /// moves the ball one cell, bounces it off paddles and walls, and reports the side that scored
    /// when the ball left through the goal `role` is authoritative for.
    pub fn advance(&mut self, role: Role) -> Option<Side> {
        let ball = &mut self.ball;
        ball.x += ball.dx;
        ball.y += ball.dy;

        let (paddle_y, collision_x) = if ball.x < MIDLINE_X {
            (self.left_paddle, LEFT_PADDLE_X + 1)
        } else {
            (self.right_paddle, RIGHT_PADDLE_X - 1)
        };
        let offset = ball.y - paddle_y;
        if ball.x == collision_x && offset.abs() <= PADDLE_REACH {
            ball.dx = -ball.dx;
            ball.dy = offset.signum();
        }

        if ball.y <= 1 {
            ball.dy = 1;
        } else if ball.y >= GAME_HEIGHT - 2 {
            ball.dy = -1;
        }

        role.detects_goal_at(ball.x).then(|| role.local_side())
    }

    /// adds a point for `side`. a point that reaches the winning score completes the round, so the
    /// score drops back to zero and `rounds_played` moves on. returns whether a round completed.
    pub fn award_point(&mut self, side: Side) -> bool {
        let score = self.score_mut(side);
        *score += 1;
        if *score >= WINNING_SCORE {
            *score = 0;
            self.rounds_played += 1;
            true
        } else {
            false
        }
    }

    /// applies a remote `game_state` snapshot. the local paddle and score are never overwritten.
    /// every field taken is copied wholesale, so applying the same snapshot again changes nothing.
    pub fn merge_update(&mut self, role: Role, remote: &GameState) {
        if role.defers_ball_at(self.ball.x) {
            self.ball = remote.ball;
        }
        let remote_side = role.remote_side();
        *self.paddle_mut(remote_side) = remote.paddle(remote_side);
        *self.score_mut(remote_side) = remote.score(remote_side);
    }

    /// applies a remote `reset` snapshot. the round counter only ever moves forward, and the local
    /// score is cleared only when it does. returns whether the round counter advanced.
    pub fn merge_reset(&mut self, role: Role, remote: &GameState) -> bool {
        self.ball = Ball::serve(remote.ball.dx);
        self.recenter_paddles();
        let remote_side = role.remote_side();
        *self.score_mut(remote_side) = remote.score(remote_side);
        if remote.rounds_played > self.rounds_played {
            self.rounds_played = remote.rounds_played;
            *self.score_mut(role.local_side()) = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::game_state::{
        Ball, GameState, PaddleMove, Role, Side, GAME_HEIGHT, GAME_WIDTH, PADDLE_MAX_Y,
        PADDLE_MIN_Y,
    };

    fn served(dx: i32) -> GameState {
        let mut state = GameState::default();
        state.recenter_paddles();
        state.ball = Ball::serve(dx);
        state
    }

    #[test]
    fn velocity_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for role in [Role::Host, Role::Guest] {
            let mut state = served(1);
            // a paddle offset from the ball's row sends it diagonally into the walls.
            state.right_paddle = GAME_HEIGHT / 2 + 1;
            state.left_paddle = GAME_HEIGHT / 2 - 1;
            for _ in 0..5000 {
                if let Some(side) = state.advance(role) {
                    state.award_point(side);
                    state.reset(&mut rng);
                }
                assert!(state.ball.dx == -1 || state.ball.dx == 1);
                assert!((-1..=1).contains(&state.ball.dy));
                assert!((1..=GAME_HEIGHT - 2).contains(&state.ball.y));
                // keep the ball inside the field on the side this peer does not simulate.
                if !state.ball.in_field() {
                    state.reset(&mut rng);
                }
            }
        }
    }

    #[test]
    fn ball_spawns_at_center() {
        assert_eq!(GAME_WIDTH / 2, 21);
        assert_eq!(GAME_HEIGHT / 2, 10);
        let mut state = GameState::default();
        state.reset(&mut StdRng::seed_from_u64(1));
        assert_eq!((state.ball.x, state.ball.y, state.ball.dy), (21, 10, 0));
        assert!(state.ball.dx == -1 || state.ball.dx == 1);
        assert_eq!((state.left_paddle, state.right_paddle), (10, 10));
    }

    #[test]
    fn reset_randomizes_direction() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut state = GameState::default();
        let mut seen = [false; 2];
        for _ in 0..64 {
            state.reset(&mut rng);
            seen[(state.ball.dx > 0) as usize] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn host_scores_for_right_when_ball_leaves_left() {
        let mut state = served(-1);
        // keep the left paddle out of the ball's way.
        state.left_paddle = PADDLE_MAX_Y;
        let mut ticks = 0;
        let scored = loop {
            ticks += 1;
            if let Some(side) = state.advance(Role::Host) {
                break side;
            }
            assert!(ticks < GAME_WIDTH, "ball never reached the left boundary");
        };
        assert_eq!(scored, Side::Right);
        assert_eq!(state.ball.x, 1);
        assert!(!state.award_point(scored));
        assert_eq!(state.right_score, 1);
        state.reset(&mut StdRng::seed_from_u64(3));
        assert_eq!((state.ball.x, state.ball.y), (21, 10));
        assert_eq!(state.right_score, 1);
    }

    #[test]
    fn guest_does_not_score_the_left_goal() {
        let mut state = served(-1);
        state.left_paddle = PADDLE_MAX_Y;
        for _ in 0..GAME_WIDTH {
            assert_eq!(state.advance(Role::Guest), None);
        }
        let mut state = served(1);
        state.right_paddle = PADDLE_MAX_Y;
        let scored = (0..GAME_WIDTH).find_map(|_| state.advance(Role::Guest));
        assert_eq!(scored, Some(Side::Left));
        assert_eq!(state.ball.x, GAME_WIDTH - 2);
    }

    #[test]
    fn paddle_deflects_by_offset() {
        // ball one step away from the left collision column.
        for (paddle_y, expected_dy) in [(10, 0), (12, -1), (8, 1)] {
            let mut state = served(-1);
            state.ball.x = 3;
            state.left_paddle = paddle_y;
            state.advance(Role::Host);
            assert_eq!(state.ball.x, 2);
            assert_eq!(state.ball.dx, 1);
            assert_eq!(state.ball.dy, expected_dy);
        }
        // out of reach, no deflection.
        let mut state = served(-1);
        state.ball.x = 3;
        state.left_paddle = 13;
        state.advance(Role::Host);
        assert_eq!(state.ball.dx, -1);
    }

    #[test]
    fn walls_force_vertical_direction() {
        let mut state = served(1);
        state.ball.y = 2;
        state.ball.dy = -1;
        state.advance(Role::Host);
        assert_eq!((state.ball.y, state.ball.dy), (1, 1));
        state.ball.y = GAME_HEIGHT - 3;
        state.ball.dy = 1;
        state.advance(Role::Host);
        assert_eq!((state.ball.y, state.ball.dy), (GAME_HEIGHT - 2, -1));
    }

    #[test]
    fn second_point_completes_round() {
        let mut state = served(1);
        assert!(!state.award_point(Side::Left));
        assert_eq!((state.left_score, state.rounds_played), (1, 0));
        assert!(state.award_point(Side::Left));
        assert_eq!((state.left_score, state.rounds_played), (0, 1));
        assert_eq!(state.right_score, 0);
    }

    #[test]
    fn rounds_reached() {
        let mut state = GameState::default();
        assert!(state.rounds_reached(0));
        assert!(!state.rounds_reached(1));
        state.rounds_played = 3;
        assert!(state.rounds_reached(3));
        assert!(!state.rounds_reached(4));
        state.rounds_played = -1;
        assert!(!state.rounds_reached(0));
    }

    #[test]
    fn move_paddle_clamps() {
        let mut state = served(1);
        for _ in 0..GAME_HEIGHT {
            state.move_paddle(Side::Left, PaddleMove::Up);
        }
        assert_eq!(state.left_paddle, PADDLE_MIN_Y);
        for _ in 0..GAME_HEIGHT {
            state.move_paddle(Side::Left, PaddleMove::Down);
        }
        assert_eq!(state.left_paddle, PADDLE_MAX_Y);
        assert_eq!(state.right_paddle, GAME_HEIGHT / 2);
    }

    #[test]
    fn merge_update_follows_ball_half() {
        let remote = GameState {
            ball: Ball {
                x: 30,
                y: 4,
                dx: 1,
                dy: -1,
            },
            left_paddle: 5,
            right_paddle: 15,
            left_score: 1,
            right_score: 1,
            rounds_played: 4,
        };
        // the host simulates the left half itself.
        let mut local = served(-1);
        local.ball.x = 10;
        let before = local.ball;
        local.merge_update(Role::Host, &remote);
        assert_eq!(local.ball, before);
        // and defers to the guest on the right half.
        local.ball.x = 30;
        local.merge_update(Role::Host, &remote);
        assert_eq!(local.ball, remote.ball);
        // the guest mirrors it: the right half is its own.
        let mut local = served(1);
        local.ball.x = 30;
        let before = local.ball;
        local.merge_update(Role::Guest, &remote);
        assert_eq!(local.ball, before);
        // and the left half follows the host.
        let remote = GameState {
            ball: Ball {
                x: 12,
                y: 16,
                dx: -1,
                dy: 1,
            },
            ..remote
        };
        local.ball.x = 10;
        local.merge_update(Role::Guest, &remote);
        assert_eq!(local.ball, remote.ball);
        // the midline belongs to neither peer.
        let mut local = served(1);
        local.merge_update(Role::Host, &remote);
        local.merge_update(Role::Guest, &remote);
        assert_eq!(local.ball, Ball::serve(1));
    }

    #[test]
    fn merge_update_only_takes_remote_fields() {
        let remote = GameState {
            ball: Ball::serve(1),
            left_paddle: 5,
            right_paddle: 15,
            left_score: 1,
            right_score: 1,
            rounds_played: 4,
        };
        let mut local = served(1);
        local.right_paddle = 7;
        local.merge_update(Role::Host, &remote);
        assert_eq!((local.left_paddle, local.left_score), (5, 1));
        assert_eq!((local.right_paddle, local.right_score), (7, 0));
        assert_eq!(local.rounds_played, 0);

        let mut local = served(1);
        local.merge_update(Role::Guest, &remote);
        assert_eq!((local.right_paddle, local.right_score), (15, 1));
        assert_eq!((local.left_paddle, local.left_score), (10, 0));
    }

    #[test]
    fn merge_update_is_idempotent() {
        let remote = GameState {
            ball: Ball {
                x: 35,
                y: 9,
                dx: -1,
                dy: 1,
            },
            left_paddle: 6,
            right_paddle: 12,
            left_score: 1,
            right_score: 0,
            rounds_played: 1,
        };
        for role in [Role::Host, Role::Guest] {
            let mut local = served(1);
            local.ball.x = 32;
            local.merge_update(role, &remote);
            let once = local;
            local.merge_update(role, &remote);
            assert_eq!(local, once);
        }
    }

    #[test]
    fn merge_reset_advances_round() {
        let mut local = served(1);
        local.ball.x = 5;
        local.right_score = 1;
        local.left_paddle = 4;
        let remote = GameState {
            ball: Ball::serve(-1),
            left_score: 0,
            rounds_played: 1,
            ..GameState::default()
        };
        assert!(local.merge_reset(Role::Host, &remote));
        assert_eq!(local.ball, Ball::serve(-1));
        assert_eq!((local.left_paddle, local.right_paddle), (10, 10));
        assert_eq!((local.left_score, local.right_score), (0, 0));
        assert_eq!(local.rounds_played, 1);
    }

    #[test]
    fn stale_reset_keeps_local_score() {
        let mut local = served(1);
        local.right_score = 1;
        local.rounds_played = 2;
        for rounds_played in [1, 2] {
            let remote = GameState {
                ball: Ball::serve(1),
                left_score: 1,
                rounds_played,
                ..GameState::default()
            };
            assert!(!local.merge_reset(Role::Host, &remote));
            assert_eq!(local.right_score, 1);
            assert_eq!(local.left_score, 1);
            assert_eq!(local.rounds_played, 2);
        }
    }
}
