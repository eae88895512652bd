use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use shared::difficulty::Difficulty;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub difficulty: Difficulty,
    pub round_limit: u32,
    /// pause between two outbound state updates. much shorter than any tick interval.
    pub sync_interval: Duration,
    /// how long a receive blocks before the inbound loop checks for shutdown.
    pub recv_timeout: Duration,
    /// silence from the peer longer than this ends the session.
    pub peer_timeout: Duration,
    pub countdown_steps: u32,
    pub countdown_step: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            round_limit: 3,
            sync_interval: Duration::from_millis(5),
            recv_timeout: Duration::from_millis(100),
            peer_timeout: Duration::from_secs(10),
            countdown_steps: 3,
            countdown_step: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        self.difficulty.tick_interval()
    }
}

/// asks for whichever of difficulty and round limit were not given on the command line.
/// invalid answers are asked again.
pub fn prompt_settings<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    difficulty: Option<Difficulty>,
    round_limit: Option<u32>,
) -> io::Result<(Difficulty, u32)> {
    let difficulty = match difficulty {
        Some(difficulty) => difficulty,
        None => ask(
            input,
            output,
            "Please select the difficulty level (easy, medium or hard): ",
            |answer| answer.parse::<Difficulty>().map_err(|err| err.to_string()),
        )?,
    };
    let round_limit = match round_limit {
        Some(round_limit) => round_limit,
        None => ask(
            input,
            output,
            "Please enter the maximum number of rounds to play: ",
            |answer| match answer.trim().parse::<u32>() {
                Ok(0) | Err(_) => Err(format!("{:?} is not a positive number", answer.trim())),
                Ok(rounds) => Ok(rounds),
            },
        )?,
    };
    Ok((difficulty, round_limit))
}

fn ask<R: BufRead, W: Write, T>(
    input: &mut R,
    output: &mut W,
    question: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> io::Result<T> {
    let mut answer = String::new();
    loop {
        write!(output, "{question}")?;
        output.flush()?;
        answer.clear();
        if input.read_line(&mut answer)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before the settings were chosen",
            ));
        }
        match parse(&answer) {
            Ok(value) => return Ok(value),
            Err(err) => writeln!(output, "{err}")?,
        }
    }
}
