use std::time::Duration;

use async_trait::async_trait;
use psyflow_core::{StimulusType, TrialDescriptor};
use psyflow_experiment::{EngineError, RenderingEngine, Unit, UnitResponse};
use psyflow_timing::{HighPrecisionTimer, Timer};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const ABORT_WORD: &str = "quit";

fn describe(stimulus: &StimulusType) -> String {
    match stimulus {
        StimulusType::Text { content } => content.clone(),
        StimulusType::Html { markup } => markup.clone(),
        StimulusType::Fixation { symbol } => format!("\n          {symbol}\n"),
        StimulusType::DotMotion(rdk) => rdk
            .apertures()
            .iter()
            .map(|a| {
                let arrow = if a.direction_deg == 180.0 { "<<<" } else { ">>>" };
                format!("{arrow}  ({} {} dots, {:.0}% coherent)", a.dots, a.color, a.coherence * 100.0)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Shows units on stdout and reads key responses from stdin, one line each.
pub struct TerminalEngine {
    timer: HighPrecisionTimer,
    input: Lines<BufReader<Stdin>>,
}

impl TerminalEngine {
    pub fn new(timer: HighPrecisionTimer) -> Self {
        Self {
            timer,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn hold(&self, ms: u64) -> Result<(), EngineError> {
        let timer = self.timer.clone();
        tokio::task::spawn_blocking(move || timer.sleep(Duration::from_millis(ms)))
            .await
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))
    }

    /// Reads lines until one matches a choice. Blank lines count as `" "`.
    async fn read_choice(&mut self, d: &TrialDescriptor) -> Result<String, EngineError> {
        loop {
            let Some(line) = self.input.next_line().await? else {
                return Err(EngineError::InputClosed);
            };
            let key = match line.trim() {
                "" => " ",
                k => k,
            };
            if key.eq_ignore_ascii_case(ABORT_WORD) {
                return Err(EngineError::Aborted);
            }
            if let Some(choice) = d.choices.iter().find(|c| c.eq_ignore_ascii_case(key)) {
                return Ok(choice.clone());
            }
            println!("Please press one of: {}", d.choices.join(", "));
        }
    }
}

#[async_trait]
impl RenderingEngine for TerminalEngine {
    async fn present(&mut self, unit: &Unit) -> Result<UnitResponse, EngineError> {
        let d = &unit.descriptor;
        println!("{}", describe(&d.stimulus));

        if !d.accepts_response() {
            self.hold(d.duration_ms.unwrap_or(0)).await?;
            return Ok(UnitResponse {
                time_elapsed_ms: self.timer.session_millis(),
                ..Default::default()
            });
        }

        let onset = self.timer.now();
        let answer = match d.duration_ms {
            Some(ms) => {
                tokio::time::timeout(Duration::from_millis(ms), self.read_choice(d))
                    .await
                    .ok()
            }
            None => Some(self.read_choice(d).await),
        };
        let response = answer.transpose()?;
        let rt_ms = response
            .as_ref()
            .map(|_| self.timer.millis_between(onset, self.timer.now()));

        Ok(UnitResponse {
            response,
            rt_ms,
            time_elapsed_ms: self.timer.session_millis(),
        })
    }
}

/// Stand-in participant: answers correctly with probability `accuracy`,
/// reaction times drawn uniformly from `rt_range_ms`. Does not wait.
pub struct SimulatedEngine<R: Rng + Send> {
    rng: R,
    accuracy: f64,
    rt_range_ms: (f64, f64),
    clock_ms: u64,
}

impl<R: Rng + Send> SimulatedEngine<R> {
    pub fn new(rng: R, accuracy: f64) -> Self {
        Self {
            rng,
            accuracy: accuracy.clamp(0.0, 1.0),
            rt_range_ms: (250.0, 900.0),
            clock_ms: 0,
        }
    }

    fn pick(&mut self, d: &TrialDescriptor) -> String {
        let hit = self.rng.random_bool(self.accuracy);
        let correct = d.correct_response.as_deref();
        let pool: Vec<&String> = d
            .choices
            .iter()
            .filter(|c| match correct {
                Some(key) if hit => c.eq_ignore_ascii_case(key),
                Some(key) => !c.eq_ignore_ascii_case(key),
                None => true,
            })
            .collect();
        let pool = if pool.is_empty() { d.choices.iter().collect() } else { pool };
        pool[self.rng.random_range(0..pool.len())].clone()
    }
}

#[async_trait]
impl<R: Rng + Send> RenderingEngine for SimulatedEngine<R> {
    async fn present(&mut self, unit: &Unit) -> Result<UnitResponse, EngineError> {
        let d = &unit.descriptor;
        if !d.accepts_response() {
            self.clock_ms += d.duration_ms.unwrap_or(0);
            return Ok(UnitResponse {
                time_elapsed_ms: self.clock_ms,
                ..Default::default()
            });
        }
        let rt = self.rng.random_range(self.rt_range_ms.0..self.rt_range_ms.1).round();
        self.clock_ms += rt as u64;
        Ok(UnitResponse {
            response: Some(self.pick(d)),
            rt_ms: Some(rt),
            time_elapsed_ms: self.clock_ms,
        })
    }
}
