//! Arithmetic CAPTCHA: challenge generation, verification and rendering.

mod glyphs;
pub mod render;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

pub use render::CaptchaRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '×',
            Self::Divide => '÷',
        }
    }

    pub fn apply(self, left: u32, right: u32) -> Option<u32> {
        match self {
            Self::Add => left.checked_add(right),
            Self::Subtract => left.checked_sub(right),
            Self::Multiply => left.checked_mul(right),
            Self::Divide if right != 0 && left % right == 0 => Some(left / right),
            Self::Divide => None,
        }
    }
}

/// One generated problem. Operands are single digits except the dividend of
/// a division, which is built as `quotient * divisor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    left: u32,
    operator: Operator,
    right: u32,
    answer: String,
}

impl CaptchaChallenge {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let operator = Operator::ALL[rng.gen_range(0..Operator::ALL.len())];
        let (left, right, answer) = match operator {
            Operator::Add => {
                let (a, b) = (digit(rng), digit(rng));
                (a, b, a + b)
            }
            Operator::Subtract => {
                let (a, b) = (digit(rng), digit(rng));
                let (a, b) = if a < b { (b, a) } else { (a, b) };
                (a, b, a - b)
            }
            Operator::Multiply => {
                let (a, b) = (digit(rng), digit(rng));
                (a, b, a * b)
            }
            Operator::Divide => {
                let quotient = digit(rng);
                let divisor = digit(rng);
                (quotient * divisor, divisor, quotient)
            }
        };

        Self {
            left,
            operator,
            right,
            answer: answer.to_string(),
        }
    }

    pub fn operands(&self) -> (u32, u32) {
        (self.left, self.right)
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Human-readable expression, e.g. `56 ÷ 8 = ?`.
    pub fn text(&self) -> String {
        format!("{} {} {} = ?", self.left, self.operator.symbol(), self.right)
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn verify(&self, input: &str) -> bool {
        input.trim() == self.answer
    }
}

fn digit<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=9)
}

#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("incorrect answer; a new challenge has been issued")]
    Mismatch,
    #[error("unable to render challenge image: {0}")]
    Render(#[from] image::ImageError),
}

/// Holds the live challenge for one form and replaces it after every failed
/// attempt, so a wrong answer can never be retried against the same problem.
#[derive(Debug)]
pub struct CaptchaGuard {
    challenge: CaptchaChallenge,
    rng: StdRng,
}

impl CaptchaGuard {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(mut rng: StdRng) -> Self {
        let challenge = CaptchaChallenge::generate(&mut rng);
        Self { challenge, rng }
    }

    pub fn challenge(&self) -> &CaptchaChallenge {
        &self.challenge
    }

    pub fn refresh(&mut self) -> &CaptchaChallenge {
        self.challenge = CaptchaChallenge::generate(&mut self.rng);
        &self.challenge
    }

    pub fn check(&mut self, input: &str) -> Result<(), CaptchaError> {
        if self.challenge.verify(input) {
            Ok(())
        } else {
            self.refresh();
            Err(CaptchaError::Mismatch)
        }
    }

    /// Renders the current challenge with fresh jitter and noise.
    pub fn render_png(&mut self, renderer: &CaptchaRenderer) -> Result<Vec<u8>, CaptchaError> {
        let text = self.challenge.text();
        Ok(renderer.render_png(&text, &mut self.rng)?)
    }
}

impl Default for CaptchaGuard {
    fn default() -> Self {
        Self::new()
    }
}
