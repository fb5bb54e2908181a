// src/prompt.rs

//! Interactive confirmation prompts.
//!
//! Destructive steps ask before acting. `y`, `Y` and an empty line
//! accept; anything else declines. The trait seam lets `--yes` runs and
//! tests substitute canned answers for stdin.

use crate::error::Result;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Prompter {
    /// Ask a yes/no question; `true` means the user accepted
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Reads answers from stdin
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{question} ")?;
        stdout.flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(matches!(input.trim(), "" | "y" | "Y"))
    }
}

/// Accepts everything without asking; used by `--yes`
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        println!("{question} y");
        Ok(true)
    }
}

/// Replays a fixed answer sequence; runs out loudly rather than hanging
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_else(|| {
            panic!("unexpected prompt: {question}")
        }))
    }
}
