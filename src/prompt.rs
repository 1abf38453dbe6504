use crate::error::AppError;
use std::io::{self, BufRead, Write};

/// Answer to a numbered-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the offered options.
    Index(usize),
    /// Anything that was not a valid option number.
    Text(String),
}

/// Interactive input used to disambiguate dates and to name copyright holders.
pub trait Prompter {
    fn choose(&mut self, heading: &str, options: &[String], question: &str) -> Result<Selection, AppError>;
    fn free_text(&mut self, question: &str) -> Result<String, AppError>;
}

/// Map a raw answer onto the options numbered from 1.
pub fn interpret(answer: &str, option_count: usize) -> Selection {
    let answer = answer.trim();
    match answer.parse::<usize>() {
        Ok(n) if (1..=option_count).contains(&n) => Selection::Index(n - 1),
        _ => Selection::Text(answer.to_string()),
    }
}

pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String, AppError> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(AppError::Prompt(format!("no answer to '{}': input closed", question)));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn choose(&mut self, heading: &str, options: &[String], question: &str) -> Result<Selection, AppError> {
        writeln!(self.output, "{}", heading)?;
        for (idx, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", idx + 1, option)?;
        }
        let answer = self.ask(question)?;
        Ok(interpret(&answer, options.len()))
    }

    fn free_text(&mut self, question: &str) -> Result<String, AppError> {
        self.ask(question)
    }
}

/// Replays canned answers; running out is an error, like a closed terminal.
#[cfg(test)]
pub(crate) struct ScriptedPrompter {
    pub answers: std::collections::VecDeque<String>,
    pub questions: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            questions: Vec::new(),
        }
    }

    fn next(&mut self, question: &str) -> Result<String, AppError> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| AppError::Prompt("script exhausted".into()))
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn choose(&mut self, _heading: &str, options: &[String], question: &str) -> Result<Selection, AppError> {
        let answer = self.next(question)?;
        Ok(interpret(&answer, options.len()))
    }

    fn free_text(&mut self, question: &str) -> Result<String, AppError> {
        self.next(question)
    }
}
