//! Interactive prompt collaborator.
//!
//! Walkthroughs talk to a [`Prompter`] rather than the terminal, so tests
//! drive them with a scripted implementation and never touch stdin.

use std::io::{self, BufRead, Write};

use stratus_core::{Error, Result};

/// Synchronous question-and-answer interface.
pub trait Prompter {
    /// Free-form input with a default.
    fn input(&mut self, message: &str, default: &str) -> Result<String>;

    /// Yes/no question.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    /// Pick exactly one option; returns its index.
    fn select(&mut self, message: &str, options: &[&str], default: usize) -> Result<usize>;

    /// Pick any number of options; returns their indices.
    fn multi_select(
        &mut self,
        message: &str,
        options: &[&str],
        preselected: &[usize],
    ) -> Result<Vec<usize>>;
}

/// Prompter reading answers from stdin.
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, message: &str, default: &str) -> Result<String> {
        print!("{message} [{default}]: ");
        io::stdout().flush()?;
        let line = self.read_line()?;
        Ok(if line.is_empty() {
            default.to_string()
        } else {
            line
        })
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        print!("{message} ({hint}): ");
        io::stdout().flush()?;
        let line = self.read_line()?;
        Ok(match line.to_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    fn select(&mut self, message: &str, options: &[&str], default: usize) -> Result<usize> {
        println!("{message}");
        for (i, option) in options.iter().enumerate() {
            let marker = if i == default { ">" } else { " " };
            println!("{marker} {}) {option}", i + 1);
        }
        print!("Choice [{}]: ", default + 1);
        io::stdout().flush()?;
        let line = self.read_line()?;
        if line.is_empty() {
            return Ok(default);
        }
        let choice: usize = line
            .parse()
            .map_err(|_| Error::validation(format!("'{line}' is not a number")))?;
        if choice == 0 || choice > options.len() {
            return Err(Error::validation(format!(
                "choice must be between 1 and {}",
                options.len()
            )));
        }
        Ok(choice - 1)
    }

    fn multi_select(
        &mut self,
        message: &str,
        options: &[&str],
        preselected: &[usize],
    ) -> Result<Vec<usize>> {
        println!("{message}");
        for (i, option) in options.iter().enumerate() {
            let marker = if preselected.contains(&i) { "x" } else { " " };
            println!("[{marker}] {}) {option}", i + 1);
        }
        print!("Numbers, comma-separated (empty keeps the marked set): ");
        io::stdout().flush()?;
        let line = self.read_line()?;
        if line.is_empty() {
            return Ok(preselected.to_vec());
        }
        let mut picked = Vec::new();
        for part in line.split(',') {
            let choice: usize = part
                .trim()
                .parse()
                .map_err(|_| Error::validation(format!("'{part}' is not a number")))?;
            if choice == 0 || choice > options.len() {
                return Err(Error::validation(format!(
                    "choice must be between 1 and {}",
                    options.len()
                )));
            }
            if !picked.contains(&(choice - 1)) {
                picked.push(choice - 1);
            }
        }
        Ok(picked)
    }
}

/// Scripted prompter for tests: answers come from a queue.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<ScriptedAnswer>,
}

#[derive(Debug)]
pub enum ScriptedAnswer {
    Input(String),
    Confirm(bool),
    Select(usize),
    MultiSelect(Vec<usize>),
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<ScriptedAnswer>) -> Self {
        ScriptedPrompter {
            answers: answers.into(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.answers.is_empty()
    }

    fn next(&mut self, message: &str) -> Result<ScriptedAnswer> {
        self.answers
            .pop_front()
            .ok_or_else(|| Error::validation(format!("no scripted answer for '{message}'")))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, message: &str, default: &str) -> Result<String> {
        match self.next(message)? {
            ScriptedAnswer::Input(value) if value.is_empty() => Ok(default.to_string()),
            ScriptedAnswer::Input(value) => Ok(value),
            other => Err(Error::validation(format!(
                "expected input answer for '{message}', got {other:?}"
            ))),
        }
    }

    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message)? {
            ScriptedAnswer::Confirm(value) => Ok(value),
            other => Err(Error::validation(format!(
                "expected confirm answer for '{message}', got {other:?}"
            ))),
        }
    }

    fn select(&mut self, message: &str, options: &[&str], _default: usize) -> Result<usize> {
        match self.next(message)? {
            ScriptedAnswer::Select(index) if index < options.len() => Ok(index),
            other => Err(Error::validation(format!(
                "expected select answer for '{message}', got {other:?}"
            ))),
        }
    }

    fn multi_select(
        &mut self,
        message: &str,
        options: &[&str],
        _preselected: &[usize],
    ) -> Result<Vec<usize>> {
        match self.next(message)? {
            ScriptedAnswer::MultiSelect(indices)
                if indices.iter().all(|i| *i < options.len()) =>
            {
                Ok(indices)
            }
            other => Err(Error::validation(format!(
                "expected multi-select answer for '{message}', got {other:?}"
            ))),
        }
    }
}
