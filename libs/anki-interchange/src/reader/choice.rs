//! Multiple-choice reconstruction from a front/back pair.
//!
//! Best effort: the front must hold a question followed by at least two
//! consecutively numbered choice lines, and the back is scanned for an answer
//! key. Anything that does not fit is left as a plain card.

use crate::error::Result;
use flashcard_core::text::{extract_numbers, parse_number};
use flashcard_core::{ChoiceData, InterchangeSettings};
use regex::Regex;

const DIGITS: &str = "[0-9０-９]+";
const SEP: &str = r"\s*[,、，・]\s*";

/// Question text and choices recovered from a front field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceQuestion {
    pub question: String,
    pub choices: Vec<ChoiceData>,
}

/// Compiled numbering and answer-key patterns.
#[derive(Debug, Clone)]
pub struct ChoiceExtractor {
    choice_patterns: Vec<Regex>,
    single_answer: Vec<Regex>,
    multi_answer: Vec<Regex>,
    conjunction: Vec<Regex>,
    min_question_chars: usize,
    placeholder_question: String,
}

impl ChoiceExtractor {
    pub fn new(settings: &InterchangeSettings) -> Result<Self> {
        let line = |marker: &str| format!(r"(?m)^[ \t]*{}[ \t]*(\S.*?)[ \t]*$", marker);
        let choice_patterns = vec![
            Regex::new(&line(r"([0-9]+)\."))?,
            Regex::new(&line(r"([0-9]+)\)"))?,
            Regex::new(&line(r"\(([0-9０-９]+)\)"))?,
            Regex::new(&line(r"（([0-9０-９]+)）"))?,
            Regex::new(&line(r"([０-９]+)．"))?,
            Regex::new(&line(r"([０-９]+)："))?,
        ];

        // Group 1 holds the answer; group 2 matches only when a list follows,
        // which leaves the text to the multi-answer patterns.
        let tail = format!(r"({}[0-9０-９])?", SEP);
        let single_answer = vec![
            Regex::new(&format!(r"(?i)\bA\s*[.．:：]\s*({}){}", DIGITS, tail))?,
            Regex::new(&format!(r"(?i)正解\s*[：:]\s*({}){}", DIGITS, tail))?,
            Regex::new(&format!(r"(?i)答え\s*[：:]\s*({}){}", DIGITS, tail))?,
            Regex::new(&format!(r"(?i)解答\s*[：:]\s*({}){}", DIGITS, tail))?,
            Regex::new(&format!(r"(?i)({})\s*[.．]\s*正解()", DIGITS))?,
            Regex::new(&format!(r"(?i)選択肢\s*({}){}", DIGITS, tail))?,
        ];

        let list = format!("{d}(?:{s}{d})+", d = DIGITS, s = SEP);
        let multi_answer = vec![
            Regex::new(&format!(r"(?i)(?:\bA|正解|答え|解答)\s*[.．:：]\s*({})", list))?,
            Regex::new(&format!(r"(?i)選択肢\s*({})", list))?,
            Regex::new(&format!(r"(?i)({})\s*[.．]?\s*(?:が|は)?\s*正解", list))?,
        ];

        let joiner = r"\s*(?:と|及び|および|and|&|[,、，・])\s*";
        let conjunction = vec![
            Regex::new(&format!(
                r"(?i)({d}(?:{j}{d})+)\s*(?:の両方|の)?\s*(?:が|は)?\s*(?:共に|ともに)?\s*正解",
                d = DIGITS,
                j = joiner
            ))?,
            Regex::new(&format!(
                r"(?i)正解\s*(?:は|：|:)\s*({d}(?:{j}{d})+)",
                d = DIGITS,
                j = joiner
            ))?,
        ];

        Ok(Self {
            choice_patterns,
            single_answer,
            multi_answer,
            conjunction,
            min_question_chars: settings.min_question_chars,
            placeholder_question: settings.placeholder_question.clone(),
        })
    }

    /// Rebuild a choice card from normalized fields. The back becomes the
    /// explanation and is scanned for the answer key.
    pub fn reconstruct(&self, front: &str, back: &str) -> Option<ChoiceQuestion> {
        let mut parsed = self.extract(front)?;
        for index in self.answer_key(back) {
            if let Some(choice) = index.checked_sub(1).and_then(|i| parsed.choices.get_mut(i)) {
                choice.is_correct = true;
            }
        }
        Some(parsed)
    }

    /// Split a front field into question and choices.
    pub fn extract(&self, front: &str) -> Option<ChoiceQuestion> {
        let pattern = self
            .choice_patterns
            .iter()
            .find(|p| p.captures_iter(front).take(2).count() >= 2)?;

        let matches: Vec<_> = pattern.captures_iter(front).collect();
        let first_start = matches.first()?.get(0)?.start();

        let numbers = matches
            .iter()
            .map(|caps| parse_number(&caps[1]))
            .collect::<Option<Vec<_>>>()?;
        if !is_consecutive_from_one(&numbers) {
            tracing::debug!("Choice numbering {:?} is not consecutive", numbers);
            return None;
        }

        let preceding = front[..first_start].trim();
        let question = if preceding.is_empty() {
            if self.is_choices_only(front) {
                return None;
            }
            self.placeholder_question.clone()
        } else if preceding.chars().count() < self.min_question_chars {
            return None;
        } else {
            preceding.to_string()
        };

        let choices = matches
            .iter()
            .map(|caps| ChoiceData::new(caps[2].trim()))
            .collect();

        Some(ChoiceQuestion { question, choices })
    }

    /// 1-based indices named as correct in an explanation.
    ///
    /// Single-answer patterns win over multi-answer lists, which win over
    /// free-form conjunctions.
    pub fn answer_key(&self, explanation: &str) -> Vec<usize> {
        for pattern in &self.single_answer {
            let single = pattern
                .captures_iter(explanation)
                .find(|caps| caps.get(2).map_or(true, |m| m.as_str().is_empty()));
            if let Some(caps) = single {
                let numbers = extract_numbers(&caps[1]);
                if !numbers.is_empty() {
                    return numbers;
                }
            }
        }

        for family in [&self.multi_answer, &self.conjunction] {
            for pattern in family.iter() {
                if let Some(caps) = pattern.captures(explanation) {
                    let numbers = extract_numbers(&caps[1]);
                    if !numbers.is_empty() {
                        return numbers;
                    }
                }
            }
        }

        Vec::new()
    }

    fn is_choices_only(&self, front: &str) -> bool {
        front
            .lines()
            .filter(|line| !line.trim().is_empty())
            .all(|line| self.choice_patterns.iter().any(|p| p.is_match(line)))
    }
}

fn is_consecutive_from_one(numbers: &[usize]) -> bool {
    numbers.iter().enumerate().all(|(i, n)| *n == i + 1)
}
