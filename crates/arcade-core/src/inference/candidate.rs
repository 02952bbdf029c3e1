use super::InferenceError;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One possible answer of a guessing round together with its current odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    /// Static prior weight; never changed by the engine.
    pub popularity: f64,
    #[serde(default)]
    pub probability: f64,
}

impl Candidate {
    /// A candidate whose probability is assigned later by `initialize_distribution`.
    pub fn new(id: u32, name: impl Into<String>, popularity: f64) -> Self {
        Self {
            id: CandidateId(id),
            name: name.into(),
            popularity,
            probability: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
}

impl Question {
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id: QuestionId(id),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    pub const fn as_str(self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
        }
    }

    pub const fn flipped(self) -> Answer {
        match self {
            Answer::Yes => Answer::No,
            Answer::No => Answer::Yes,
        }
    }
}

impl FromStr for Answer {
    type Err = InferenceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Answer::Yes),
            "no" | "n" => Ok(Answer::No),
            _ => Err(InferenceError::UnknownAnswer(value.to_string())),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_json_keeps_plain_field_names() {
        let mut candidate = Candidate::new(3, "Ada Lovelace", 5.0);
        candidate.probability = 0.25;
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Ada Lovelace");
        assert_eq!(json["popularity"], 5.0);
        assert_eq!(json["probability"], 0.25);
    }

    #[test]
    fn missing_probability_defaults_to_zero() {
        let candidate: Candidate =
            serde_json::from_str(r#"{"id":1,"name":"You","popularity":4}"#).unwrap();
        assert_eq!(candidate.probability, 0.0);
        assert_eq!(candidate.id, CandidateId(1));
    }

    #[test]
    fn answers_parse_loosely() {
        assert_eq!("YES".parse::<Answer>().unwrap(), Answer::Yes);
        assert_eq!(" n ".parse::<Answer>().unwrap(), Answer::No);
        assert!("maybe".parse::<Answer>().is_err());
        assert_eq!(Answer::Yes.flipped(), Answer::No);
    }
}
