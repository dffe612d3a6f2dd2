mod address;
mod amount;

pub use address::Address;
pub(crate) use address::sha512_256;
pub use amount::{Credit, MicroAlgos, TokenAmount};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// Whole ANJ required to vote.
    pub cost: u64,
    /// Shown to the user only; nothing closes the poll.
    pub deadline: String,
}

impl Poll {
    pub fn new(id: u32, question: &str, options: &[&str], cost: u64, deadline: &str) -> Self {
        Self {
            id,
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            cost,
            deadline: deadline.to_string(),
        }
    }

    pub fn cost_tokens(&self) -> TokenAmount {
        TokenAmount::whole(self.cost)
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Option by its 1-based position, as typed on the console.
    pub fn option_at(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// The fixed community proposals offered in the voting panel.
pub fn community_polls() -> Vec<Poll> {
    vec![
        Poll::new(
            1,
            "What should be the theme for the next community event?",
            &["Cultural Heritage", "Modern Tech Fair", "Eco-Friendly Initiative"],
            2,
            "Closes: September 25, 2025",
        ),
        Poll::new(
            2,
            "Which charity should receive next month's treasury donation?",
            &["Local Education Fund", "Animal Welfare Shelter", "Global Health Org"],
            5,
            "Closes: October 5, 2025",
        ),
    ]
}
