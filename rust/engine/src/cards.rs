use serde::{Deserialize, Serialize};

use crate::errors::GameError;

/// Number of cards in a single deck.
pub const DECK_SIZE: usize = 52;

/// One of the four suits in a standard deck.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Suit {
    /// Clubs suit (♣)
    Clubs,
    /// Diamonds suit (♦)
    Diamonds,
    /// Hearts suit (♥)
    Hearts,
    /// Spades suit (♠)
    Spades,
}

/// Rank of a card from Ace through King.
///
/// Baccarat scores the ace as one and every ten or face card as zero,
/// see [`Rank::value`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Rank {
    Ace = 1,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    /// Baccarat point value of the rank, always in `0..=9`.
    pub fn value(self) -> u8 {
        match self {
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 0,
            other => other as u8,
        }
    }

    /// Ten and the court cards.
    pub fn is_high(self) -> bool {
        self.value() == 0
    }

    /// Ace through six.
    pub fn is_low(self) -> bool {
        (1..=6).contains(&self.value())
    }
}

/// A single playing card.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn value(&self) -> u8 {
        self.rank.value()
    }
}

pub fn all_suits() -> [Suit; 4] {
    [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs]
}

pub fn all_ranks() -> [Rank; 13] {
    [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ]
}

pub fn full_deck() -> Vec<Card> {
    let mut v = Vec::with_capacity(DECK_SIZE);
    for &s in &all_suits() {
        for &r in &all_ranks() {
            v.push(Card { suit: s, rank: r });
        }
    }
    v
}

/// `decks` full decks in canonical order, unshuffled.
pub fn full_shoe(decks: usize) -> Vec<Card> {
    let mut v = Vec::with_capacity(DECK_SIZE * decks);
    for _ in 0..decks {
        v.extend(full_deck());
    }
    v
}

/// Card values as they arrive from a client.
///
/// Accepts a list of integers, a list of digit strings, a space or comma
/// delimited string (`"3 4"`) or a contiguous digit string (`"34"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardInput {
    List(Vec<CardToken>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardToken {
    Number(i64),
    Text(String),
}

impl CardInput {
    /// Validate and convert to point values in `0..=9`. May be empty.
    pub fn parse(&self) -> Result<Vec<u8>, GameError> {
        match self {
            CardInput::List(tokens) => tokens.iter().map(parse_token).collect(),
            CardInput::Text(text) => parse_card_string(text),
        }
    }

    /// Like [`CardInput::parse`] but rejects an empty hand.
    pub fn parse_required(&self, side: &'static str) -> Result<Vec<u8>, GameError> {
        let cards = self.parse()?;
        if cards.is_empty() {
            return Err(GameError::EmptyHand { side });
        }
        Ok(cards)
    }
}

fn parse_token(token: &CardToken) -> Result<u8, GameError> {
    match token {
        CardToken::Number(n) => check_value(*n, &n.to_string()),
        CardToken::Text(s) => parse_single(s.trim()),
    }
}

fn parse_single(raw: &str) -> Result<u8, GameError> {
    let value: i64 = raw.parse().map_err(|_| GameError::InvalidCardValue {
        value: raw.to_string(),
    })?;
    check_value(value, raw)
}

fn check_value(value: i64, raw: &str) -> Result<u8, GameError> {
    if (0..=9).contains(&value) {
        Ok(value as u8)
    } else {
        Err(GameError::InvalidCardValue {
            value: raw.to_string(),
        })
    }
}

/// Parse `"3 4"`, `"3,4"` or `"34"` into point values.
pub fn parse_card_string(text: &str) -> Result<Vec<u8>, GameError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let delimited = trimmed.contains(|c: char| c.is_whitespace() || c == ',');
    if delimited {
        trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(parse_single)
            .collect()
    } else {
        trimmed
            .chars()
            .map(|c| {
                c.to_digit(10)
                    .map(|d| d as u8)
                    .ok_or_else(|| GameError::InvalidCardValue {
                        value: c.to_string(),
                    })
            })
            .collect()
    }
}
