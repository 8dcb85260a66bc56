//! Order book channel models.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Full-depth order book snapshot for one instrument, as pushed on
/// `book.<instrument>.<depth>`. Each push replaces the previous one.
#[derive(Debug, Clone, Deserialize)]
pub struct BookData {
    /// Ask levels, lowest price first as delivered by the exchange.
    pub asks: Vec<PriceLevel>,
    /// Bid levels, highest price first as delivered by the exchange.
    pub bids: Vec<PriceLevel>,
    /// Exchange timestamp of the snapshot in epoch milliseconds.
    #[serde(default)]
    pub t: Option<i64>,
    /// Book update sequence number.
    #[serde(default)]
    pub u: Option<u64>,
}

/// A single price level in the order book.
///
/// On the wire a level is an array `[price, size, order_count]` whose values
/// may be strings or numbers; only price and size are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub qty: Decimal,
}

impl<'de> Deserialize<'de> for PriceLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LevelVisitor;

        impl<'de> Visitor<'de> for LevelVisitor {
            type Value = PriceLevel;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of [price, size, ...]")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<PriceLevel, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let price: Decimal = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let qty: Decimal = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                while seq.next_element::<IgnoredAny>()?.is_some() {}

                Ok(PriceLevel { price, qty })
            }
        }

        deserializer.deserialize_seq(LevelVisitor)
    }
}
