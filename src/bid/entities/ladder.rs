use {
    crate::kernel::entities::Cents,
    serde::{
        Deserialize,
        Serialize,
    },
    thiserror::Error,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LadderBand {
    pub lower:     Cents,
    pub increment: Cents,
}

#[derive(Error, Debug, PartialEq)]
pub enum LadderError {
    #[error("ladder must contain at least one band")]
    Empty,
    #[error("first band must start at 0")]
    FirstBandNotZero,
    #[error("band lower bounds must be strictly ascending")]
    NotAscending,
    #[error("band increments must be positive")]
    NonPositiveIncrement,
}

/// Table-driven minimum-increment ladder. Bands form a contiguous partition
/// of `[0, ∞)`; the last band extends to infinity.
#[derive(Clone, Debug)]
pub struct BidLadder {
    bands: Vec<LadderBand>,
}

impl BidLadder {
    pub fn new(bands: Vec<LadderBand>) -> Result<Self, LadderError> {
        if bands.is_empty() {
            return Err(LadderError::Empty);
        }
        if bands[0].lower != 0 {
            return Err(LadderError::FirstBandNotZero);
        }
        if bands.windows(2).any(|pair| pair[0].lower >= pair[1].lower) {
            return Err(LadderError::NotAscending);
        }
        if bands.iter().any(|band| band.increment <= 0) {
            return Err(LadderError::NonPositiveIncrement);
        }
        Ok(Self { bands })
    }

    /// The production table, in cents.
    pub fn production() -> Self {
        let bands = [
            (0, 5),
            (100, 25),
            (500, 50),
            (1_000, 100),
            (2_500, 250),
            (5_000, 500),
            (10_000, 1_000),
            (25_000, 2_500),
            (50_000, 5_000),
            (100_000, 10_000),
            (250_000, 25_000),
            (500_000, 50_000),
        ];
        Self {
            bands: bands
                .into_iter()
                .map(|(lower, increment)| LadderBand { lower, increment })
                .collect(),
        }
    }

    pub fn increment(&self, price: Cents) -> Cents {
        let band = self.bands.partition_point(|band| band.lower <= price);
        // Prices below zero never reach the store; map them to the first band.
        self.bands[band.saturating_sub(1)].increment
    }

    pub fn min_next_bid(&self, price: Cents) -> Cents {
        price + self.increment(price)
    }

    pub fn bands(&self) -> &[LadderBand] {
        &self.bands
    }
}

impl Default for BidLadder {
    fn default() -> Self {
        Self::production()
    }
}
