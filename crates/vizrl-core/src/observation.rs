//! Observation representations and observation spaces

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for observations from an environment
pub trait Observation: Clone + Debug + Send + Sync {
    /// Convert observation to a feature vector
    fn to_vec(&self) -> Vec<f64>;

    /// Get the shape of the observation
    fn shape(&self) -> Vec<usize>;
}

/// Trait for defining observation spaces
pub trait ObservationSpace: Send + Sync {
    /// The type of observations in this space
    type Observation: Observation;

    /// Check if an observation is valid within this space
    fn contains(&self, obs: &Self::Observation) -> bool;

    /// Get the shape of observations in this space
    fn shape(&self) -> Vec<usize>;
}

/// Vector observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorObservation {
    /// The observation data
    pub data: Vec<f64>,
}

impl Observation for VectorObservation {
    fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.data.len()]
    }
}

/// Image observation: a row-major `height x width x channels` byte buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageObservation {
    /// Pixel data
    pub data: Vec<u8>,
    /// Height of the image
    pub height: usize,
    /// Width of the image
    pub width: usize,
    /// Number of channels
    pub channels: usize,
}

impl ImageObservation {
    /// A black frame of the given shape
    #[must_use]
    pub fn zeros(height: usize, width: usize, channels: usize) -> Self {
        Self {
            data: vec![0; height * width * channels],
            height,
            width,
            channels,
        }
    }

    /// Whether every pixel is zero
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&p| p == 0)
    }
}

impl Observation for ImageObservation {
    fn to_vec(&self) -> Vec<f64> {
        self.data.iter().map(|&p| f64::from(p)).collect()
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.height, self.width, self.channels]
    }
}

/// Box observation space
#[derive(Debug, Clone)]
pub struct BoxObservationSpace {
    /// Lower bound shared by every element
    pub low: f64,
    /// Upper bound shared by every element
    pub high: f64,
    /// Shape of observations
    pub shape: Vec<usize>,
}

impl BoxObservationSpace {
    /// Create a new box observation space
    pub fn new(low: f64, high: f64, shape: Vec<usize>) -> crate::Result<Self> {
        if low > high {
            return Err(crate::RLError::InvalidState(format!(
                "observation bounds inverted: {low} > {high}"
            )));
        }
        Ok(Self { low, high, shape })
    }
}

/// Image spaces share the box bounds but hold byte frames.
pub struct ImageSpace(pub BoxObservationSpace);

impl ObservationSpace for ImageSpace {
    type Observation = ImageObservation;

    fn contains(&self, obs: &Self::Observation) -> bool {
        obs.shape() == self.0.shape
            && obs
                .data
                .iter()
                .all(|&p| f64::from(p) >= self.0.low && f64::from(p) <= self.0.high)
    }

    fn shape(&self) -> Vec<usize> {
        self.0.shape.clone()
    }
}

impl ObservationSpace for BoxObservationSpace {
    type Observation = VectorObservation;

    fn contains(&self, obs: &Self::Observation) -> bool {
        obs.data.len() == self.shape.iter().product::<usize>()
            && obs.data.iter().all(|x| *x >= self.low && *x <= self.high)
    }

    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }
}
