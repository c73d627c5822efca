//! Top-down driving simulation
//!
//! A car crosses a `width x height` map between two corner goals while
//! avoiding sand. It sees the map through three sensors and its heading
//! relative to the goal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Range, Sub};

use vizrl_core::{
    ActionSpace, BoxObservationSpace, DiscreteAction, DiscreteSpace, Environment,
    ObservationSpace, RLError, Result, Step, StepInfo, VectorObservation,
};

/// Length of the observation vector
pub const SIGNAL_LEN: usize = 5;

const ROTATIONS: [f64; 3] = [0.0, 20.0, -20.0];
const SENSOR_DISTANCE: f64 = 30.0;
const SENSOR_ANGLE: f64 = 30.0;
const SENSOR_HALF_WINDOW: usize = 10;
const BORDER: f64 = 10.0;
const GOAL_MARGIN: f64 = 20.0;

/// Driving simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrivingConfig {
    /// Map width in pixels
    pub width: usize,
    /// Map height in pixels
    pub height: usize,
    /// Speed on open road
    pub speed: f64,
    /// Speed on sand
    pub sand_speed: f64,
    /// Distance at which the goal counts as reached
    pub goal_radius: f64,
}

impl Default for DrivingConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            speed: 6.0,
            sand_speed: 1.0,
            goal_radius: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vec2 {
    x: f64,
    y: f64,
}

impl Vec2 {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn rotate(self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Signed angle in degrees from `other` back to `self`
    fn angle_to(self, other: Vec2) -> f64 {
        let cross = self.x * other.y - self.y * other.x;
        let dot = self.x * other.x + self.y * other.y;
        -cross.atan2(dot).to_degrees()
    }

    fn distance(self, other: Vec2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Driving environment
pub struct DrivingEnv {
    config: DrivingConfig,
    /// Column-major sand mask, indexed `x * height + y`
    sand: Vec<bool>,
    position: Vec2,
    velocity: Vec2,
    angle: f64,
    goal: Vec2,
    last_distance: f64,
    signals: [f64; 3],
    steps: usize,
}

impl DrivingEnv {
    /// Create an environment with an empty map
    pub fn new(config: DrivingConfig) -> Result<Self> {
        if config.width <= 2 * SENSOR_HALF_WINDOW || config.height <= 2 * SENSOR_HALF_WINDOW {
            return Err(RLError::Config(format!(
                "driving map {}x{} is too small",
                config.width, config.height
            )));
        }
        let mut env = Self {
            sand: vec![false; config.width * config.height],
            position: Vec2::new(0.0, 0.0),
            velocity: Vec2::new(0.0, 0.0),
            angle: 0.0,
            goal: Vec2::new(0.0, 0.0),
            last_distance: 0.0,
            signals: [0.0; 3],
            steps: 0,
            config,
        };
        env.serve_car();
        Ok(env)
    }

    #[allow(clippy::cast_precision_loss)]
    fn dimensions(&self) -> (f64, f64) {
        (self.config.width as f64, self.config.height as f64)
    }

    fn serve_car(&mut self) {
        let (width, height) = self.dimensions();
        self.position = Vec2::new(width / 2.0, height / 2.0);
        self.velocity = Vec2::new(self.config.speed, 0.0);
        self.angle = 0.0;
        self.goal = Vec2::new(GOAL_MARGIN, height - GOAL_MARGIN);
        self.last_distance = 0.0;
        self.steps = 0;
        self.sense();
    }

    /// Mark a rectangle of the map as sand
    pub fn paint_sand(&mut self, xs: Range<usize>, ys: Range<usize>) {
        let height = self.config.height;
        for x in xs.start..xs.end.min(self.config.width) {
            for y in ys.start..ys.end.min(height) {
                self.sand[x * height + y] = true;
            }
        }
        self.sense();
    }

    /// Remove all sand
    pub fn clear_sand(&mut self) {
        self.sand.fill(false);
        self.sense();
    }

    /// Move the goal
    pub fn set_goal(&mut self, x: f64, y: f64) {
        self.goal = Vec2::new(x, y);
    }

    /// Current goal
    #[must_use]
    pub fn goal(&self) -> (f64, f64) {
        (self.goal.x, self.goal.y)
    }

    /// Current car position
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.position.x, self.position.y)
    }

    /// Steps since the last reset
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn is_sand(&self, point: Vec2) -> bool {
        if point.x < 0.0 || point.y < 0.0 {
            return false;
        }
        let (x, y) = (point.x as usize, point.y as usize);
        x < self.config.width && y < self.config.height && self.sand[x * self.config.height + y]
    }

    /// Fraction of sand in the window around a sensor; 1 near a border
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn density(&self, sensor: Vec2) -> f64 {
        let (width, height) = self.dimensions();
        if sensor.x > width - BORDER
            || sensor.x < BORDER
            || sensor.y > height - BORDER
            || sensor.y < BORDER
        {
            return 1.0;
        }
        let (cx, cy) = (sensor.x as usize, sensor.y as usize);
        let xs = cx - SENSOR_HALF_WINDOW..(cx + SENSOR_HALF_WINDOW).min(self.config.width);
        let ys = cy - SENSOR_HALF_WINDOW..(cy + SENSOR_HALF_WINDOW).min(self.config.height);
        let count = xs
            .flat_map(|x| ys.clone().map(move |y| (x, y)))
            .filter(|&(x, y)| self.sand[x * self.config.height + y])
            .count();
        count as f64 / (4 * SENSOR_HALF_WINDOW * SENSOR_HALF_WINDOW) as f64
    }

    fn sense(&mut self) {
        self.signals = [0.0, SENSOR_ANGLE, -SENSOR_ANGLE].map(|offset| {
            let ahead = Vec2::new(SENSOR_DISTANCE, 0.0).rotate(self.angle + offset);
            self.density(ahead + self.position)
        });
    }

    fn observation(&self) -> VectorObservation {
        let orientation = self.velocity.angle_to(self.goal - self.position) / 180.0;
        let [ahead, left, right] = self.signals;
        VectorObservation {
            data: vec![ahead, left, right, orientation, -orientation],
        }
    }
}

#[async_trait]
impl Environment for DrivingEnv {
    type Observation = VectorObservation;
    type Action = DiscreteAction;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(BoxObservationSpace {
            low: -1.0,
            high: 1.0,
            shape: vec![SIGNAL_LEN],
        })
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(DiscreteSpace::new(ROTATIONS.len()))
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        self.serve_car();
        Ok((self.observation(), StepInfo::default()))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>> {
        let rotation = *ROTATIONS
            .get(action.0)
            .ok_or_else(|| RLError::InvalidAction(format!("Invalid action: {}", action.0)))?;

        self.position = self.position + self.velocity;
        self.angle += rotation;
        self.sense();

        let distance = self.position.distance(self.goal);
        let on_sand = self.is_sand(self.position);
        let mut reward = if on_sand {
            self.velocity = Vec2::new(self.config.sand_speed, 0.0).rotate(self.angle);
            -1.0
        } else {
            self.velocity = Vec2::new(self.config.speed, 0.0).rotate(self.angle);
            if distance < self.last_distance {
                0.1
            } else {
                -0.2
            }
        };

        let (width, height) = self.dimensions();
        if self.position.x < BORDER {
            self.position.x = BORDER;
            reward = -1.0;
        }
        if self.position.x > width - BORDER {
            self.position.x = width - BORDER;
            reward = -1.0;
        }
        if self.position.y < BORDER {
            self.position.y = BORDER;
            reward = -1.0;
        }
        if self.position.y > height - BORDER {
            self.position.y = height - BORDER;
            reward = -1.0;
        }

        if distance < self.config.goal_radius {
            self.goal = Vec2::new(width - self.goal.x, height - self.goal.y);
        }
        self.last_distance = distance;
        self.steps += 1;

        let mut info = StepInfo::default();
        info.insert("distance", distance);
        info.insert("on_sand", on_sand);
        Ok(Step::new(self.observation(), reward, false, info))
    }
}
