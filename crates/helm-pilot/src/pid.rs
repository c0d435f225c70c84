use serde::Deserialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Derivative filter coefficient
    pub n: f64,
}

/// PID controller with a first-order filtered derivative and
/// back-calculation anti-windup on the output clamp.
///
/// `update` takes the already-normalized heading error and returns the
/// correction in degrees, always within `output_limits()`.
#[derive(Debug, Clone)]
pub struct Pid {
    set_point: f64,
    gains: PidGains,

    integrator: f64,
    filter: f64,
    last_update: Option<Instant>,

    min_output: f64,
    max_output: f64,
}

impl Pid {
    pub fn new(gains: PidGains, min_output: f64, max_output: f64) -> Self {
        Self {
            set_point: 0.0,
            gains,
            integrator: 0.0,
            filter: 0.0,
            last_update: None,
            min_output,
            max_output,
        }
    }

    pub fn set(&mut self, set_point: f64) {
        self.set_point = set_point;
    }

    /// Wall-clock update: `dt` is the time since the previous call, 0 on the first one.
    pub fn update(&mut self, input: f64) -> f64 {
        let now = Instant::now();
        let dt = self
            .last_update
            .map(|t| now.duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        self.last_update = Some(now);
        self.update_with_dt(input, dt)
    }

    /// Same as `update` with an explicit time step in seconds.
    pub fn update_with_dt(&mut self, input: f64, dt: f64) -> f64 {
        let PidGains { kp, ki, kd, n } = self.gains;
        let u = self.set_point - input;

        let filtered_derivative = (kd * u - self.filter) * n;
        let mut output = kp * u + self.integrator + filtered_derivative;

        if dt > 0.0 {
            self.integrator += ki * u * dt;
            self.filter += dt * filtered_derivative;
        }

        if output > self.max_output {
            self.integrator -= output - self.max_output;
            output = self.max_output;
        } else if output < self.min_output {
            self.integrator += self.min_output - output;
            output = self.min_output;
        }
        output
    }

    pub fn output_limits(&self) -> (f64, f64) {
        (self.min_output, self.max_output)
    }
}
